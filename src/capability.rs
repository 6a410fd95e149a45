/// Runtime capability detection
///
/// Inspects the host once and decides which storage backend is usable.
/// Detection never fails: a missing feature is reported as `false`.
use crate::config::{MediaConfig, RuntimeMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Immutable record of what the current runtime supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    pub filesystem_capable: bool,
    pub native_runtime: bool,
    pub browser_runtime: bool,
}

/// The backend a snapshot selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    OriginFs,
    ObjectStore,
    Native,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendKind::OriginFs => "origin-fs",
            BackendKind::ObjectStore => "object-store",
            BackendKind::Native => "native",
        };
        f.write_str(name)
    }
}

impl CapabilitySnapshot {
    /// Apply the selection table: native first, then origin filesystem,
    /// then the object store. `None` when neither runtime is present.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        if self.native_runtime {
            Some(BackendKind::Native)
        } else if self.browser_runtime && self.filesystem_capable {
            Some(BackendKind::OriginFs)
        } else if self.browser_runtime {
            Some(BackendKind::ObjectStore)
        } else {
            None
        }
    }
}

/// Runtime class of the compile target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeClass {
    Native,
    Browser,
    Unknown,
}

impl RuntimeClass {
    /// Mobile targets run as native apps; wasm and desktop hosts are
    /// hosted runtimes with an origin-scoped data directory.
    pub fn of_target() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios")) {
            RuntimeClass::Native
        } else {
            RuntimeClass::Browser
        }
    }
}

/// Raw observations that detection is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeProbe {
    pub class: RuntimeClass,
    pub origin_fs_disabled: bool,
    pub origin_writable: bool,
}

impl RuntimeProbe {
    /// Observe the ambient runtime. Only reads metadata.
    pub fn observe(config: &MediaConfig) -> Self {
        let class = match config.runtime.mode {
            RuntimeMode::Auto => RuntimeClass::of_target(),
            RuntimeMode::Native => RuntimeClass::Native,
            RuntimeMode::Browser => RuntimeClass::Browser,
            RuntimeMode::None => RuntimeClass::Unknown,
        };

        Self {
            class,
            origin_fs_disabled: config.runtime.disable_origin_fs,
            origin_writable: directory_writable(&config.storage.origin_directory),
        }
    }
}

/// Compute a snapshot from probe observations
pub fn detect(probe: &RuntimeProbe) -> CapabilitySnapshot {
    let browser_runtime = probe.class == RuntimeClass::Browser;
    CapabilitySnapshot {
        filesystem_capable: browser_runtime && !probe.origin_fs_disabled && probe.origin_writable,
        native_runtime: probe.class == RuntimeClass::Native,
        browser_runtime,
    }
}

static SNAPSHOT: OnceLock<CapabilitySnapshot> = OnceLock::new();

/// Process-wide snapshot, detected on first call and reused afterwards
pub fn snapshot(config: &MediaConfig) -> CapabilitySnapshot {
    *SNAPSHOT.get_or_init(|| {
        let snapshot = detect(&RuntimeProbe::observe(config));
        tracing::info!(
            filesystem_capable = snapshot.filesystem_capable,
            native_runtime = snapshot.native_runtime,
            browser_runtime = snapshot.browser_runtime,
            "Detected runtime capabilities"
        );
        snapshot
    })
}

/// Whether `path`, or its nearest existing ancestor, is a writable directory
fn directory_writable(path: &Path) -> bool {
    path.ancestors()
        .find_map(|candidate| std::fs::metadata(candidate).ok())
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false)
}
