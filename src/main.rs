/// notemedia - command line access to note media storage
use anyhow::Context;
use clap::{Parser, Subcommand};
use notemedia::{
    capability::{self, RuntimeProbe},
    keys, MediaBlob, MediaConfig, MediaStore, StorageKey,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notemedia", version, about = "Store and manage note media")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show detected capabilities and the selected backend
    Detect,
    /// Save a file as media of a note
    Save {
        note: String,
        file: PathBuf,
        /// Stored filename (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
        /// Declared MIME type (guessed from the extension for images)
        #[arg(long)]
        mime: Option<String>,
    },
    /// Read stored bytes
    Read {
        key: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a data URL preview of stored media
    Preview { key: String },
    /// Delete one stored blob
    Delete { key: String },
    /// Delete all media of a note
    Purge { note: String },
    /// Convert a storage key to its portable form
    Portable { key: String },
    /// Convert a portable path back to a storage key
    Unportable { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = MediaConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "notemedia=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Detect => {
            let probe = RuntimeProbe::observe(&config);
            let snapshot = capability::detect(&probe);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            match snapshot.backend_kind() {
                Some(kind) => println!("backend: {}", kind),
                None => println!("backend: none"),
            }
        }
        Command::Save {
            note,
            file,
            name,
            mime,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let mime = mime.or_else(|| {
                image::ImageFormat::from_path(&file)
                    .ok()
                    .map(|format| format.to_mime_type().to_string())
            });
            let name = name.or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            });

            let store = MediaStore::open(&config).await?;
            let saved = store
                .save(&note, MediaBlob::new(bytes, mime.as_deref()), name.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        Command::Read { key, out } => {
            let key = StorageKey::parse(&key)?;
            let store = MediaStore::open(&config).await?;
            let bytes = store.read(&key).await?;
            match out {
                Some(path) => tokio::fs::write(&path, &bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => std::io::stdout().write_all(&bytes)?,
            }
        }
        Command::Preview { key } => {
            let key = StorageKey::parse(&key)?;
            let store = MediaStore::open(&config).await?;
            let handle = store.preview(&key).await?;
            println!("{}", handle.data_url());
            handle.revoke();
        }
        Command::Delete { key } => {
            let key = StorageKey::parse(&key)?;
            let store = MediaStore::open(&config).await?;
            store.delete_one(&key).await?;
            println!("deleted {}", key);
        }
        Command::Purge { note } => {
            let store = MediaStore::open(&config).await?;
            store.delete_all_for_note(&note).await?;
            println!("deleted all media for {}", note);
        }
        Command::Portable { key } => {
            let key = StorageKey::parse(&key)?;
            println!("{}", keys::to_portable(&key));
        }
        Command::Unportable { path } => {
            println!("{}", keys::from_portable(&path)?);
        }
    }

    Ok(())
}
