mod config;
use clap::{Parser, Subcommand};
use config::Config;
use embedstore_core::{EmbeddedStorage, ItemRecord, Shard, StorageAdapter};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "embedstore")]
#[command(about = "Shard metadata and blob storage adapter")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Storage root directory (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an item record, optionally uploading its shard
    Put {
        key: String,

        /// Record fields as a JSON object
        #[arg(long, default_value = "{}")]
        record: String,

        /// File whose bytes become the item's shard
        #[arg(long)]
        shard: Option<PathBuf>,
    },
    /// Print an item record, optionally saving its shard
    Get {
        key: String,

        /// Write readable shard data to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print an item record without touching shard data
    Peek { key: String },
    /// Delete an item's shard and record
    Del { key: String },
    /// List stored keys
    Keys,
    /// Report bytes used by shard data
    Size { key: Option<String> },
    /// Flush buffered shard writes
    Flush,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embedstore=info,embedstore_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let storage = match cfg
        .storage_config(cli.root.clone())
        .and_then(|storage_config| EmbeddedStorage::from_config(&storage_config))
    {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&storage, cli.command).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(storage: &EmbeddedStorage, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Put { key, record, shard } => {
            let record: ItemRecord = serde_json::from_str(&record)?;
            storage.put(&key, record).await?;
            tracing::info!("Stored record for key {}", key);

            if let Some(shard_path) = shard {
                upload_shard(storage, &key, &shard_path).await?;
            }
        }
        Commands::Get { key, out } => {
            let item = storage.get(&key).await?;
            println!("{}", serde_json::to_string_pretty(&item.record)?);

            match (item.shard, out) {
                (Shard::Readable(mut reader), Some(out)) => {
                    let mut file = tokio::fs::File::create(&out).await?;
                    let copied = tokio::io::copy(&mut reader, &mut file).await?;
                    tracing::info!("Wrote {} shard bytes to {:?}", copied, out);
                }
                (Shard::Writable(_), _) => {
                    tracing::info!("No shard data stored for key {}", key);
                }
                (Shard::Readable(_), None) => {}
            }
        }
        Commands::Peek { key } => {
            let record = storage.peek(&key).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Del { key } => {
            storage.del(&key).await?;
            tracing::info!("Deleted key {}", key);
        }
        Commands::Keys => {
            let mut keys = storage.keys();
            while let Some(key) = keys.next().await {
                println!("{}", key?);
            }
        }
        Commands::Size { key } => {
            let bytes = storage.size(key.as_deref()).await?;
            println!("{}", bytes);
        }
        Commands::Flush => {
            storage.flush().await?;
        }
    }

    Ok(())
}

async fn upload_shard(
    storage: &EmbeddedStorage,
    key: &str,
    shard_path: &Path,
) -> anyhow::Result<()> {
    let item = storage.get(key).await?;
    let Shard::Writable(mut writer) = item.shard else {
        tracing::warn!("Shard data already exists for key {}, skipping upload", key);
        return Ok(());
    };

    let mut file = tokio::fs::File::open(shard_path).await?;
    let copied = tokio::io::copy(&mut file, &mut writer).await?;
    writer.shutdown().await?;
    storage.flush().await?;

    tracing::info!(
        "Uploaded {} shard bytes for key {} (fingerprint {})",
        copied,
        key,
        item.record.fskey.as_deref().unwrap_or_default()
    );
    Ok(())
}
