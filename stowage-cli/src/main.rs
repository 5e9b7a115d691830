mod config;
use clap::{Parser, Subcommand};
use config::Config;
use std::path::PathBuf;
use stowage_core::{Result, StorageCoordinator, StowageError, cancellable};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(about = "Blob storage with claim tracking and sweep-based cleanup")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "stowage.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and register it
    Put {
        file: PathBuf,

        /// Human-readable filename to record (defaults to the file's name)
        #[arg(long)]
        name: Option<String>,

        /// Extension for the stored blob (defaults to the file's extension)
        #[arg(long)]
        ext: Option<String>,
    },
    /// Read a blob
    Get {
        name: String,

        /// Write to this path instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print blob records as JSON
    Meta {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Check that every name is registered
    Check {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Claim blobs on behalf of a claimant
    Use {
        #[arg(long)]
        who: String,

        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Release claims by claimant, by name, or both
    Unuse {
        #[arg(long, default_value = "")]
        who: String,

        names: Vec<String>,
    },
    /// Delete unclaimed blobs, in order
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Run one sweep
    Clean {
        /// Override the configured retention
        #[arg(long)]
        retention_secs: Option<u64>,
    },
    /// Sweep periodically until interrupted
    Sweep,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stowage_cli=info,stowage_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = match Config::from_file(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    let coordinator = match cfg.build_coordinator() {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!("Failed to open storage: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_command(&cfg, &coordinator, cli.command).await {
        tracing::error!("Command failed ({:?}): {}", e.kind(), e);
        std::process::exit(1);
    }
}

async fn run_command(
    cfg: &Config,
    coordinator: &StorageCoordinator,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Put { file, name, ext } => {
            let filename = name.or_else(|| {
                file.file_name()
                    .map(|value| value.to_string_lossy().to_string())
            });
            let ext = ext.unwrap_or_else(|| {
                file.extension()
                    .map(|value| value.to_string_lossy().to_string())
                    .unwrap_or_default()
            });

            let data = tokio::fs::read(&file).await?;
            let record = coordinator.put(filename.as_deref(), &ext, data).await?;
            print_json(&record)?;
        }
        Commands::Get { name, out } => {
            let data = coordinator.get(&name).await?;
            match out {
                Some(path) => tokio::fs::write(path, &data).await?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Commands::Meta { names } => {
            let records = coordinator.get_metadata(&names).await?;
            print_json(&records)?;
        }
        Commands::Check { names } => {
            println!("{}", coordinator.check(&names).await?);
        }
        Commands::Use { who, names } => {
            coordinator.use_blobs(&who, &names).await?;
            tracing::info!("{} claimed {} blobs", who, names.len());
        }
        Commands::Unuse { who, names } => {
            coordinator.unuse_blobs(&who, &names).await?;
        }
        Commands::Delete { names } => {
            let deleted = coordinator.delete(&names).await?;
            tracing::info!("Deleted {} blobs", deleted.len());
        }
        Commands::Clean { retention_secs } => {
            let retention = retention_secs.unwrap_or(cfg.sweep.retention_secs);
            let stats = coordinator.clean(cutoff_for(retention)?).await?;
            print_json(&stats)?;
        }
        Commands::Sweep => run_sweeper(cfg, coordinator).await?,
    }

    Ok(())
}

fn cutoff_for(retention_secs: u64) -> Result<chrono::DateTime<chrono::Utc>> {
    i64::try_from(retention_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|retention| chrono::Utc::now().checked_sub_signed(retention))
        .ok_or_else(|| {
            StowageError::InvalidArgument(format!("retention out of range: {}", retention_secs))
        })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| StowageError::Internal(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

async fn run_sweeper(cfg: &Config, coordinator: &StorageCoordinator) -> Result<()> {
    let token = CancellationToken::new();

    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping sweeper");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!("Cannot listen for interrupts: {}", e),
        }
    });

    let mut ticker = tokio::time::interval(cfg.sweep.interval());
    tracing::info!(
        "Sweeping every {}s, retention {}s",
        cfg.sweep.interval_secs,
        cfg.sweep.retention_secs
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let cutoff = cutoff_for(cfg.sweep.retention_secs)?;
        match cancellable(&token, coordinator.clean(cutoff)).await {
            Ok(_) => {}
            Err(StowageError::Cancelled) => return Ok(()),
            // A failed sweep is retried on the next tick
            Err(e) => tracing::error!("Sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_for() {
        let cutoff = cutoff_for(3600).unwrap();
        let age = chrono::Utc::now() - cutoff;
        assert!(age >= chrono::Duration::seconds(3600));
        assert!(age < chrono::Duration::seconds(3660));

        assert!(matches!(
            cutoff_for(u64::MAX),
            Err(StowageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cli_parses_unuse_without_claimant() {
        let cli = Cli::try_parse_from(["stowage", "unuse", "ab/cd/abcd.txt"]).unwrap();
        match cli.command {
            Commands::Unuse { who, names } => {
                assert!(who.is_empty());
                assert_eq!(names, vec!["ab/cd/abcd.txt".to_string()]);
            }
            _ => panic!("expected unuse"),
        }
    }
}
