use std::path::PathBuf;

use burrow_core::{FileQueue, Message, QueueBuilder, QueueConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "burrow")]
#[command(about = "Local file-backed message queue with visibility timeouts")]
struct Cli {
    /// Queue root directory (overrides config and BURROW_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// JSON config file; without it BURROW_* environment variables are used
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a message and print its receipt handle
    Push {
        /// Queue name or queue URL
        queue: String,
        content: String,
    },
    /// Claim the first visible message
    Pull {
        /// Queue name or queue URL
        queue: String,
        /// Seconds the message stays hidden (0..=43200, otherwise 30)
        #[arg(long)]
        visibility_timeout: Option<i64>,
    },
    /// Acknowledge a claimed message
    Delete {
        /// Queue name or queue URL
        queue: String,
        receipt_handle: String,
    },
    /// Keep the queue open so expired claims are returned, until Ctrl-C
    Sweep {
        /// Queue name or queue URL
        queue: String,
    },
}

#[derive(Serialize)]
struct Pushed<'a> {
    queue: &'a str,
    receipt_handle: &'a str,
}

#[derive(Serialize)]
struct Deleted<'a> {
    queue: &'a str,
    deleted: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => QueueConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => QueueConfig::from_env(),
    };
    if let Some(root) = cli.root {
        config.root = root;
    }

    match cli.command {
        Command::Push { queue, content } => {
            let queue = open(&queue, config).await?;
            let handle = queue.push(content).await?;
            print_json(&Pushed {
                queue: queue.name().as_str(),
                receipt_handle: handle.as_str(),
            })?;
        }
        Command::Pull {
            queue,
            visibility_timeout,
        } => {
            let queue = open(&queue, config).await?;
            let message: Option<Message> = queue.pull(visibility_timeout).await?;
            print_json(&message)?;
        }
        Command::Delete {
            queue,
            receipt_handle,
        } => {
            let queue = open(&queue, config).await?;
            let deleted = queue.delete(&receipt_handle).await?;
            print_json(&Deleted {
                queue: queue.name().as_str(),
                deleted,
            })?;
        }
        Command::Sweep { queue } => {
            let queue = open(&queue, config).await?;
            info!(queue = %queue.name(), active = queue.is_active(), "sweeping until ctrl-c");
            tokio::select! {
                watched = queue.watch_activity() => watched?,
                signal = tokio::signal::ctrl_c() => signal?,
            }
            info!(stats = ?queue.stats(), "stopping");
        }
    }

    Ok(())
}

async fn open(queue: &str, config: QueueConfig) -> Result<FileQueue, Box<dyn std::error::Error>> {
    let builder = if queue.contains('/') {
        QueueBuilder::from_url(queue)?
    } else {
        QueueBuilder::new(queue)
    };
    Ok(builder.config(config).open().await?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
