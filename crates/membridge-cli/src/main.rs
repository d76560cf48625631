//! Operator CLI for the memory-bridge subsystem.
//!
//! A thin convenience binary over the library crates: it carries no
//! business logic of its own, only enough wiring to run the outbox and
//! config-loading primitives from a terminal instead of from inside a host
//! process. Useful for inspecting or unsticking an outbox without
//! restarting the host, and for validating a config file before deploying
//! it.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use membridge_bridge::ClientOutboxSender;
use membridge_client::HttpStoreClient;
use membridge_config::{load_config_from_path, MemoryConfig};
use membridge_outbox::Outbox;

#[derive(Parser)]
#[command(name = "memory-bridge", about = "Operator CLI for the memory-bridge subsystem")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect a persisted outbox file without flushing it.
    Outbox {
        #[command(subcommand)]
        command: OutboxCommand,
    },
    /// Load and validate a config file, printing the resolved result.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum OutboxCommand {
    /// Print `getStats()` for the outbox file as JSON.
    Status {
        /// Path to the outbox file.
        #[arg(long)]
        path: PathBuf,
    },
    /// Run a single flush cycle against `--endpoint`, then print stats.
    Flush {
        /// Path to the outbox file.
        #[arg(long)]
        path: PathBuf,
        /// Store endpoint to flush against.
        #[arg(long)]
        endpoint: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Load `--path` (defaults if absent), deep-merge, apply env overrides,
    /// and print the resolved config as JSON.
    Check {
        /// Path to the config file. Falls back to `MEMORY_BRIDGE_CONFIG_PATH`
        /// or `~/.memory-bridge/config.json` when omitted.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt::init();
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Outbox { command } => run_outbox(command).await,
        Command::Config { command } => run_config(command),
    }
}

async fn run_outbox(command: OutboxCommand) -> Result<(), String> {
    match command {
        OutboxCommand::Status { path } => {
            let outbox = idle_outbox(path);
            outbox.start().await;
            let stats = outbox.get_stats().await;
            outbox.stop().await;
            print_json(&stats)
        }
        OutboxCommand::Flush { path, endpoint } => {
            let mut config = MemoryConfig::default();
            config.endpoint = endpoint;
            let client: Arc<dyn membridge_client::StoreClient> =
                Arc::new(HttpStoreClient::new(&config));
            let sender = Arc::new(ClientOutboxSender::new(client));
            let outbox = Outbox::new(
                path,
                config.outbox.flush_interval_ms,
                config.outbox.max_batch_size,
                config.outbox.retry_base_ms,
                config.outbox.retry_max_ms,
                sender,
            );
            outbox.start().await;
            outbox.flush().await;
            let stats = outbox.get_stats().await;
            outbox.stop().await;
            print_json(&stats)
        }
    }
}

/// An outbox wired with a sender that is never invoked (status never
/// flushes), just enough to satisfy `Outbox::new`'s signature.
fn idle_outbox(path: PathBuf) -> Arc<Outbox> {
    struct NeverSend;
    #[async_trait::async_trait]
    impl membridge_outbox::OutboxSender for NeverSend {
        async fn send(&self, _item: &membridge_core::OutboxItem) -> Result<(), membridge_core::MemoryError> {
            Err(membridge_core::MemoryError::Transport("status-only outbox, not flushed".into()))
        }
    }
    let defaults = MemoryConfig::default();
    Outbox::new(
        path,
        defaults.outbox.flush_interval_ms,
        defaults.outbox.max_batch_size,
        defaults.outbox.retry_base_ms,
        defaults.outbox.retry_max_ms,
        Arc::new(NeverSend),
    )
}

fn run_config(command: ConfigCommand) -> Result<(), String> {
    let ConfigCommand::Check { path } = command;
    let resolved_path = path.unwrap_or_else(membridge_config::config_path);
    let config = load_config_from_path(&resolved_path)
        .map_err(|e| format!("failed to load config from {}: {e}", resolved_path.display()))?;
    print_json(&config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_check_reports_missing_file_as_defaults() {
        let path = std::path::Path::new("/nonexistent/memory-bridge-cli-config.json");
        let config = load_config_from_path(path).unwrap();
        assert_eq!(config.endpoint, MemoryConfig::default().endpoint);
        assert!(serde_json::to_string(&config).is_ok());
    }

    #[test]
    fn config_check_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = run_config(ConfigCommand::Check { path: Some(path.clone()) }).unwrap_err();
        assert!(err.contains(&path.display().to_string()));
    }

    #[tokio::test]
    async fn outbox_status_reads_depth_without_flushing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let item = membridge_core::OutboxItem {
            id: membridge_core::OutboxItemId::new(),
            created_at: 0,
            updated_at: 0,
            attempts: 0,
            next_attempt_at: 0,
            session_key: membridge_core::SessionKey::from("s1"),
            session_id: None,
            events: vec![membridge_core::SessionEvent::Commit {
                event_id: membridge_core::EventId::new(),
                cause: "manual".into(),
                metadata: std::collections::HashMap::new(),
            }],
        };
        std::fs::write(&path, format!("{}\n", serde_json::to_string(&item).unwrap())).unwrap();

        let outbox = idle_outbox(path);
        outbox.start().await;
        let stats = outbox.get_stats().await;
        outbox.stop().await;
        assert_eq!(stats.depth, 1);
    }
}
