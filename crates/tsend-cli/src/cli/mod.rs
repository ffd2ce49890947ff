//! CLI for the tsend telemetry sender.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tsend_core::config::{self, TsendConfig};
use tsend_core::TelemetryKind;

use commands::{run_config, run_send, SendArgs};

/// Top-level CLI for tsend.
#[derive(Debug, Parser)]
#[command(name = "tsend")]
#[command(about = "tsend: reliable telemetry batch delivery", long_about = None)]
pub struct Cli {
    /// Read settings from this file instead of ~/.config/tsend/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send the data points in a JSON file as one batch.
    Send {
        /// JSON file: `{"common": {...}, "items": [...]}` or a bare array of items.
        file: PathBuf,

        /// Telemetry kind of every item in the file.
        #[arg(long, value_parser = parse_kind)]
        kind: TelemetryKind,

        /// API key (overrides the config file).
        #[arg(long, env = "TSEND_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Ingest URL for this kind (overrides region and [endpoints]).
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Send the body uncompressed.
        #[arg(long)]
        no_compress: bool,
    },

    /// Show the config file path and the effective settings.
    Config,
}

fn parse_kind(s: &str) -> Result<TelemetryKind, String> {
    s.parse()
}

fn load_config(path: Option<&PathBuf>) -> Result<(Option<PathBuf>, TsendConfig)> {
    match path {
        Some(p) => Ok((Some(p.clone()), config::load_from_path(p)?)),
        None => {
            let cfg = config::load_or_init()?;
            Ok((config::config_path().ok(), cfg))
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (path, cfg) = load_config(cli.config.as_ref())?;
        tracing::debug!(path = ?path, "loaded config");

        match cli.command {
            CliCommand::Send {
                file,
                kind,
                api_key,
                endpoint,
                no_compress,
            } => {
                run_send(
                    cfg,
                    SendArgs {
                        file,
                        kind,
                        api_key,
                        endpoint,
                        no_compress,
                    },
                )
                .await?
            }
            CliCommand::Config => run_config(path.as_deref(), &cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
