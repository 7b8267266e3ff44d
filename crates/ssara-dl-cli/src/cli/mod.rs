//! CLI for the supervised SSARA downloader.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ssara_dl_core::config::{self, SsaraConfig};
use ssara_dl_core::logging;
use std::path::PathBuf;

use commands::{run_download, run_list, run_verify};

/// Top-level CLI for ssara-dl.
#[derive(Debug, Parser)]
#[command(name = "ssara-dl", version)]
#[command(about = "Supervised SSARA bulk download: stall detection, bounded retry, verification", long_about = None)]
pub struct Cli {
    /// Directory the downloader writes into (default: current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Config file (default: ~/.config/ssara-dl/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the scenes selected by a template, supervising the downloader.
    Download {
        /// Template file with an `ssaraopt = ...` line.
        template: PathBuf,

        /// Print the run report as JSON on stdout when done (log lines move to stderr).
        #[arg(long)]
        json: bool,
    },

    /// Print the files the downloader would fetch for a template (log lines go to stderr).
    List {
        /// Template file with an `ssaraopt = ...` line.
        template: PathBuf,
    },

    /// Check the working directory against the expected listing.
    Verify {
        /// Template file with an `ssaraopt = ...` line.
        template: PathBuf,
    },
}

impl CliCommand {
    /// Run the parsed command; returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let loaded = match &cli.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        init_logging(&loaded.config, cli.command.console());
        if loaded.created {
            tracing::info!("created default config at {}", loaded.path.display());
        }
        let cfg = loaded.config;
        tracing::debug!("loaded config from {}: {:?}", loaded.path.display(), cfg);

        let work_dir = match cli.work_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("resolve current directory")?,
        };

        match cli.command {
            CliCommand::Download { template, json } => {
                run_download(&cfg, &work_dir, &template, json).await
            }
            CliCommand::List { template } => run_list(&cfg, &work_dir, &template).await,
            CliCommand::Verify { template } => run_verify(&cfg, &work_dir, &template).await,
        }
    }

    /// Console stream for log lines. Commands whose stdout is meant for other
    /// programs log to stderr instead.
    pub fn console(&self) -> logging::Console {
        match self {
            CliCommand::Download { json: true, .. } | CliCommand::List { .. } => {
                logging::Console::Stderr
            }
            _ => logging::Console::Stdout,
        }
    }
}

fn init_logging(cfg: &SsaraConfig, console: logging::Console) {
    let rotation = logging::Rotation::from_config(cfg.log_max_bytes, cfg.log_backups);
    let result = logging::log_file_path()
        .and_then(|path| logging::init_logging(&path, rotation, console));
    if let Err(err) = result {
        logging::init_logging_console(console);
        tracing::warn!("log file unavailable ({:#}); logging to the console only", err);
    }
}

#[cfg(test)]
mod tests;
