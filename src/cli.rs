// ABOUTME: Command-line interface definitions using clap
// ABOUTME: One export command (the default) plus global connection flags

use crate::api::DEFAULT_API_BASE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "onedown")]
#[command(about = "Export OneNote notebooks to a local Markdown tree", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Bearer token (overrides session/env)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Graph API base URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Application (client) identifier, or ONEDOWN_CLIENT_ID env var
    #[arg(long, global = true)]
    pub client_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Export notebooks (default)
    Export {
        /// Output root directory
        #[arg(long, short, default_value = "output")]
        output: PathBuf,

        /// Only export the notebook with this name
        #[arg(long)]
        notebook: Option<String>,

        /// Only export sections with this name
        #[arg(long)]
        section: Option<String>,

        /// Write export-report.json under the output root
        #[arg(long)]
        report: bool,

        /// Skip a branch entirely when its listing fails mid-pagination
        #[arg(long)]
        discard_partial_listings: bool,

        /// Suppress progress output
        #[arg(long, short)]
        quiet: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Export {
            output: PathBuf::from("output"),
            notebook: None,
            section: None,
            report: false,
            discard_partial_listings: false,
            quiet: false,
        })
    }
}
