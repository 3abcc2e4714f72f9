//! kestrel CLI library

pub mod ca;
pub mod commands;
pub mod deadline;
pub mod descriptor;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// kestrel - Concierge-aware kubeconfig tooling
#[derive(Parser, Debug)]
#[command(name = "kestrel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Get client configuration for a cluster
    Get(commands::get::GetArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Get(args) => commands::get::run(args).await,
        }
    }
}
