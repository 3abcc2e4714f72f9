//! Get command - produce client configuration for a cluster

use clap::{Args, Subcommand};

use super::kubeconfig::{self, KubeconfigArgs};
use crate::Result;

/// Get client configuration
#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(subcommand)]
    pub resource: GetResource,
}

/// Resource to get
#[derive(Subcommand, Debug)]
pub enum GetResource {
    /// Generate a kubeconfig that authenticates through the Concierge
    Kubeconfig(KubeconfigArgs),
}

/// Run the get command
pub async fn run(args: GetArgs) -> Result<()> {
    match args.resource {
        GetResource::Kubeconfig(args) => kubeconfig::run(args).await,
    }
}
