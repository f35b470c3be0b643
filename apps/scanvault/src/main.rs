//! ScanVault entry point.
//!
//! Parses flags and hands off to [`scanvault_lib::run`] on a single-threaded
//! runtime.

use std::path::PathBuf;

use clap::Parser;
use scanvault_lib::state::Overrides;

#[derive(Debug, Parser)]
#[command(name = "scanvault", version, about = "Scan QR codes into your vault")]
struct Cli {
    /// Config file (default: config.toml in the platform config dir)
    #[arg(long, env = "SCANVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the persisted session and the local vault
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    scanvault_lib::run(Overrides {
        config_file: cli.config,
        data_dir: cli.data_dir,
    })
    .await
}
