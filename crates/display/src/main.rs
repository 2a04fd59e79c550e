// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use marquee::config::{Cli, Command};
use marquee::logging::init_tracing;
use marquee::store::FileConfigStore;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = FileConfigStore::new(cli.config_dir()?);
    match &cli.command {
        Command::Run(args) => marquee::run::run(&store, args).await,
        Command::Config(command) => {
            println!("{}", marquee::run::config_command(&store, command)?);
            Ok(())
        }
    }
}
