mod cli;
mod commands;
mod config;
mod main_lib;

use clap::Parser;
use cli::Cli;
use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    init_tracing(&config.log_format);

    let state = build_state(&config)?;
    commands::run(cli.command, &state).await
}
