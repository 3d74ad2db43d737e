mod cli;
mod commands;
mod ingest;
mod links;
mod model;
mod rawg;
mod reconcile;
mod store;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Load(args) => commands::load::run(args),
        Commands::LoadDatasets(args) => commands::load_datasets::run(args),
        Commands::LoadVideoGames(args) => commands::load_video_games::run(args),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Rawg(args) => commands::rawg::run(args),
        Commands::GenerateModels(args) => commands::generate_models::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
