use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "osvg",
    version,
    about = "Open source video game database tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema if it does not exist
    Init(InitArgs),
    /// Load a video-games CSV and derive all relationships
    Load(LoadArgs),
    /// Load a datasets CSV and derive dataset-game relationships
    LoadDatasets(LoadFileArgs),
    /// Load an ingestion-format video-games CSV
    LoadVideoGames(LoadFileArgs),
    /// Report row counts for every table
    Stats(StatsArgs),
    /// Fetch game metadata from the RAWG API
    Rawg(RawgArgs),
    /// Emit model source code mirroring the schema
    GenerateModels(GenerateModelsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Path to OSVG database
    #[arg(short, long)]
    pub db: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Path to OSVG database
    #[arg(short, long)]
    pub db: PathBuf,

    /// Path to video games CSV file
    #[arg(long)]
    pub video_games: PathBuf,

    /// Path to datasets CSV file
    #[arg(long)]
    pub datasets: PathBuf,

    /// Optional path for a JSON load report
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LoadFileArgs {
    /// Path to OSVG database
    #[arg(short, long)]
    pub db: PathBuf,

    /// Path to CSV file
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// Path to OSVG database
    #[arg(short, long)]
    pub db: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RawgArgs {
    /// Path to OSVG database
    #[arg(short, long)]
    pub db: PathBuf,

    /// RAWG developer key
    #[arg(short, long)]
    pub key: String,

    /// Fetch a single game slug and print the response body
    #[arg(long)]
    pub game: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateModelsArgs {
    /// Output path for the generated source file
    #[arg(long, default_value = "generated_models.rs")]
    pub out: PathBuf,
}
