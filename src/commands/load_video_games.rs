use anyhow::Result;
use tracing::info;

use crate::cli::LoadFileArgs;
use crate::commands::{load, stats};
use crate::ingest;
use crate::store::Store;

/// Same pipeline as `load`, for the ingestion-format CSV shape
/// (`dataset_url`, `name`, `source_code_url`, `steam_id`). The ingestor
/// normalizes both header dialects, so the pipeline is shared.
pub fn run(args: LoadFileArgs) -> Result<()> {
    info!(
        db = %args.db.display(),
        file = %args.file.display(),
        "starting video games load"
    );

    let records = ingest::read_game_records(&args.file)?;
    info!(rows = records.len(), "ingested csv rows");

    let mut store = Store::open(&args.db)?;
    load::run_pipeline(&mut store, &records, &[]);

    stats::report_counts(&store);
    info!("video games load completed");
    Ok(())
}
