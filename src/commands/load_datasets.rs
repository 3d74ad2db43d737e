use anyhow::Result;
use tracing::info;

use crate::cli::LoadFileArgs;
use crate::commands::load::entity_step;
use crate::commands::stats;
use crate::ingest;
use crate::links;
use crate::reconcile;
use crate::store::Store;

/// Load a datasets CSV into the dataset and indexer tables, then derive
/// dataset-game links against whatever games are already stored.
pub fn run(args: LoadFileArgs) -> Result<()> {
    info!(
        db = %args.db.display(),
        file = %args.file.display(),
        "starting datasets load"
    );

    let datasets = ingest::read_dataset_records(&args.file)?;
    info!(rows = datasets.len(), "ingested csv rows");

    let urls: Vec<String> = datasets.iter().map(|dataset| dataset.url.clone()).collect();

    let mut store = Store::open(&args.db)?;
    entity_step(
        "indexers",
        reconcile::reconcile_indexers(&mut store, &urls),
    );
    entity_step(
        "datasets",
        reconcile::reconcile_datasets(&mut store, &datasets),
    );

    match links::derive_dataset_links(&mut store) {
        Ok(inserted) => info!(inserted, "derived dataset-game links"),
        Err(err) => tracing::warn!(error = %err, "dataset-game link derivation failed"),
    }

    stats::report_counts(&store);
    info!("datasets load completed");
    Ok(())
}
