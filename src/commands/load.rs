use std::collections::HashSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::LoadArgs;
use crate::commands::stats;
use crate::model::{DatasetRecord, EntityCounts, GameRecord, LinkCounts, LoadReport};
use crate::store::Store;
use crate::util::{now_utc_string, write_json_pretty};
use crate::{ingest, links, reconcile};

pub fn run(args: LoadArgs) -> Result<()> {
    info!(
        db = %args.db.display(),
        video_games = %args.video_games.display(),
        datasets = %args.datasets.display(),
        "starting load"
    );

    let records = ingest::read_game_records(&args.video_games)?;
    let datasets = ingest::read_dataset_records(&args.datasets)?;
    info!(
        game_rows = records.len(),
        dataset_rows = datasets.len(),
        "ingested csv rows"
    );

    let mut store = Store::open(&args.db)?;
    let (entities, link_counts) = run_pipeline(&mut store, &records, &datasets);

    stats::report_counts(&store);

    if let Some(report_path) = &args.report {
        let report = LoadReport {
            generated_at: now_utc_string(),
            db_path: args.db.display().to_string(),
            video_games_path: args.video_games.display().to_string(),
            datasets_path: Some(args.datasets.display().to_string()),
            game_rows_read: records.len(),
            dataset_rows_read: datasets.len(),
            entities,
            links: link_counts,
            tables: store.table_counts(),
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote load report");
    }

    info!("load completed");
    Ok(())
}

/// Reconcile every entity in dependency order, then derive the join tables.
/// Each step is its own committed unit; a failed step is logged and leaves
/// its count unset without blocking the independent steps that follow.
///
/// `file_datasets` are rows from an explicit datasets CSV; they take
/// precedence over the bare candidates derived from referencing-dataset
/// URLs because the reconciler keeps the first occurrence per URL.
pub(crate) fn run_pipeline(
    store: &mut Store,
    records: &[GameRecord],
    file_datasets: &[DatasetRecord],
) -> (EntityCounts, LinkCounts) {
    let referenced_urls = distinct_dataset_urls(records);

    let mut indexer_urls: Vec<String> = file_datasets
        .iter()
        .map(|dataset| dataset.url.clone())
        .collect();
    indexer_urls.extend(referenced_urls.iter().cloned());

    let mut dataset_candidates: Vec<DatasetRecord> = file_datasets.to_vec();
    dataset_candidates.extend(referenced_urls.iter().map(|url| ingest::dataset_from_url(url)));

    let entities = EntityCounts {
        authors_inserted: entity_step(
            "authors",
            reconcile::reconcile_authors(store, records),
        ),
        repos_inserted: entity_step("repos", reconcile::reconcile_repos(store, records)),
        indexers_inserted: entity_step(
            "indexers",
            reconcile::reconcile_indexers(store, &indexer_urls),
        ),
        video_games_inserted: entity_step(
            "video_games",
            reconcile::reconcile_video_games(store, records),
        ),
        datasets_inserted: entity_step(
            "datasets",
            reconcile::reconcile_datasets(store, &dataset_candidates),
        ),
    };

    let link_counts = links::derive_all(store);
    (entities, link_counts)
}

pub(crate) fn entity_step(entity: &str, result: Result<usize>) -> Option<usize> {
    match result {
        Ok(inserted) => {
            info!(entity, inserted, "reconciled entities");
            Some(inserted)
        }
        Err(err) => {
            warn!(entity, error = %err, "entity load failed");
            None
        }
    }
}

fn distinct_dataset_urls(records: &[GameRecord]) -> Vec<String> {
    let mut urls = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        let Some(url) = record.dataset_url.as_deref() else {
            continue;
        };
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }
    urls
}
