use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::params;
use tracing::warn;

use crate::model::{DatasetRecord, GameRecord};
use crate::store::Store;
use crate::util::now_utc_string;

/// Reconcile authors derived from repository owners. Every ingested row
/// contributes its owner, including the `"unknown"` sentinel, so games with
/// unparseable URLs still resolve an author reference.
pub fn reconcile_authors(store: &mut Store, records: &[GameRecord]) -> Result<usize> {
    let mut candidates: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        if seen.insert(record.repo.owner.clone()) {
            candidates.push(record.repo.owner.clone());
        }
    }

    let existing = existing_keys(store, "SELECT name FROM authors");
    candidates.retain(|name| !existing.contains(name));
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare("INSERT INTO authors(name, email, created_at, is_active) VALUES(?1, ?2, ?3, 1)")
            .context("failed to prepare author insert")?;
        for name in &candidates {
            let email = format!("{name}@github.com");
            statement.execute(params![name, email, now])?;
        }
    }
    tx.commit()?;

    Ok(candidates.len())
}

/// Reconcile repositories on their URL natural key; the stored `author`
/// column carries the owner name used later for the author-repo join.
pub fn reconcile_repos(store: &mut Store, records: &[GameRecord]) -> Result<usize> {
    let mut candidates: Vec<&GameRecord> = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        let Some(url) = record.source_url.as_deref() else {
            continue;
        };
        if seen.insert(url.to_string()) {
            candidates.push(record);
        }
    }

    let existing = existing_keys(store, "SELECT url FROM repos");
    candidates.retain(|record| {
        record
            .source_url
            .as_deref()
            .is_some_and(|url| !existing.contains(url))
    });
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO repos(title, author, url, created_at, is_active)
                 VALUES(?1, ?2, ?3, ?4, 1)",
            )
            .context("failed to prepare repo insert")?;
        for record in &candidates {
            statement.execute(params![
                record.repo.name,
                record.repo.owner,
                record.source_url,
                now
            ])?;
        }
    }
    tx.commit()?;

    Ok(candidates.len())
}

/// Reconcile indexers (dataset sources) on their URL natural key.
pub fn reconcile_indexers(store: &mut Store, urls: &[String]) -> Result<usize> {
    let mut candidates: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    for url in urls {
        if seen.insert(url.as_str()) {
            candidates.push(url);
        }
    }

    let existing = existing_keys(store, "SELECT url FROM indexers");
    candidates.retain(|url| !existing.contains(*url));
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO indexers(title, url, created_at, is_active) VALUES(?1, ?2, ?3, 1)",
            )
            .context("failed to prepare indexer insert")?;
        for url in &candidates {
            statement.execute(params![crate::ingest::title_from_url(url), url, now])?;
        }
    }
    tx.commit()?;

    Ok(candidates.len())
}

/// Reconcile video games on the (title, author_id) composite natural key.
/// Must run after authors, repos, and indexers so the reference lookups see
/// the rows inserted in this load.
pub fn reconcile_video_games(store: &mut Store, records: &[GameRecord]) -> Result<usize> {
    let authors = id_lookup(store, "SELECT name, _id FROM authors");
    let repos = id_lookup(store, "SELECT url, _id FROM repos");
    let indexers = id_lookup(store, "SELECT url, _id FROM indexers");

    struct Candidate<'a> {
        title: String,
        author_id: Option<i64>,
        repo_id: Option<i64>,
        indexer_id: Option<i64>,
        record: &'a GameRecord,
    }

    // First row per composite key wins, in input order.
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut seen: HashSet<(String, Option<i64>)> = HashSet::new();
    for record in records {
        let Some(source_url) = record.source_url.as_deref() else {
            continue;
        };

        let title = match record.name.as_deref() {
            Some(name) => name.to_string(),
            None => record.repo.name.clone(),
        };
        let author_id = authors.get(&record.repo.owner).copied();
        if seen.insert((title.clone(), author_id)) {
            candidates.push(Candidate {
                title,
                author_id,
                repo_id: repos.get(source_url).copied(),
                indexer_id: record
                    .dataset_url
                    .as_deref()
                    .and_then(|url| indexers.get(url))
                    .copied(),
                record,
            });
        }
    }

    let existing = existing_composite_keys(store);
    candidates.retain(|candidate| !existing.contains(&(candidate.title.clone(), candidate.author_id)));
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO video_games(
                    title, author_id, repo_id, indexer_id, description, genre,
                    price, steam_id, created_at, is_published
                 ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
            )
            .context("failed to prepare video game insert")?;
        for candidate in &candidates {
            let description = format!("Open source video game: {}", candidate.title);
            let genre = candidate.record.genre.as_deref().unwrap_or("Open Source");
            statement.execute(params![
                candidate.title,
                candidate.author_id,
                candidate.repo_id,
                candidate.indexer_id,
                description,
                genre,
                candidate.record.price,
                candidate.record.steam_id,
                now,
            ])?;
        }
    }
    tx.commit()?;

    Ok(candidates.len())
}

/// Reconcile datasets on their URL natural key.
pub fn reconcile_datasets(store: &mut Store, datasets: &[DatasetRecord]) -> Result<usize> {
    let mut candidates: Vec<&DatasetRecord> = Vec::new();
    let mut seen = HashSet::new();
    for dataset in datasets {
        if seen.insert(dataset.url.as_str()) {
            candidates.push(dataset);
        }
    }

    let existing = existing_keys(store, "SELECT url FROM datasets");
    candidates.retain(|dataset| !existing.contains(&dataset.url));
    if candidates.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare(
                "INSERT INTO datasets(title, author, url, dataset_type, created_at, is_active)
                 VALUES(?1, ?2, ?3, ?4, ?5, 1)",
            )
            .context("failed to prepare dataset insert")?;
        for dataset in &candidates {
            statement.execute(params![
                dataset.title,
                dataset.author,
                dataset.url,
                dataset.dataset_type,
                now
            ])?;
        }
    }
    tx.commit()?;

    Ok(candidates.len())
}

/// Natural-key values already stored for an entity. A failing query means
/// the table has nothing usable yet; the load proceeds with an empty set.
fn existing_keys(store: &Store, sql: &str) -> HashSet<String> {
    match query_key_set(store, sql) {
        Ok(keys) => keys,
        Err(err) => {
            warn!(error = %err, "existing-rows query failed, treating as empty");
            HashSet::new()
        }
    }
}

fn query_key_set(store: &Store, sql: &str) -> Result<HashSet<String>> {
    let mut statement = store.conn().prepare(sql)?;
    let mut rows = statement.query([])?;
    let mut keys = HashSet::new();
    while let Some(row) = rows.next()? {
        keys.insert(row.get::<_, String>(0)?);
    }
    Ok(keys)
}

fn existing_composite_keys(store: &Store) -> HashSet<(String, Option<i64>)> {
    let query = || -> Result<HashSet<(String, Option<i64>)>> {
        let mut statement = store
            .conn()
            .prepare("SELECT title, author_id FROM video_games")?;
        let mut rows = statement.query([])?;
        let mut keys = HashSet::new();
        while let Some(row) = rows.next()? {
            keys.insert((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?));
        }
        Ok(keys)
    };
    match query() {
        Ok(keys) => keys,
        Err(err) => {
            warn!(error = %err, "existing-games query failed, treating as empty");
            HashSet::new()
        }
    }
}

/// Natural-key to surrogate-id map for reference resolution. Failure
/// degrades to an empty map, which leaves the foreign keys null.
fn id_lookup(store: &Store, sql: &str) -> HashMap<String, i64> {
    let query = || -> Result<HashMap<String, i64>> {
        let mut statement = store.conn().prepare(sql)?;
        let mut rows = statement.query([])?;
        let mut lookup = HashMap::new();
        while let Some(row) = rows.next()? {
            lookup.insert(row.get::<_, String>(0)?, row.get::<_, i64>(1)?);
        }
        Ok(lookup)
    };
    match query() {
        Ok(lookup) => lookup,
        Err(err) => {
            warn!(error = %err, "id lookup failed, references will be null");
            HashMap::new()
        }
    }
}
