use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::params;
use tracing::{info, warn};

use crate::model::LinkCounts;
use crate::store::Store;
use crate::util::now_utc_string;

/// One row per game with a resolved author reference.
const GAME_AUTHOR_PAIRS: &str =
    "SELECT _id, author_id FROM video_games WHERE author_id IS NOT NULL";

/// One row per game with a resolved repository reference.
const GAME_REPO_PAIRS: &str = "SELECT _id, repo_id FROM video_games WHERE repo_id IS NOT NULL";

/// Authors paired with repositories whose stored owner name matches exactly.
const AUTHOR_REPO_PAIRS: &str = "
    SELECT DISTINCT a._id, r._id
    FROM authors a
    JOIN repos r ON a.name = r.author";

/// Datasets paired with games whose indexer URL equals the dataset URL.
const DATASET_GAME_PAIRS: &str = "
    SELECT d._id, vg._id
    FROM video_games vg
    JOIN indexers i ON vg.indexer_id = i._id
    JOIN datasets d ON d.url = i.url";

/// Derive all four join tables from current entity state. Each table is an
/// independent unit: a failed derivation is logged and leaves its count
/// unset while the remaining tables still run.
pub fn derive_all(store: &mut Store) -> LinkCounts {
    LinkCounts {
        game_authors_inserted: link_step("game_authors", derive_game_authors(store)),
        game_repos_inserted: link_step("game_repos", derive_game_repos(store)),
        author_repos_inserted: link_step("author_repos", derive_author_repos(store)),
        dataset_games_inserted: link_step("dataset_to_video_game", derive_dataset_links(store)),
    }
}

pub fn derive_game_authors(store: &mut Store) -> Result<usize> {
    insert_missing_links(
        store,
        GAME_AUTHOR_PAIRS,
        "SELECT game_id, author_id FROM game_authors",
        "INSERT INTO game_authors(game_id, author_id, role, created_at)
         VALUES(?1, ?2, 'primary_developer', ?3)",
    )
}

pub fn derive_game_repos(store: &mut Store) -> Result<usize> {
    insert_missing_links(
        store,
        GAME_REPO_PAIRS,
        "SELECT game_id, repo_id FROM game_repos",
        "INSERT INTO game_repos(game_id, repo_id, repo_type, created_at)
         VALUES(?1, ?2, 'main', ?3)",
    )
}

pub fn derive_author_repos(store: &mut Store) -> Result<usize> {
    insert_missing_links(
        store,
        AUTHOR_REPO_PAIRS,
        "SELECT author_id, repo_id FROM author_repos",
        "INSERT INTO author_repos(author_id, repo_id, contribution_type, created_at)
         VALUES(?1, ?2, 'owner', ?3)",
    )
}

pub fn derive_dataset_links(store: &mut Store) -> Result<usize> {
    insert_missing_links(
        store,
        DATASET_GAME_PAIRS,
        "SELECT dataset_id, video_game_id FROM dataset_to_video_game",
        "INSERT INTO dataset_to_video_game(dataset_id, video_game_id, link_type, created_at)
         VALUES(?1, ?2, 'referenced', ?3)",
    )
}

/// The shared derivation step: compute candidate id pairs, suppress
/// duplicates within the pass, subtract pairs already linked, insert the
/// remainder in one transaction.
fn insert_missing_links(
    store: &mut Store,
    pairs_sql: &str,
    existing_sql: &str,
    insert_sql: &str,
) -> Result<usize> {
    let pairs = query_pairs(store, pairs_sql).context("failed to derive candidate links")?;

    // First computed row wins; later duplicates are suppressed before the
    // existing-rows filter.
    let mut fresh: Vec<(i64, i64)> = Vec::new();
    let mut seen = HashSet::new();
    for pair in pairs {
        if seen.insert(pair) {
            fresh.push(pair);
        }
    }

    let existing = existing_pairs(store, existing_sql);
    fresh.retain(|pair| !existing.contains(pair));
    if fresh.is_empty() {
        return Ok(0);
    }

    let now = now_utc_string();
    let tx = store.conn_mut().transaction()?;
    {
        let mut statement = tx
            .prepare(insert_sql)
            .context("failed to prepare link insert")?;
        for (left, right) in &fresh {
            statement.execute(params![left, right, now])?;
        }
    }
    tx.commit()?;

    Ok(fresh.len())
}

fn query_pairs(store: &Store, sql: &str) -> Result<Vec<(i64, i64)>> {
    let mut statement = store.conn().prepare(sql)?;
    let mut rows = statement.query([])?;
    let mut pairs = Vec::new();
    while let Some(row) = rows.next()? {
        pairs.push((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?));
    }
    Ok(pairs)
}

/// Composite keys already present in a join table; a failing query is
/// treated as an empty table so re-derivation can repopulate it.
fn existing_pairs(store: &Store, sql: &str) -> HashSet<(i64, i64)> {
    match query_pairs(store, sql) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            warn!(error = %err, "existing-links query failed, treating as empty");
            HashSet::new()
        }
    }
}

fn link_step(table: &str, result: Result<usize>) -> Option<usize> {
    match result {
        Ok(inserted) => {
            info!(table, inserted, "derived relationship links");
            Some(inserted)
        }
        Err(err) => {
            warn!(table, error = %err, "link derivation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().expect("store opens");
        let conn = store.conn_mut();
        conn.execute_batch(
            "
            INSERT INTO authors(_id, name, email, created_at) VALUES
              (1, 'acme', 'acme@github.com', '2026-01-01T00:00:00Z'),
              (2, 'solo', 'solo@github.com', '2026-01-01T00:00:00Z');
            INSERT INTO repos(_id, title, author, url, created_at) VALUES
              (1, 'widget', 'acme', 'https://github.com/acme/widget', '2026-01-01T00:00:00Z'),
              (2, 'rogue', 'Acme', 'https://github.com/Acme/rogue', '2026-01-01T00:00:00Z');
            INSERT INTO indexers(_id, title, url, created_at) VALUES
              (1, 'd1', 'http://x/d1', '2026-01-01T00:00:00Z');
            INSERT INTO datasets(_id, title, author, url, created_at) VALUES
              (1, 'd1', 'community', 'http://x/d1', '2026-01-01T00:00:00Z'),
              (2, 'd2', 'community', 'http://x/d2', '2026-01-01T00:00:00Z');
            INSERT INTO video_games(_id, title, author_id, repo_id, indexer_id, created_at) VALUES
              (1, 'widget', 1, 1, 1, '2026-01-01T00:00:00Z'),
              (2, 'orphan', NULL, NULL, NULL, '2026-01-01T00:00:00Z');
            ",
        )
        .expect("seed rows");
        store
    }

    #[test]
    fn derive_game_authors_links_games_with_resolved_authors() {
        let mut store = seeded_store();

        assert_eq!(derive_game_authors(&mut store).expect("derive"), 1);
        let (game_id, author_id, role): (i64, i64, String) = store
            .conn()
            .query_row(
                "SELECT game_id, author_id, role FROM game_authors",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("link row");
        assert_eq!((game_id, author_id), (1, 1));
        assert_eq!(role, "primary_developer");

        // re-derivation finds nothing new
        assert_eq!(derive_game_authors(&mut store).expect("derive again"), 0);
    }

    #[test]
    fn derive_author_repos_matches_owner_name_case_sensitively() {
        let mut store = seeded_store();

        assert_eq!(derive_author_repos(&mut store).expect("derive"), 1);
        let (author_id, repo_id, contribution): (i64, i64, String) = store
            .conn()
            .query_row(
                "SELECT author_id, repo_id, contribution_type FROM author_repos",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("link row");
        // repo 2 is owned by 'Acme', which must not match author 'acme'
        assert_eq!((author_id, repo_id), (1, 1));
        assert_eq!(contribution, "owner");
    }

    #[test]
    fn derive_dataset_links_joins_on_url_equality() {
        let mut store = seeded_store();

        assert_eq!(derive_dataset_links(&mut store).expect("derive"), 1);
        let (dataset_id, game_id, link_type): (i64, i64, String) = store
            .conn()
            .query_row(
                "SELECT dataset_id, video_game_id, link_type FROM dataset_to_video_game",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .expect("link row");
        // only dataset 1 shares its url with the game's indexer
        assert_eq!((dataset_id, game_id), (1, 1));
        assert_eq!(link_type, "referenced");

        assert_eq!(derive_dataset_links(&mut store).expect("derive again"), 0);
    }

    #[test]
    fn derive_all_isolates_a_failing_table() {
        let mut store = seeded_store();
        store
            .conn()
            .execute_batch(
                "UPDATE video_games SET indexer_id = NULL;
                 DROP TABLE dataset_to_video_game;
                 DROP TABLE indexers;",
            )
            .expect("drop tables");

        let counts = derive_all(&mut store);
        assert_eq!(counts.game_authors_inserted, Some(1));
        assert_eq!(counts.game_repos_inserted, Some(1));
        assert_eq!(counts.author_repos_inserted, Some(1));
        assert!(counts.dataset_games_inserted.is_none());
    }

    #[test]
    fn insert_missing_links_suppresses_in_pass_duplicates() {
        let mut store = seeded_store();

        let inserted = insert_missing_links(
            &mut store,
            "SELECT 1, 1 UNION ALL SELECT 1, 1 UNION ALL SELECT 1, 2",
            "SELECT game_id, author_id FROM game_authors",
            "INSERT INTO game_authors(game_id, author_id, role, created_at)
             VALUES(?1, ?2, 'primary_developer', ?3)",
        )
        .expect("insert");
        assert_eq!(inserted, 2);
    }
}
