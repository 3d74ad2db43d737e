use anyhow::{Context, Result};
use rusqlite::params;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::RawgArgs;
use crate::rawg::{agent, fetch_game, slugify};
use crate::store::Store;
use crate::util::now_utc_string;

pub fn run(args: RawgArgs) -> Result<()> {
    let agent = agent();

    if let Some(game) = &args.game {
        let response = fetch_game(&agent, &slugify(game), &args.key)?;
        info!(game = %game, status = response.status, "fetched game metadata");
        println!("{}", serde_json::to_string_pretty(&response.body)?);
        return Ok(());
    }

    let store = Store::open(&args.db)?;
    let games = stored_games(&store)?;
    info!(games = games.len(), "fetching metadata for stored games");

    let mut updated = 0usize;
    for (game_id, title) in &games {
        let response = match fetch_game(&agent, &slugify(title), &args.key) {
            Ok(response) => response,
            Err(err) => {
                warn!(game = %title, error = %err, "metadata request failed");
                continue;
            }
        };
        if !response.is_ok() {
            warn!(game = %title, status = response.status, "no metadata available");
            continue;
        }
        if apply_metadata(&store, *game_id, &response.body)? {
            updated += 1;
        }
    }

    info!(updated, "metadata backfill completed");
    Ok(())
}

fn stored_games(store: &Store) -> Result<Vec<(i64, String)>> {
    let mut statement = store
        .conn()
        .prepare("SELECT _id, title FROM video_games ORDER BY _id")
        .context("failed to query stored games")?;
    let mut rows = statement.query([])?;
    let mut games = Vec::new();
    while let Some(row) = rows.next()? {
        games.push((row.get::<_, i64>(0)?, row.get::<_, String>(1)?));
    }
    Ok(games)
}

/// Write the fields the API actually returned; anything absent keeps its
/// stored value. Returns whether the row changed.
fn apply_metadata(store: &Store, game_id: i64, body: &Value) -> Result<bool> {
    let description = body
        .get("description_raw")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty());
    let genre = body
        .get("genres")
        .and_then(Value::as_array)
        .and_then(|genres| genres.first())
        .and_then(|genre| genre.get("name"))
        .and_then(Value::as_str);

    if description.is_none() && genre.is_none() {
        return Ok(false);
    }

    store
        .conn()
        .execute(
            "UPDATE video_games
             SET description = COALESCE(?1, description),
                 genre = COALESCE(?2, genre),
                 updated_at = ?3
             WHERE _id = ?4",
            params![description, genre, now_utc_string(), game_id],
        )
        .context("failed to update game metadata")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::NewVideoGame;

    fn store_with_game() -> (Store, i64) {
        let store = Store::open_in_memory().expect("store opens");
        let game_id = store
            .insert_video_game(&NewVideoGame {
                title: "widget",
                author_id: None,
                repo_id: None,
                indexer_id: None,
                description: Some("Open source video game: widget"),
                genre: Some("Open Source"),
                price: None,
                steam_id: None,
                is_published: true,
            })
            .expect("game inserts");
        (store, game_id)
    }

    #[test]
    fn apply_metadata_overwrites_returned_fields() {
        let (store, game_id) = store_with_game();
        let body = json!({
            "description_raw": "A puzzle game about widgets.",
            "genres": [{"name": "Puzzle"}, {"name": "Indie"}],
        });

        assert!(apply_metadata(&store, game_id, &body).expect("update"));

        let (description, genre): (String, String) = store
            .conn()
            .query_row(
                "SELECT description, genre FROM video_games WHERE _id = ?1",
                [game_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .expect("row");
        assert_eq!(description, "A puzzle game about widgets.");
        assert_eq!(genre, "Puzzle");
    }

    #[test]
    fn apply_metadata_ignores_empty_bodies() {
        let (store, game_id) = store_with_game();

        assert!(!apply_metadata(&store, game_id, &json!({})).expect("no-op"));

        let genre: String = store
            .conn()
            .query_row(
                "SELECT genre FROM video_games WHERE _id = ?1",
                [game_id],
                |row| row.get(0),
            )
            .expect("row");
        assert_eq!(genre, "Open Source");
    }

    #[test]
    fn stored_games_lists_in_id_order() {
        let (store, first_id) = store_with_game();
        store
            .insert_video_game(&NewVideoGame {
                title: "rogue",
                author_id: None,
                repo_id: None,
                indexer_id: None,
                description: None,
                genre: None,
                price: None,
                steam_id: None,
                is_published: false,
            })
            .expect("second game inserts");

        let games = stored_games(&store).expect("games list");
        assert_eq!(games.len(), 2);
        assert_eq!(games[0], (first_id, "widget".to_string()));
    }
}
