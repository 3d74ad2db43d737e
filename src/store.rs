use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::TableCount;
use crate::util::now_utc_string;

/// The nine tables of the schema, with display labels, in load order.
pub const TABLES: [(&str, &str); 9] = [
    ("authors", "Authors/Developers"),
    ("repos", "Repositories"),
    ("indexers", "Dataset Sources"),
    ("video_games", "Video Games"),
    ("datasets", "Datasets"),
    ("game_authors", "Game-Author Links"),
    ("game_repos", "Game-Repository Links"),
    ("author_repos", "Author-Repository Links"),
    ("dataset_to_video_game", "Dataset-Video Game Links"),
];

/// Storage handle. Opening applies the connection pragmas and ensures the
/// schema exists, so every command is safe to run against a fresh path.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        configure_connection(&conn)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn table_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("failed to count rows in {table}"))?;
        Ok(count)
    }

    /// Row counts for all nine tables; `None` marks a missing table.
    pub fn table_counts(&self) -> Vec<TableCount> {
        TABLES
            .iter()
            .map(|(table, _)| TableCount {
                table: (*table).to_string(),
                rows: self.table_count(table).ok(),
            })
            .collect()
    }
}

/// Row-level maintenance operations, mirrored from the interactive tooling
/// the loader ships alongside. Constraint violations surface as boolean
/// failures, not process errors.
#[allow(dead_code)]
impl Store {
    pub fn insert_author(&self, name: &str, email: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO authors(name, email, created_at, is_active) VALUES(?1, ?2, ?3, 1)",
                params![name, email, now_utc_string()],
            )
            .with_context(|| format!("failed to insert author {name}"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_video_game(&self, game: &NewVideoGame<'_>) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO video_games(
                    title, author_id, repo_id, indexer_id, description, genre,
                    price, steam_id, created_at, is_published
                 ) VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    game.title,
                    game.author_id,
                    game.repo_id,
                    game.indexer_id,
                    game.description,
                    game.genre,
                    game.price,
                    game.steam_id,
                    now_utc_string(),
                    game.is_published,
                ],
            )
            .with_context(|| format!("failed to insert video game {}", game.title))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_game(&self, game_id: i64) -> bool {
        match self
            .conn
            .execute("DELETE FROM video_games WHERE _id = ?1", [game_id])
        {
            Ok(deleted) => deleted > 0,
            Err(_) => false,
        }
    }

    /// Fails (returns false) if the author still has games, since the join
    /// and game tables reference authors.
    pub fn delete_author(&self, author_id: i64) -> bool {
        match self
            .conn
            .execute("DELETE FROM authors WHERE _id = ?1", [author_id])
        {
            Ok(deleted) => deleted > 0,
            Err(_) => false,
        }
    }

    pub fn delete_author_and_games(&mut self, author_id: i64) -> bool {
        let Ok(tx) = self.conn.transaction() else {
            return false;
        };
        let deleted = tx
            .execute(
                "DELETE FROM video_games WHERE author_id = ?1",
                [author_id],
            )
            .and_then(|_| tx.execute("DELETE FROM authors WHERE _id = ?1", [author_id]));
        match deleted {
            Ok(count) if count > 0 => tx.commit().is_ok(),
            _ => false,
        }
    }
}

/// Insert payload for a video game row; FK ids stay `None` when the
/// referenced entity could not be resolved.
#[allow(dead_code)]
pub struct NewVideoGame<'a> {
    pub title: &'a str,
    pub author_id: Option<i64>,
    pub repo_id: Option<i64>,
    pub indexer_id: Option<i64>,
    pub description: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub price: Option<&'a str>,
    pub steam_id: Option<i64>,
    pub is_published: bool,
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")?;
    Ok(())
}

fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS authors (
          _id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          email TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT,
          is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS repos (
          _id INTEGER PRIMARY KEY,
          title TEXT,
          author TEXT,
          url TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT,
          is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS indexers (
          _id INTEGER PRIMARY KEY,
          title TEXT,
          url TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT,
          is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS video_games (
          _id INTEGER PRIMARY KEY,
          title TEXT NOT NULL,
          author_id INTEGER,
          repo_id INTEGER,
          indexer_id INTEGER,
          description TEXT,
          genre TEXT,
          price TEXT,
          steam_id INTEGER,
          created_at TEXT NOT NULL,
          updated_at TEXT,
          is_published INTEGER NOT NULL DEFAULT 0,
          FOREIGN KEY(author_id) REFERENCES authors(_id),
          FOREIGN KEY(repo_id) REFERENCES repos(_id),
          FOREIGN KEY(indexer_id) REFERENCES indexers(_id)
        );

        CREATE TABLE IF NOT EXISTS datasets (
          _id INTEGER PRIMARY KEY,
          title TEXT,
          author TEXT,
          url TEXT NOT NULL,
          dataset_type TEXT,
          created_at TEXT NOT NULL,
          updated_at TEXT,
          is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS game_authors (
          game_id INTEGER NOT NULL,
          author_id INTEGER NOT NULL,
          role TEXT NOT NULL DEFAULT 'primary_developer',
          created_at TEXT NOT NULL,
          PRIMARY KEY (game_id, author_id),
          FOREIGN KEY(game_id) REFERENCES video_games(_id),
          FOREIGN KEY(author_id) REFERENCES authors(_id)
        );

        CREATE TABLE IF NOT EXISTS game_repos (
          game_id INTEGER NOT NULL,
          repo_id INTEGER NOT NULL,
          repo_type TEXT NOT NULL DEFAULT 'main',
          created_at TEXT NOT NULL,
          PRIMARY KEY (game_id, repo_id),
          FOREIGN KEY(game_id) REFERENCES video_games(_id),
          FOREIGN KEY(repo_id) REFERENCES repos(_id)
        );

        CREATE TABLE IF NOT EXISTS author_repos (
          author_id INTEGER NOT NULL,
          repo_id INTEGER NOT NULL,
          contribution_type TEXT NOT NULL DEFAULT 'owner',
          created_at TEXT NOT NULL,
          PRIMARY KEY (author_id, repo_id),
          FOREIGN KEY(author_id) REFERENCES authors(_id),
          FOREIGN KEY(repo_id) REFERENCES repos(_id)
        );

        CREATE TABLE IF NOT EXISTS dataset_to_video_game (
          dataset_id INTEGER NOT NULL,
          video_game_id INTEGER NOT NULL,
          link_type TEXT NOT NULL DEFAULT 'referenced',
          created_at TEXT NOT NULL,
          PRIMARY KEY (dataset_id, video_game_id),
          FOREIGN KEY(dataset_id) REFERENCES datasets(_id),
          FOREIGN KEY(video_game_id) REFERENCES video_games(_id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_authors_name ON authors(name);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_repos_url ON repos(url);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_indexers_url ON indexers(url);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_datasets_url ON datasets(url);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_video_games_natural
          ON video_games(title, author_id);
        ",
    )
    .context("failed to create schema")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_schema_is_idempotent() {
        let store = Store::open_in_memory().expect("store opens");
        ensure_schema(store.conn()).expect("second schema pass is a no-op");

        for (table, _) in TABLES {
            assert_eq!(store.table_count(table).expect("table exists"), 0);
        }
    }

    #[test]
    fn table_counts_reports_missing_tables_as_none() {
        let store = Store::open_in_memory().expect("store opens");
        store
            .conn()
            .execute_batch("DROP TABLE dataset_to_video_game")
            .expect("drop table");

        let counts = store.table_counts();
        let missing = counts
            .iter()
            .find(|count| count.table == "dataset_to_video_game")
            .expect("entry present");
        assert!(missing.rows.is_none());
        assert!(
            counts
                .iter()
                .filter(|count| count.table != "dataset_to_video_game")
                .all(|count| count.rows == Some(0))
        );
    }

    #[test]
    fn delete_author_with_games_fails_without_cascade() {
        let mut store = Store::open_in_memory().expect("store opens");
        let author_id = store
            .insert_author("Test Developer", "test@example.com")
            .expect("author inserts");
        let game_id = store
            .insert_video_game(&NewVideoGame {
                title: "Test Game",
                author_id: Some(author_id),
                repo_id: None,
                indexer_id: None,
                description: None,
                genre: Some("Test"),
                price: Some("Free"),
                steam_id: None,
                is_published: true,
            })
            .expect("game inserts");

        assert!(!store.delete_author(author_id));
        assert!(store.delete_author_and_games(author_id));
        assert_eq!(store.table_count("video_games").expect("count"), 0);
        assert_eq!(store.table_count("authors").expect("count"), 0);
        assert!(!store.delete_game(game_id));
    }

    #[test]
    fn delete_game_removes_single_row() {
        let store = Store::open_in_memory().expect("store opens");
        let game_id = store
            .insert_video_game(&NewVideoGame {
                title: "Standalone",
                author_id: None,
                repo_id: None,
                indexer_id: None,
                description: None,
                genre: None,
                price: None,
                steam_id: None,
                is_published: false,
            })
            .expect("game inserts");

        assert!(store.delete_game(game_id));
        assert!(!store.delete_game(game_id));
    }
}
