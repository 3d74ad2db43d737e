use serde::Serialize;

/// Repository owner/name extracted from a source-code URL. Both fields fall
/// back to `"unknown"` when the URL is absent or unparseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

pub const UNKNOWN: &str = "unknown";

impl RepoSlug {
    pub fn unknown() -> Self {
        Self {
            owner: UNKNOWN.to_string(),
            name: UNKNOWN.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.owner == UNKNOWN && self.name == UNKNOWN
    }
}

/// One normalized row of a video-games CSV. Missing or blank cells are `None`;
/// `repo` is derived from `source_url` at ingestion time.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub name: Option<String>,
    pub source_url: Option<String>,
    pub dataset_url: Option<String>,
    pub steam_id: Option<i64>,
    pub genre: Option<String>,
    pub price: Option<String>,
    pub repo: RepoSlug,
}

/// One normalized row of a datasets CSV, or a dataset candidate derived from
/// a referencing-dataset URL during a full load.
#[derive(Debug, Clone)]
pub struct DatasetRecord {
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub dataset_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityCounts {
    pub authors_inserted: Option<usize>,
    pub repos_inserted: Option<usize>,
    pub indexers_inserted: Option<usize>,
    pub video_games_inserted: Option<usize>,
    pub datasets_inserted: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkCounts {
    pub game_authors_inserted: Option<usize>,
    pub game_repos_inserted: Option<usize>,
    pub author_repos_inserted: Option<usize>,
    pub dataset_games_inserted: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub generated_at: String,
    pub db_path: String,
    pub video_games_path: String,
    pub datasets_path: Option<String>,
    pub game_rows_read: usize,
    pub dataset_rows_read: usize,
    pub entities: EntityCounts,
    pub links: LinkCounts,
    pub tables: Vec<TableCount>,
}
