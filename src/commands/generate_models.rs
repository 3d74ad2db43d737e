use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::GenerateModelsArgs;
use crate::util::ensure_directory;

/// Row structs mirroring the database schema, emitted as a source artifact
/// for downstream consumers.
const MODELS_SOURCE: &str = r#"// Generated by `osvg generate-models`. Mirrors the database schema; do not edit.

#[derive(Debug, Clone)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Repo {
    pub id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Indexer {
    pub id: i64,
    pub title: Option<String>,
    pub url: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct VideoGame {
    pub id: i64,
    pub title: String,
    pub author_id: Option<i64>,
    pub repo_id: Option<i64>,
    pub indexer_id: Option<i64>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub price: Option<String>,
    pub steam_id: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub url: String,
    pub dataset_type: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct GameAuthor {
    pub game_id: i64,
    pub author_id: i64,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct GameRepo {
    pub game_id: i64,
    pub repo_id: i64,
    pub repo_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AuthorRepo {
    pub author_id: i64,
    pub repo_id: i64,
    pub contribution_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DatasetToVideoGame {
    pub dataset_id: i64,
    pub video_game_id: i64,
    pub link_type: String,
    pub created_at: String,
}
"#;

pub fn run(args: GenerateModelsArgs) -> Result<()> {
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    fs::write(&args.out, MODELS_SOURCE)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), "wrote generated models");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_source_names_every_table_struct() {
        for name in [
            "struct Author",
            "struct Repo",
            "struct Indexer",
            "struct VideoGame",
            "struct Dataset",
            "struct GameAuthor",
            "struct GameRepo",
            "struct AuthorRepo",
            "struct DatasetToVideoGame",
        ] {
            assert!(MODELS_SOURCE.contains(name), "missing {name}");
        }
    }

    #[test]
    fn run_writes_the_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("generated_models.rs");

        run(GenerateModelsArgs { out: out.clone() }).expect("generate");

        let contents = fs::read_to_string(&out).expect("read artifact");
        assert!(contents.starts_with("// Generated by `osvg generate-models`"));
    }
}
