use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use tracing::warn;

use crate::model::{DatasetRecord, GameRecord, RepoSlug, UNKNOWN};

const SOURCE_URL_COLUMNS: [&str; 2] = ["source code url", "source_code_url"];
const DATASET_URL_COLUMNS: [&str; 2] = ["referencing dataset", "dataset_url"];
const NAME_COLUMNS: [&str; 2] = ["name", "title"];
const DATASET_TYPE_COLUMNS: [&str; 2] = ["dataset_type", "type"];

/// Extracts repository owner/name pairs from source-code URLs.
pub struct UrlExtractor {
    hosted: Regex,
}

impl UrlExtractor {
    pub fn new() -> Result<Self> {
        let hosted = Regex::new(
            r"(?:github\.com|gitlab\.com|bitbucket\.org)/(?P<owner>[^/]+)/(?P<name>[^/]+)",
        )
        .context("failed to compile hosted-repository pattern")?;
        Ok(Self { hosted })
    }

    /// Derive owner and repository name from a source URL. Never fails: an
    /// absent or unparseable URL yields the `"unknown"` sentinel for both
    /// fields.
    pub fn repo_slug(&self, url: Option<&str>) -> RepoSlug {
        let Some(url) = url.map(str::trim).filter(|value| !value.is_empty()) else {
            return RepoSlug::unknown();
        };

        if let Some(captures) = self.hosted.captures(url) {
            return RepoSlug {
                owner: non_empty_or_unknown(&captures["owner"]),
                name: non_empty_or_unknown(clean_repo_name(&captures["name"])),
            };
        }

        // No recognized host: take the last two path segments as name/owner.
        let trimmed = url.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.len() >= 2 {
            let name = clean_repo_name(segments[segments.len() - 1]);
            let owner = segments[segments.len() - 2];
            return RepoSlug {
                owner: non_empty_or_unknown(owner),
                name: non_empty_or_unknown(name),
            };
        }

        RepoSlug::unknown()
    }
}

fn clean_repo_name(name: &str) -> &str {
    let name = name.trim_end_matches('/');
    name.strip_suffix(".git").unwrap_or(name)
}

fn non_empty_or_unknown(value: &str) -> String {
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

/// Title for an indexer or dataset row: the last path segment of its URL.
pub fn title_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Read a video-games CSV into normalized records. Column names are matched
/// case-insensitively and the ingestion-specific aliases (`source_code_url`,
/// `dataset_url`) are accepted alongside the export headers.
pub fn read_game_records(path: &Path) -> Result<Vec<GameRecord>> {
    let extractor = UrlExtractor::new()?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open csv file: {}", path.display()))?;

    let headers = normalized_headers(&mut reader, path)?;
    let name_idx = find_column(&headers, &NAME_COLUMNS);
    let source_idx = find_column(&headers, &SOURCE_URL_COLUMNS);
    let dataset_idx = find_column(&headers, &DATASET_URL_COLUMNS);
    let steam_idx = find_column(&headers, &["steam_id"]);
    let genre_idx = find_column(&headers, &["genre"]);
    let price_idx = find_column(&headers, &["price"]);

    let mut records = Vec::new();
    for (row_number, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("failed to read csv row {}", row_number + 2))?;

        let source_url = cell(&record, source_idx);
        let steam_id = cell(&record, steam_idx).and_then(|raw| match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(row = row_number + 2, value = %raw, "unparseable steam id, dropping");
                None
            }
        });
        let repo = extractor.repo_slug(source_url.as_deref());
        if repo.is_unknown() && source_url.is_some() {
            warn!(row = row_number + 2, "unparseable source url, using sentinel owner/name");
        }

        records.push(GameRecord {
            name: cell(&record, name_idx),
            source_url,
            dataset_url: cell(&record, dataset_idx),
            steam_id,
            genre: cell(&record, genre_idx),
            price: cell(&record, price_idx),
            repo,
        });
    }

    Ok(records)
}

/// Read a datasets CSV. Rows without a URL carry no natural key and are
/// skipped with a warning rather than failing the load.
pub fn read_dataset_records(path: &Path) -> Result<Vec<DatasetRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open csv file: {}", path.display()))?;

    let headers = normalized_headers(&mut reader, path)?;
    let title_idx = find_column(&headers, &NAME_COLUMNS);
    let url_idx = find_column(&headers, &["url", "dataset_uri"]);
    let author_idx = find_column(&headers, &["author"]);
    let type_idx = find_column(&headers, &DATASET_TYPE_COLUMNS);

    let mut records = Vec::new();
    for (row_number, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("failed to read csv row {}", row_number + 2))?;

        let Some(url) = cell(&record, url_idx) else {
            warn!(row = row_number + 2, "dataset row without url, skipping");
            continue;
        };

        let title = cell(&record, title_idx).unwrap_or_else(|| title_from_url(&url));
        records.push(DatasetRecord {
            title,
            url,
            author: cell(&record, author_idx),
            dataset_type: cell(&record, type_idx),
        });
    }

    Ok(records)
}

/// Dataset candidate for a referencing-dataset URL seen in a games CSV.
pub fn dataset_from_url(url: &str) -> DatasetRecord {
    DatasetRecord {
        title: title_from_url(url),
        url: url.to_string(),
        author: Some("community".to_string()),
        dataset_type: Some("game_collection".to_string()),
    }
}

fn normalized_headers<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
) -> Result<Vec<String>> {
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read csv header row: {}", path.display()))?;
    Ok(headers
        .iter()
        .map(|header| header.trim().to_lowercase())
        .collect())
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|header| header == name))
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}
