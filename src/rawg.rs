use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::{Value, json};

const API_BASE: &str = "https://api.rawg.io/api/games";

/// One generous timeout for the whole exchange; the API is slow but the
/// caller never retries.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct GameResponse {
    pub status: u16,
    pub body: Value,
}

impl GameResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build()
}

pub fn game_details_url(slug: &str) -> String {
    format!("{API_BASE}/{slug}")
}

/// Game titles as the API expects them: lower-case, hyphen-separated.
pub fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Fetch metadata for one game. Any non-200 status yields an empty JSON
/// object rather than an error; only transport failures propagate.
pub fn fetch_game(agent: &ureq::Agent, slug: &str, key: &str) -> Result<GameResponse> {
    let url = game_details_url(slug);
    let response = match agent.get(&url).query("key", key).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(err)) => bail!("rawg request failed for {slug}: {err}"),
    };

    let status = response.status();
    let body = if status == 200 {
        response.into_json::<Value>().unwrap_or_else(|_| json!({}))
    } else {
        json!({})
    };

    Ok(GameResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_details_url_embeds_the_slug() {
        assert_eq!(
            game_details_url("widget"),
            "https://api.rawg.io/api/games/widget"
        );
    }

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Widget Deluxe II"), "widget-deluxe-ii");
        assert_eq!(slugify("rogue"), "rogue");
    }

    #[test]
    fn non_ok_response_reads_as_empty_object() {
        let response = GameResponse {
            status: 404,
            body: json!({}),
        };
        assert!(!response.is_ok());
        assert_eq!(response.body, json!({}));
    }
}
