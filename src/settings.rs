use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_LISTING_URL: &str = "https://en.wikipedia.org/wiki/List_of_highest-grossing_films";
const DEFAULT_SITE_ORIGIN: &str = "https://en.wikipedia.org";
const DEFAULT_DB_PATH: &str = "data/films.sqlite";
const DEFAULT_DELAY_MS: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listing_url: String,
    pub site_origin: String,
    pub db_path: PathBuf,
    pub request_delay_ms: u64,
    pub user_agent: String,
}

impl Settings {
    /// Defaults, then `films.toml` if present, then `FILMS_*` environment variables.
    pub fn load() -> Result<Self> {
        Config::builder()
            .set_default("listing_url", DEFAULT_LISTING_URL)?
            .set_default("site_origin", DEFAULT_SITE_ORIGIN)?
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("request_delay_ms", DEFAULT_DELAY_MS)?
            .set_default("user_agent", default_user_agent())?
            .add_source(File::with_name("films").required(false))
            .add_source(Environment::with_prefix("FILMS"))
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            site_origin: DEFAULT_SITE_ORIGIN.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            request_delay_ms: DEFAULT_DELAY_MS as u64,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("film_scraper/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_wikipedia() {
        let s = Settings::default();
        assert!(s.listing_url.starts_with(&s.site_origin));
        assert_eq!(s.request_delay(), Duration::from_millis(100));
        assert!(s.user_agent.starts_with("film_scraper/"));
    }

    #[test]
    fn load_without_overrides_matches_defaults() {
        let loaded = Settings::load().unwrap();
        let defaults = Settings::default();
        assert_eq!(loaded.site_origin, defaults.site_origin);
        assert_eq!(loaded.listing_url, defaults.listing_url);
    }
}
