use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cost::ModelId;
use crate::llm_client::DEFAULT_BASE_URL;
use crate::sanitizer::DEFAULT_RELATED_SECTION_KEYWORDS;

/// Application configuration loaded from environment variables (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    /// Only `run` and `serve` need it; see `require_api_key`.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub default_model: ModelId,
    pub output_dir: PathBuf,
    pub settle_delay: Duration,
    pub scroll_delay: Duration,
    pub navigation_timeout: Duration,
    pub llm_timeout: Duration,
    pub chrome_executable: Option<PathBuf>,
    pub pricing_file: Option<PathBuf>,
    pub related_section_keywords: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            openai_api_key: optional_env("OPENAI_API_KEY"),
            openai_base_url: optional_env("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: ModelId::new(
                optional_env("DEFAULT_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            ),
            output_dir: optional_env("OUTPUT_DIR")
                .unwrap_or_else(|| "output".to_string())
                .into(),
            settle_delay: Duration::from_millis(parse_env("SETTLE_DELAY_MS", 5000)?),
            scroll_delay: Duration::from_millis(parse_env("SCROLL_DELAY_MS", 3000)?),
            navigation_timeout: Duration::from_secs(parse_env("NAVIGATION_TIMEOUT_SECS", 60)?),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            chrome_executable: optional_env("CHROME_EXECUTABLE").map(PathBuf::from),
            pricing_file: optional_env("PRICING_FILE").map(PathBuf::from),
            related_section_keywords: optional_env("RELATED_SECTION_KEYWORDS")
                .map(|v| split_keywords(&v))
                .unwrap_or_else(|| {
                    DEFAULT_RELATED_SECTION_KEYWORDS
                        .iter()
                        .map(|k| k.to_string())
                        .collect()
                }),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.openai_api_key
            .clone()
            .context("Required environment variable 'OPENAI_API_KEY' is not set")
    }
}

/// Unset and blank values both count as missing.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value '{raw}' for environment variable '{key}'")),
        None => Ok(default),
    }
}

/// Comma-separated list; empty entries are dropped.
fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keywords() {
        assert_eq!(
            split_keywords("Related Jobs, More roles ,,Similar Jobs"),
            vec!["Related Jobs", "More roles", "Similar Jobs"]
        );
    }

    #[test]
    fn test_parse_env_default_and_error() {
        let value: u64 = parse_env("EXTRACTOR_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);

        std::env::set_var("EXTRACTOR_TEST_BAD_NUMBER", "soon");
        let err = parse_env::<u64>("EXTRACTOR_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(err.to_string().contains("EXTRACTOR_TEST_BAD_NUMBER"));
    }
}
