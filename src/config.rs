use std::path::PathBuf;

use reqwest::Url;

use crate::error::{ConsoleError, ConsoleResult};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api/v1";
pub const DEFAULT_DATA_DIR: &str = "data";
const STORAGE_FILE: &str = "storage.json";

/// Runtime settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
}

impl ConsoleConfig {
    /// Reads `KR_API_BASE_URL` and `KR_DATA_DIR`, falling back to defaults.
    pub fn from_env() -> ConsoleResult<Self> {
        let api_base_url = std::env::var("KR_API_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let data_dir = std::env::var("KR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(api_base_url, data_dir)
    }

    pub fn new(api_base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> ConsoleResult<Self> {
        let api_base_url = validate_base_url(&api_base_url.into())?;
        Ok(Self { api_base_url, data_dir: data_dir.into() })
    }

    pub fn with_api_base_url(self, url: &str) -> ConsoleResult<Self> {
        Ok(Self { api_base_url: validate_base_url(url)?, ..self })
    }

    /// File backing the durable key/value storage.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILE)
    }
}

fn validate_base_url(raw: &str) -> ConsoleResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .map_err(|e| ConsoleError::Config(format!("KR_API_BASE_URL '{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConsoleError::Config(format!(
            "KR_API_BASE_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(trimmed.to_string())
}
