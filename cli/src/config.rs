use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gemini::DEFAULT_MODEL;

const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

pub struct Config {
    pub db_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ai_timeout: Duration,
}

impl Config {
    /// Read settings from the environment. Without `DATABASE_URL` the
    /// database lives in the platform data directory.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match non_empty("DATABASE_URL") {
            Some(url) => database_path_from_url(&url),
            None => default_db_path()?,
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let ai_timeout = match non_empty("GEMINI_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("Invalid GEMINI_TIMEOUT_SECS '{secs}'"))?,
            ),
            None => Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
        };

        Ok(Config {
            db_path,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ai_timeout,
        })
    }

    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.db_path = path;
        }
        self
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "pantry-chef").context("Could not determine home directory")?;
    Ok(proj_dirs.data_dir().join("pantry-chef.db"))
}

/// Accepts a bare path or a `sqlite:`/`file:` URL.
fn database_path_from_url(url: &str) -> PathBuf {
    let path = ["sqlite://", "sqlite:", "file://", "file:"]
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))
        .unwrap_or(url);
    Path::new(path).to_path_buf()
}
