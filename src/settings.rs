use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "profile_scraper";
const ENV_PREFIX: &str = "PROFILE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub section_wait_ms: u64,
    pub expand_wait_ms: u64,
    pub blocked_retry_limit: u32,
    pub release_on_complete: bool,
    pub db_path: PathBuf,
    pub chunk_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            section_wait_ms: 3_000,
            expand_wait_ms: 20_000,
            blocked_retry_limit: 10,
            release_on_complete: true,
            db_path: PathBuf::from("data/profiles.sqlite"),
            chunk_size: 200,
        }
    }
}

impl Settings {
    /// Defaults, then `profile_scraper.toml` if present, then `PROFILE_*` env vars.
    pub fn load() -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read settings")?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: Config) -> Result<Self> {
        cfg.try_deserialize().context("Invalid settings")
    }

    pub fn section_wait(&self) -> Duration {
        Duration::from_millis(self.section_wait_ms)
    }

    pub fn expand_wait(&self) -> Duration {
        Duration::from_millis(self.expand_wait_ms)
    }
}
