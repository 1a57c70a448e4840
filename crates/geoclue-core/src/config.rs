//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__TOP_K`). Typed sections
//! fall back to their defaults when absent.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like `get`, but an absent section yields `T::default()`.
    pub fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.find_value(key).is_err() {
            return Ok(T::default());
        }
        self.get(key)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.section::<RetrievalConfig>("retrieval")?.validate()?;
        Ok(())
    }
}

/// Retrieval tuning shared by the corpus builder and the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub embedding_model: String,
    /// Scores at or below this value are discarded.
    pub acceptance_threshold: f32,
    pub top_k: usize,
    pub batch_size: usize,
    pub backoff_seconds: f64,
    /// Descriptions shorter than this (after trimming) are not queried.
    pub min_description_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding_model: "models/text-embedding-004".to_string(),
            acceptance_threshold: 0.55,
            top_k: 3,
            batch_size: 50,
            backoff_seconds: 2.0,
            min_description_chars: 3,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..1.0).contains(&self.acceptance_threshold) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.acceptance_threshold must be in [-1, 1), got {}",
                self.acceptance_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("retrieval.batch_size must be at least 1".into()));
        }
        if !self.backoff_seconds.is_finite() || self.backoff_seconds < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "retrieval.backoff_seconds must be a non-negative number, got {}",
                self.backoff_seconds
            )));
        }
        if self.min_description_chars == 0 {
            return Err(Error::InvalidConfig("retrieval.min_description_chars must be at least 1".into()));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(Error::InvalidConfig("retrieval.embedding_model must not be empty".into()));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub taxonomy_path: String,
    pub snapshot_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { taxonomy_path: "meta_database.json".to_string(), snapshot_path: "vector_db.json".to_string() }
    }
}

impl DataConfig {
    pub fn taxonomy_file(&self) -> PathBuf {
        expand_path(&self.taxonomy_path)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        expand_path(&self.snapshot_path)
    }
}

/// Remote model service settings (embedding and vision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub vision_model: String,
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            vision_model: "gemini-2.5-flash".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Configured key, falling back to `GOOGLE_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("GOOGLE_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Extracted fields that are scored against the corpus, in scoring order.
    pub scored_categories: Vec<String>,
    /// Image re-scanned when the user just presses Enter.
    pub capture_path: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            scored_categories: ["pole_type", "bollard_type", "road_lines", "plates"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            capture_path: "capture.png".to_string(),
        }
    }
}

/// All typed sections, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub data: DataConfig,
    pub retrieval: RetrievalConfig,
    pub service: ServiceConfig,
    pub assistant: AssistantConfig,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_config(&Config::load()?)
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = Self {
            data: config.section("data")?,
            retrieval: config.section("retrieval")?,
            service: config.section("service")?,
            assistant: config.section("assistant")?,
        };
        settings.retrieval.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
