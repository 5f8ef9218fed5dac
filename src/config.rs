//! Service configuration from environment variables

use crate::index::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::llm::Sampling;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `SQLite` file backing the document index
    pub index_path: PathBuf,
    /// Directory ingested into the index at startup
    pub docs_dir: Option<PathBuf>,
    pub top_k: usize,
    pub wiki_top_k: usize,
    pub wiki_max_chars: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Bound on each encyclopedia, web, and index lookup
    pub source_timeout: Duration,
    /// Bound on each language-model call
    pub llm_timeout: Duration,
    /// Idle time after which a session is dropped; `None` when set to 0
    pub session_ttl: Option<Duration>,
    pub sampling: Sampling,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            index_path: default_index_path(std::env::var("HOME").ok()),
            docs_dir: None,
            top_k: 3,
            wiki_top_k: 2,
            wiki_max_chars: 2000,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            source_timeout: Duration::from_secs(20),
            llm_timeout: Duration::from_secs(60),
            session_ttl: Some(Duration::from_secs(3600)),
            sampling: Sampling::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup; unset or blank variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let num = |var: &'static str, default| parsed(get(var), var, default);

        let ttl_secs = parsed(
            get("MEDIGENIUS_SESSION_TTL_SECS"),
            "MEDIGENIUS_SESSION_TTL_SECS",
            defaults.session_ttl.map_or(0, |ttl| ttl.as_secs()),
        )?;

        let port = match get("MEDIGENIUS_PORT") {
            Some(value) => parsed(Some(value), "MEDIGENIUS_PORT", defaults.port)?,
            None => parsed(get("PORT"), "PORT", defaults.port)?,
        };

        Ok(Self {
            port,
            index_path: get("MEDIGENIUS_INDEX_PATH").map_or(defaults.index_path, PathBuf::from),
            docs_dir: get("MEDIGENIUS_DOCS_DIR").map(PathBuf::from),
            top_k: num("MEDIGENIUS_TOP_K", defaults.top_k)?,
            wiki_top_k: num("MEDIGENIUS_WIKI_TOP_K", defaults.wiki_top_k)?,
            wiki_max_chars: num("MEDIGENIUS_WIKI_MAX_CHARS", defaults.wiki_max_chars)?,
            chunk_size: num("MEDIGENIUS_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: num("MEDIGENIUS_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            source_timeout: Duration::from_secs(parsed(
                get("MEDIGENIUS_SOURCE_TIMEOUT_SECS"),
                "MEDIGENIUS_SOURCE_TIMEOUT_SECS",
                defaults.source_timeout.as_secs(),
            )?),
            llm_timeout: Duration::from_secs(parsed(
                get("MEDIGENIUS_LLM_TIMEOUT_SECS"),
                "MEDIGENIUS_LLM_TIMEOUT_SECS",
                defaults.llm_timeout.as_secs(),
            )?),
            session_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            sampling: Sampling {
                temperature: parsed(
                    get("MEDIGENIUS_TEMPERATURE"),
                    "MEDIGENIUS_TEMPERATURE",
                    defaults.sampling.temperature,
                )?,
                max_tokens: parsed(
                    get("MEDIGENIUS_MAX_TOKENS"),
                    "MEDIGENIUS_MAX_TOKENS",
                    defaults.sampling.max_tokens,
                )?,
            },
        })
    }
}

fn parsed<T: FromStr>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn default_index_path(home: Option<String>) -> PathBuf {
    let home = home.unwrap_or_else(|| "/tmp".to_string());
    PathBuf::from(home).join(".medigenius").join("docs.db")
}
