//! Environment-driven configuration (SPEC_FULL.md §6.4).
//!
//! These values are consumed by the host process wrapping this crate (the embedding
//! service client, the HTTP listener, the persistence backend selection) — the facade
//! itself does not read them. `Config` exists so a host binary has one typed, validated
//! place to load them instead of scattering `std::env::var` calls.

use std::env;

use crate::error::Error;

/// Typed view of the environment variables a host process needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the external text -> embedding service.
    pub embedding_api_url: String,
    /// API key for the embedding service. Never logged.
    pub embedding_api_key: String,
    /// Model identifier passed to the embedding service.
    pub embedding_model_id: String,
    /// Connection URI for the persistence backend.
    pub persistence_uri: String,
    /// Database/namespace name within the persistence backend.
    pub persistence_db_name: String,
    /// Port the HTTP surface listens on.
    pub api_port: u16,
    /// When true, the host process should select its test database instead of production.
    pub test_mode: bool,
}

const ENV_EMBEDDING_API_URL: &str = "VECTORDB_EMBEDDING_API_URL";
const ENV_EMBEDDING_API_KEY: &str = "VECTORDB_EMBEDDING_API_KEY";
const ENV_EMBEDDING_MODEL_ID: &str = "VECTORDB_EMBEDDING_MODEL_ID";
const ENV_PERSISTENCE_URI: &str = "VECTORDB_PERSISTENCE_URI";
const ENV_PERSISTENCE_DB_NAME: &str = "VECTORDB_PERSISTENCE_DB_NAME";
const ENV_API_PORT: &str = "VECTORDB_API_PORT";
const ENV_TEST_MODE: &str = "TEST_MODE";

const DEFAULT_API_PORT: u16 = 8080;
const DEFAULT_DB_NAME: &str = "vectordb";

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// `embedding_api_url`, `embedding_api_key`, and `persistence_uri` have no sane default
    /// and are required; everything else falls back to a reasonable default.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_env_source(|key| env::var(key).ok())
    }

    /// Testable variant of [`Config::from_env`] that reads from a caller-supplied lookup
    /// function instead of the real process environment.
    pub fn from_env_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::validation(format!("missing required env var {}", key)))
        };

        let api_port = match lookup(ENV_API_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::validation(format!("{} must be a valid port number", ENV_API_PORT)))?,
            None => DEFAULT_API_PORT,
        };

        let test_mode = lookup(ENV_TEST_MODE)
            .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            embedding_api_url: required(ENV_EMBEDDING_API_URL)?,
            embedding_api_key: required(ENV_EMBEDDING_API_KEY)?,
            embedding_model_id: lookup(ENV_EMBEDDING_MODEL_ID)
                .unwrap_or_else(|| "default".to_string()),
            persistence_uri: required(ENV_PERSISTENCE_URI)?,
            persistence_db_name: lookup(ENV_PERSISTENCE_DB_NAME)
                .unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            api_port,
            test_mode,
        })
    }
}
