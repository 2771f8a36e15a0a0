//! Startup configuration.
//!
//! Every key is read from the environment first, then from a Docker secret
//! file at `/run/secrets/<KEY>`.

use std::{env, fs::read_to_string, path::PathBuf};

use medbills_core::ResetPolicy;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_GEMINI_TIMEOUT_SECS: u64 = 60;

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set. Add it to the environment or /run/secrets.")]
    Missing(&'static str),

    #[error("Invalid {key} value: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Settings for the vision endpoint. Absent when no API key is configured.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub store_key: Option<String>,
    pub gemini: Option<GeminiConfig>,
    pub username: String,
    pub password: String,
    pub reset_policy: ResetPolicy,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).or_else(|| read_secret(PathBuf::from(SECRETS_DIR), key)))
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let store_key = get("SUPABASE_KEY");
        let hosted = store_url.starts_with("http://") || store_url.starts_with("https://");
        if hosted && store_key.is_none() {
            return Err(ConfigError::Missing("SUPABASE_KEY"));
        }

        let gemini = match get("GEMINI_API_KEY") {
            Some(api_key) => Some(GeminiConfig {
                api_key,
                model: get("GEMINI_MODEL")
                    .unwrap_or_else(|| medbills_llm::DEFAULT_MODEL.to_string()),
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| medbills_llm::DEFAULT_BASE_URL.to_string()),
                timeout_secs: parse_or(&get, "GEMINI_TIMEOUT_SECS", DEFAULT_GEMINI_TIMEOUT_SECS)?,
            }),
            None => None,
        };

        Ok(Self {
            port: parse_or(&get, "MEDBILLS_PORT", DEFAULT_PORT)?,
            store_url,
            store_key,
            gemini,
            username: get("MEDBILLS_USERNAME").ok_or(ConfigError::Missing("MEDBILLS_USERNAME"))?,
            password: get("MEDBILLS_PASSWORD").ok_or(ConfigError::Missing("MEDBILLS_PASSWORD"))?,
            reset_policy: parse_or(&get, "MEDBILLS_RESET_POLICY", ResetPolicy::default())?,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("store_url", &self.store_url)
            .field("gemini_enabled", &self.gemini.is_some())
            .field("username", &self.username)
            .field("reset_policy", &self.reset_policy)
            .finish_non_exhaustive()
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => {
            info!("{key} not set, using default");
            Ok(default)
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn read_secret(dir: PathBuf, secret_name: &str) -> Option<String> {
    let path = dir.join(secret_name);
    match read_to_string(&path) {
        Ok(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}");
            None
        }
    }
}
