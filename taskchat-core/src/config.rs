//! Settings resolution
//!
//! Everything is read once at startup. `from_lookup` takes any key -> value
//! function so tests never touch the real process environment.

use crate::provider::{ProviderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable overriding the API base URL
pub const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
/// Environment variable overriding the chat model
pub const MODEL_VAR: &str = "TASKCHAT_MODEL";
/// Environment variables overriding the data directory, in priority order
pub const DATA_DIR_VARS: [&str; 2] = ["TASKCHAT_DATA_DIR", "NBA_DATA_PATH"];

/// Used when no API key is configured. Not a credential: every remote call
/// made with it fails authentication.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY";

/// Default location for downloaded datasets
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub data_dir: PathBuf,
}

impl Settings {
    /// Resolve settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = DATA_DIR_VARS
            .iter()
            .find_map(|key| get(*key))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self {
            api_key: get(API_KEY_VAR).unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string()),
            base_url: get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            data_dir,
        }
    }

    /// True when no real key was found
    pub fn uses_placeholder_key(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY
    }

    /// Provider configuration for the chat client
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::openai(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_model(self.model.clone())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
