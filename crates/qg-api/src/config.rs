use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Prefix of every configuration variable
pub const ENV_PREFIX: &str = "QUIZGEN_";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        *self == Self::Development
    }

    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiConfig {
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub env: Environment,
    /// Snapshots are kept in memory when unset
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Comma separated
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_gemini_base_url() -> String {
    qg_gemini::DEFAULT_BASE_URL.to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_allowed_origins() -> String {
    "http://localhost:5173".to_string()
}

const fn default_session_idle_minutes() -> u64 {
    120
}

const fn default_request_timeout_secs() -> u64 {
    120
}

impl ApiConfig {
    /// Read the `QUIZGEN_*` variables of the process environment
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Read `QUIZGEN_*` variables from an explicit list of pairs
    pub fn from_pairs<I>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(pairs)
    }

    pub fn parsed_allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
