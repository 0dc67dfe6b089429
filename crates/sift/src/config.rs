//! Account configuration loading
//!
//! Supports loading the IMAP account from (in order of priority):
//! 1. An explicit JSON file
//! 2. The default config file (~/.config/sift/account.json)
//! 3. Environment variables (SIFT_IMAP_HOST, SIFT_IMAP_USER, ...)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Account filename in the sift config directory
const ACCOUNT_FILE: &str = "account.json";

/// Default IMAPS port
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Session-wide policy for which message data is fetched eagerly when any
/// field is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Fetch header fields only (default)
    #[default]
    Headers,
    /// Fetch body text only
    Text,
    /// Fetch headers and body together
    All,
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "headers" => Ok(Priority::Headers),
            "text" => Ok(Priority::Text),
            "all" => Ok(Priority::All),
            other => Err(Error::Configuration(format!(
                "priority must be \"headers\", \"text\" or \"all\", got {other:?}"
            ))),
        }
    }
}

/// IMAP account settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub priority: Priority,
    /// Optional upper bound on cached message handles; unbounded when absent
    #[serde(default)]
    pub handle_cache_limit: Option<usize>,
}

fn default_port() -> u16 {
    DEFAULT_IMAP_PORT
}

impl AccountConfig {
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_IMAP_PORT,
            user: user.into(),
            password: password.into(),
            priority: Priority::default(),
            handle_cache_limit: None,
        }
    }

    /// Load the account using the default priority chain: the config file
    /// when present, the environment otherwise.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            return Self::from_file(&path);
        }
        Self::from_env()
    }

    /// Load the account from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse the account from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("failed to parse account config: {e}")))
    }

    /// Load the account from SIFT_IMAP_* environment variables
    pub fn from_env() -> Result<Self> {
        let host = require_env("SIFT_IMAP_HOST")?;
        let user = require_env("SIFT_IMAP_USER")?;
        let password = require_env("SIFT_IMAP_PASSWORD")?;
        let port = match std::env::var("SIFT_IMAP_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| Error::Configuration(format!("invalid SIFT_IMAP_PORT: {v:?}")))?,
            Err(_) => DEFAULT_IMAP_PORT,
        };
        let priority = match std::env::var("SIFT_IMAP_PRIORITY") {
            Ok(v) => v.parse()?,
            Err(_) => Priority::default(),
        };
        Ok(Self {
            host,
            port,
            user,
            password,
            priority,
            handle_cache_limit: None,
        })
    }

    /// Default config file path (~/.config/sift/account.json)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sift").join(ACCOUNT_FILE))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| Error::Configuration(format!("{key} environment variable not set")))
}
