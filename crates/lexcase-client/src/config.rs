//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts with zero configuration
//! in offline mode.

use std::path::PathBuf;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Script endpoint that stores accounts and cases.
    /// Env: `LEXCASE_API_URL`
    /// Default: unset (offline, sync is a no-op).
    pub api_url: Option<String>,

    /// Base URL of the file relay used for attachments.
    /// Env: `LEXCASE_RELAY_URL`
    /// Default: unset (attachments stay pending locally).
    pub relay_url: Option<String>,

    /// Location of the local database.
    /// Env: `LEXCASE_DB_PATH`
    /// Default: platform data directory.
    pub db_path: Option<PathBuf>,

    /// Timeout applied to every HTTP request.
    /// Env: `LEXCASE_HTTP_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            relay_url: None,
            db_path: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        config.api_url = non_empty("LEXCASE_API_URL");
        config.relay_url = non_empty("LEXCASE_RELAY_URL");
        config.db_path = non_empty("LEXCASE_DB_PATH").map(PathBuf::from);

        if let Some(val) = non_empty("LEXCASE_HTTP_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.http_timeout = Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        value = %val,
                        "Invalid LEXCASE_HTTP_TIMEOUT_SECS, using default"
                    );
                }
            }
        }

        config
    }

    pub fn is_offline(&self) -> bool {
        self.api_url.is_none()
    }
}
