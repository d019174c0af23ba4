//! Client configuration, read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use ledgerly_observability::LogFormat;

use crate::error::ConfigError;
use crate::store::RefetchOrdering;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Ledgerly REST API (`LEDGERLY_API_URL`).
    pub api_url: String,

    /// Per-request timeout for capability fetches (`LEDGERLY_FETCH_TIMEOUT_MS`).
    /// Unset means unbounded.
    pub fetch_timeout: Option<Duration>,

    /// `LEDGERLY_REFETCH_ORDERING`: `fenced` (default) or `last-response-wins`.
    pub ordering: RefetchOrdering,

    /// `LEDGERLY_SESSION_FILE`; `None` means the OS data directory.
    pub session_file: Option<PathBuf>,

    /// `LEDGERLY_LOG_FORMAT`: `json` (default) or `pretty`.
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            fetch_timeout: None,
            ordering: RefetchOrdering::default(),
            session_file: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Just `LEDGERLY_LOG_FORMAT`, so logging can be set up before the rest
    /// of the configuration is read (and possibly warned about).
    pub fn log_format_from_env() -> Result<LogFormat, ConfigError> {
        Self::log_format_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn log_format_from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<LogFormat, ConfigError> {
        match lookup("LEDGERLY_LOG_FORMAT").filter(|v| !v.trim().is_empty()) {
            None => Ok(LogFormat::default()),
            Some(raw) => LogFormat::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "LEDGERLY_LOG_FORMAT",
                message: format!("expected 'json' or 'pretty', got '{raw}'"),
            }),
        }
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = ClientConfig::default();

        match get("LEDGERLY_API_URL") {
            Some(url) => {
                let url = url.trim().trim_end_matches('/').to_string();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::Invalid {
                        key: "LEDGERLY_API_URL",
                        message: format!("'{url}' is not an http(s) URL"),
                    });
                }
                config.api_url = url;
            }
            None => {
                tracing::warn!("LEDGERLY_API_URL not set; using {DEFAULT_API_URL}");
            }
        }

        if let Some(raw) = get("LEDGERLY_FETCH_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "LEDGERLY_FETCH_TIMEOUT_MS",
                message: format!("'{raw}': {e}"),
            })?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: "LEDGERLY_FETCH_TIMEOUT_MS",
                    message: "must be greater than zero".to_string(),
                });
            }
            config.fetch_timeout = Some(Duration::from_millis(ms));
        }

        if let Some(raw) = get("LEDGERLY_REFETCH_ORDERING") {
            config.ordering = raw.parse()?;
        }

        if let Some(raw) = get("LEDGERLY_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(raw.trim()));
        }

        config.log_format = Self::log_format_from_lookup(&lookup)?;

        Ok(config)
    }
}
