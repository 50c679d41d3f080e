//! Portal configuration parsed from environment variables.

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PUSH_PATH: &str = "/app/portal";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid push URL: {0}")]
    InvalidPushUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    pub push_url: String,
    pub session_token: Option<String>,
    pub timeouts: Timeouts,
    pub cache_ttl_secs: u64,
}

impl PortalConfig {
    /// Build a config pointing at `base_url` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless the URL is `http(s)://`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url)?;
        let push_url = derive_push_url(&base_url)?;
        Ok(Self {
            base_url,
            push_url,
            session_token: None,
            timeouts: Timeouts::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        })
    }

    /// Build typed portal config from environment variables.
    ///
    /// Optional:
    /// - `PORTAL_BASE_URL`: REST API origin, default `http://127.0.0.1:8000`
    /// - `PORTAL_PUSH_URL`: websocket URL, default derived from the base URL
    /// - `PORTAL_SESSION_TOKEN`: bearer token for authenticated calls
    /// - `PORTAL_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PORTAL_CONNECT_TIMEOUT_SECS`: default 10
    /// - `PORTAL_CACHE_TTL_SECS`: default 60
    ///
    /// # Errors
    ///
    /// Returns an error when either URL has an unsupported scheme.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_base = std::env::var("PORTAL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(&raw_base)?;

        if let Ok(push_url) = std::env::var("PORTAL_PUSH_URL") {
            config.push_url = normalize_push_url(&push_url)?;
        }
        config.session_token = std::env::var("PORTAL_SESSION_TOKEN").ok().filter(|token| !token.is_empty());
        config.timeouts = Timeouts {
            request_secs: env_parse_u64("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PORTAL_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        config.cache_ttl_secs = env_parse_u64("PORTAL_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS);
        Ok(config)
    }

    /// Override the websocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPushUrl`] unless the URL is `ws(s)://`.
    pub fn with_push_url(mut self, push_url: &str) -> Result<Self, ConfigError> {
        self.push_url = normalize_push_url(push_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_owned());
    }
    Err(ConfigError::InvalidBaseUrl(raw.to_owned()))
}

fn normalize_push_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        return Ok(trimmed.to_owned());
    }
    Err(ConfigError::InvalidPushUrl(raw.to_owned()))
}

/// Map `http(s)://host` to `ws(s)://host/app/portal`.
pub(crate) fn derive_push_url(base_url: &str) -> Result<String, ConfigError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{DEFAULT_PUSH_PATH}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{DEFAULT_PUSH_PATH}"));
    }
    Err(ConfigError::InvalidBaseUrl(base_url.to_owned()))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
