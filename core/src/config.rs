//! Client configuration sourced from the environment.

/// Used when `QR_API_URL` is unset or blank.
pub const DEFAULT_BASE_URL: &str = "/api";

pub const BASE_URL_ENV: &str = "QR_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every endpoint, e.g. "http://localhost:3000/api".
    pub base_url: String,
}

impl ClientConfig {
    /// Load configuration from the environment, reading a `.env` file first
    /// if one is present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_override(std::env::var(BASE_URL_ENV).ok())
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn from_override(value: Option<String>) -> Self {
        let base_url = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self { base_url }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }
}
