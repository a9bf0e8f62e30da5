//! Client configuration.
//!
//! Supplied once at construction. Credentials are optional; endpoints that
//! need them fail with `ApiError::Authentication` when they are missing.

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "https://posterous.com";
pub const DEFAULT_API_ROOT: &str = "/api/2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: String,
    pub api_root: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            host: DEFAULT_HOST.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `POSTEROUS_USERNAME`, `POSTEROUS_PASSWORD`, `POSTEROUS_HOST` and
    /// `POSTEROUS_API_ROOT`, falling back to the defaults for unset variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            username: lookup("POSTEROUS_USERNAME"),
            password: lookup("POSTEROUS_PASSWORD"),
            host: lookup("POSTEROUS_HOST").unwrap_or(defaults.host),
            api_root: lookup("POSTEROUS_API_ROOT").unwrap_or(defaults.api_root),
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    /// Username and password, if both are set and non-empty.
    pub fn basic_credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// `host` joined with `api_root`, without a trailing slash.
    pub fn api_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let root = self.api_root.trim_matches('/');
        if root.is_empty() {
            host.to_string()
        } else {
            format!("{host}/{root}")
        }
    }
}
