//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Default message recorded when a form token fails verification.
pub const DEFAULT_TOKEN_ERROR: &str = "Invalid token";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Message used for invalid or missing form tokens.
    pub token_error: String,

    /// Whether session cookies are marked Secure (default: true).
    pub cookie_secure: bool,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Session inactivity expiry in hours (default: 24).
    pub session_expiry_hours: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let token_error =
            env::var("FORM_TOKEN_ERROR").unwrap_or_else(|_| DEFAULT_TOKEN_ERROR.to_string());

        let cookie_secure = env::var("COOKIE_SECURE")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .context("COOKIE_SECURE must be true or false")?;

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let session_expiry_hours = env::var("SESSION_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("SESSION_EXPIRY_HOURS must be a valid i64")?;

        Ok(Self {
            port,
            token_error,
            cookie_secure,
            cookie_same_site,
            session_expiry_hours,
        })
    }

    /// Per-form defaults derived from this configuration.
    pub fn form_defaults(&self) -> FormDefaults {
        FormDefaults {
            token_error: self.token_error.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            token_error: DEFAULT_TOKEN_ERROR.to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
            session_expiry_hours: 24,
        }
    }
}

/// Defaults applied to every form built by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefaults {
    pub token_error: String,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            token_error: DEFAULT_TOKEN_ERROR.to_string(),
        }
    }
}
