//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{Config, FormDefaults};
use crate::theme::ThemeEngine;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: Config,

    /// Theme engine for template rendering.
    theme: ThemeEngine,
}

impl AppState {
    /// Create the application state with the built-in templates.
    pub fn new(config: &Config) -> Result<Self> {
        let theme = ThemeEngine::builtin().context("failed to initialize theme engine")?;
        info!("theme engine ready");
        Ok(Self::with_theme(config.clone(), theme))
    }

    pub fn with_theme(config: Config, theme: ThemeEngine) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, theme }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn theme(&self) -> &ThemeEngine {
        &self.inner.theme
    }

    /// Defaults applied to every form built by a handler.
    pub fn form_defaults(&self) -> FormDefaults {
        self.config().form_defaults()
    }
}
