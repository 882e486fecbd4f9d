use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use client_core::config::{
    ViewerConfig, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL,
    DEFAULT_SESSION_MODE,
};
use serde::Deserialize;
use shared::{domain::Dimensions, modes::ModeRegistry};
use tracing::warn;

pub const DEFAULT_SETTINGS_PATH: &str = "viewer.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub mode: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    /// Modes registered on top of the built-in table.
    pub extra_modes: BTreeMap<String, Dimensions>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            mode: DEFAULT_SESSION_MODE.into(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            extra_modes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    mode: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    modes: BTreeMap<String, Dimensions>,
}

impl Settings {
    /// Overlays the keys present in a `viewer.toml` document.
    pub fn apply_file(&mut self, raw: &str) -> Result<()> {
        let file: FileSettings = toml::from_str(raw).context("invalid viewer settings file")?;
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if let Some(v) = file.mode {
            self.mode = v;
        }
        if let Some(v) = file.page_size {
            self.page_size = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        self.extra_modes.extend(file.modes);
        Ok(())
    }

    /// Overlays `VIEWER_*` variables. Numbers that fail to parse are skipped.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("VIEWER_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("VIEWER_MODE") {
            self.mode = v;
        }
        if let Some(v) = lookup("VIEWER_PAGE_SIZE") {
            match v.parse() {
                Ok(parsed) => self.page_size = parsed,
                Err(_) => warn!(value = %v, "settings: ignoring VIEWER_PAGE_SIZE"),
            }
        }
        if let Some(v) = lookup("VIEWER_REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(_) => warn!(value = %v, "settings: ignoring VIEWER_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            server_url: self.server_url.clone(),
            session_mode: self.mode.as_str().into(),
            page_size: self.page_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    /// Built-in modes plus the configured extras; an extra the registry
    /// refuses is logged and left out.
    pub fn mode_registry(&self) -> ModeRegistry {
        let mut registry = ModeRegistry::builtin();
        for (name, dimensions) in &self.extra_modes {
            if let Err(err) = registry.register(name.as_str(), dimensions.width, dimensions.height) {
                warn!("settings: {err}");
            }
        }
        registry
    }
}

/// Defaults, then the settings file when it exists, then the environment.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            if let Err(err) = settings.apply_file(&raw) {
                warn!(path = %path.display(), "settings: {err:#}");
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), "settings: cannot read file: {err}"),
    }

    settings.apply_env(|key| std::env::var(key).ok());
    settings
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
