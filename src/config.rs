use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static SETTINGS_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    let base = BaseDirs::new()?;
    Some(base.config_dir().join("homevista.toml"))
});

/// Session settings for the messaging backend. The bearer token is written
/// by the sign-in flow and cleared on logout; conversation data itself is
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub base_url: String,
    pub push_url: String,
    pub token: Option<String>,
}

impl Settings {
    pub fn new(base_url: impl Into<String>, push_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_url(&base_url.into()),
            push_url: push_url.into(),
            token: None,
        }
    }

    /// Read settings from the config file, then apply environment overrides
    /// (`HOMEVISTA_API_URL`, `HOMEVISTA_PUSH_URL`, `HOMEVISTA_TOKEN`).
    pub fn load() -> Self {
        let mut settings = SETTINGS_PATH
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|text| toml::from_str::<Settings>(&text).ok())
            .unwrap_or_default();

        if let Ok(url) = std::env::var("HOMEVISTA_API_URL") {
            settings.base_url = normalize_url(&url);
        }
        if let Ok(url) = std::env::var("HOMEVISTA_PUSH_URL") {
            settings.push_url = url;
        }
        if let Ok(token) = std::env::var("HOMEVISTA_TOKEN") {
            settings.token = Some(token);
        }
        settings
    }

    pub fn save(&self) -> Result<()> {
        let path = SETTINGS_PATH
            .as_ref()
            .ok_or_else(|| Error::Config("no config directory".into()))?;
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && self.token.is_some()
    }
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}
