//! Configuration for the lexilens pipeline
//!
//! Stored in ~/.config/lexilens/config.json; environment variables win over
//! the file. The pipeline receives the resolved struct explicitly, so tests
//! can run it with fixed inputs and no ambient state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_vision_timeout_ms() -> u64 {
    180_000
}

fn default_glossary_timeout_ms() -> u64 {
    120_000
}

fn default_inline_image_max_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the chat-completions service.
    #[serde(default = "default_base_url")]
    pub model_base_url: String,
    /// Bearer token; absent or blank disables every network path.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// Budget for image-description calls, in milliseconds.
    #[serde(default = "default_vision_timeout_ms")]
    pub vision_timeout_ms: u64,
    /// Budget for glossary-extraction calls, in milliseconds.
    #[serde(default = "default_glossary_timeout_ms")]
    pub glossary_timeout_ms: u64,
    /// Ceiling for inlined page images.
    #[serde(default = "default_inline_image_max_bytes")]
    pub inline_image_max_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_base_url: default_base_url(),
            api_key: None,
            vision_model: default_vision_model(),
            vision_timeout_ms: default_vision_timeout_ms(),
            glossary_timeout_ms: default_glossary_timeout_ms(),
            inline_image_max_bytes: default_inline_image_max_bytes(),
        }
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lexilens"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .and_then(|path| Self::read_file(&path))
            .unwrap_or_default();
        config.apply_env();
        config
    }

    fn read_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!("config file was corrupted ({err}); a backup was saved and defaults loaded");
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LEXILENS_BASE_URL") {
            if !url.trim().is_empty() {
                self.model_base_url = url;
            }
        }
        if let Ok(key) = std::env::var("LEXILENS_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("LEXILENS_VISION_MODEL") {
            if !model.trim().is_empty() {
                self.vision_model = model;
            }
        }
    }

    /// Whether a model call can be attempted at all.
    pub fn has_model_credentials(&self) -> bool {
        let key_set = self
            .api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        key_set && !self.model_base_url.trim().is_empty()
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir().ok_or_else(|| anyhow!("could not determine config directory"))?;
        fs::create_dir_all(&dir).context("failed to create config directory")?;
        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).context("failed to write config")?;
        Ok(())
    }

    /// Config file location for display.
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/lexilens/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
