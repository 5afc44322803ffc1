//! Bridge settings persistence.
//!
//! This module handles loading and saving the channel and uploader settings
//! used by the `picbridge` binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ipc::{ImageHost, CHANNEL_NAME, DEFAULT_POLL_INTERVAL};

/// Settings that persist across sessions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Settings file version for migration support
    #[serde(default = "default_version")]
    pub version: u32,
    /// Name of the shared channel
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    /// Polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Directory holding channel files, overriding the runtime dir
    #[serde(default)]
    pub channel_dir: Option<PathBuf>,
    /// Version reported when answering version requests
    #[serde(default = "default_uploader_version")]
    pub uploader_version: i64,
    /// Hosts reported when answering host list requests
    #[serde(default)]
    pub image_hosts: Vec<ImageHost>,
}

fn default_version() -> u32 {
    1
}

fn default_channel_name() -> String {
    CHANNEL_NAME.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_uploader_version() -> i64 {
    1
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            channel_name: default_channel_name(),
            poll_interval_ms: default_poll_interval_ms(),
            channel_dir: None,
            uploader_version: default_uploader_version(),
            image_hosts: Vec::new(),
        }
    }
}

impl BridgeSettings {
    /// Get the config directory path for picbridge
    pub fn get_config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::data_dir().map(|p| p.join("picbridge"))
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs::config_dir().map(|p| p.join("picbridge"))
        }
    }

    /// Get the path to the settings JSON file
    pub fn get_settings_path() -> Option<PathBuf> {
        Self::get_config_dir().map(|p| p.join("settings.json"))
    }

    /// Polling interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        match Self::get_settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load settings from `path`, falling back to defaults if it's missing
    /// or unreadable
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid settings file {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = Self::get_settings_path()
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&path)
    }

    /// Save settings to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }
}
