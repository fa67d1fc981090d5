use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::core::multipart::PayloadSettings;
use crate::utils::{app_data_dir, config_file_in, ensure_dir, forms_dir_in, write_atomic};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Unknown config key `{0}`")]
    UnknownKey(String),
    #[error("Invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,
    pub data_field: String,
    pub attachment_field: String,
    pub ui_color_enabled: bool,
    pub preview_show_paths: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_template: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let payload = PayloadSettings::default();
        Self {
            store_root: None,
            data_field: payload.data_field,
            attachment_field: payload.attachment_field,
            ui_color_enabled: true,
            preview_show_paths: false,
            last_opened_template: None,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 6] = [
        "store_root",
        "data_field",
        "attachment_field",
        "ui_color_enabled",
        "preview_show_paths",
        "last_opened_template",
    ];

    pub fn payload_settings(&self) -> PayloadSettings {
        PayloadSettings {
            data_field: self.data_field.clone(),
            attachment_field: self.attachment_field.clone(),
        }
    }

    /// Store root, falling back to `<base>/forms`.
    pub fn store_root_in(&self, base: &Path) -> PathBuf {
        self.store_root
            .clone()
            .unwrap_or_else(|| forms_dir_in(base))
    }

    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "store_root" => self
                .store_root
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
            "data_field" => self.data_field.clone(),
            "attachment_field" => self.attachment_field.clone(),
            "ui_color_enabled" => self.ui_color_enabled.to_string(),
            "preview_show_paths" => self.preview_show_paths.to_string(),
            "last_opened_template" => self.last_opened_template.clone().unwrap_or_default(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Sets `key` from its textual form; an empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let optional = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        match key {
            "store_root" => self.store_root = optional(value).map(PathBuf::from),
            "data_field" | "attachment_field" => {
                let name = optional(value).ok_or_else(invalid)?;
                if key == "data_field" {
                    self.data_field = name;
                } else {
                    self.attachment_field = name;
                }
            }
            "ui_color_enabled" => self.ui_color_enabled = parse_flag(value).ok_or_else(invalid)?,
            "preview_show_paths" => {
                self.preview_show_paths = parse_flag(value).ok_or_else(invalid)?
            }
            "last_opened_template" => self.last_opened_template = optional(value),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Handles persistence for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        ensure_dir(&base)?;
        let config_path = config_file_in(&base);
        Ok(Self { base, config_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.config_path.exists() {
            let data = fs::read_to_string(&self.config_path)?;
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_atomic(&self.config_path, &json)?;
        Ok(())
    }
}
