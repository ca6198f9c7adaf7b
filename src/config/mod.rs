use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::errors::ConfigError;
use crate::submission::PayloadShape;
use crate::utils::fs::write_atomic;
use crate::utils::paths::{self, ensure_dir};

pub const DEFAULT_SUBMISSION_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_endpoint: Option<String>,
    pub submission_timeout_ms: u64,
    pub catalog_timeout_ms: u64,
    pub payload_shape: PayloadShape,
    pub currency_symbol: String,
    pub ui_color_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_dir: None,
            taxonomy_url: None,
            templates_url: None,
            submission_endpoint: None,
            submission_timeout_ms: DEFAULT_SUBMISSION_TIMEOUT_MS,
            catalog_timeout_ms: DEFAULT_CATALOG_TIMEOUT_MS,
            payload_shape: PayloadShape::default(),
            currency_symbol: "$".into(),
            ui_color_enabled: true,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 9] = [
        "catalog_dir",
        "taxonomy_url",
        "templates_url",
        "submission_endpoint",
        "submission_timeout_ms",
        "catalog_timeout_ms",
        "payload_shape",
        "currency_symbol",
        "ui_color_enabled",
    ];

    /// Display form of a key's value; unset options read as `(unset)`.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        fn optional(value: Option<&str>) -> String {
            value.unwrap_or("(unset)").to_string()
        }
        Ok(match key {
            "catalog_dir" => self
                .catalog_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "(unset)".into()),
            "taxonomy_url" => optional(self.taxonomy_url.as_deref()),
            "templates_url" => optional(self.templates_url.as_deref()),
            "submission_endpoint" => optional(self.submission_endpoint.as_deref()),
            "submission_timeout_ms" => self.submission_timeout_ms.to_string(),
            "catalog_timeout_ms" => self.catalog_timeout_ms.to_string(),
            "payload_shape" => self.payload_shape.to_string(),
            "currency_symbol" => self.currency_symbol.clone(),
            "ui_color_enabled" => self.ui_color_enabled.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        })
    }

    /// Parses and assigns a value. `none` or an empty value unsets an
    /// optional key.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let value = raw.trim();
        let unset = value.is_empty() || value.eq_ignore_ascii_case("none");
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        let optional = |value: &str| (!unset).then(|| value.to_string());

        match key {
            "catalog_dir" => self.catalog_dir = optional(value).map(PathBuf::from),
            "taxonomy_url" => self.taxonomy_url = optional(value),
            "templates_url" => self.templates_url = optional(value),
            "submission_endpoint" => self.submission_endpoint = optional(value),
            "submission_timeout_ms" | "catalog_timeout_ms" => {
                let millis: u64 = value
                    .parse()
                    .map_err(|_| invalid("expected a number of milliseconds"))?;
                if millis == 0 {
                    return Err(invalid("timeout must be greater than zero"));
                }
                if key == "submission_timeout_ms" {
                    self.submission_timeout_ms = millis;
                } else {
                    self.catalog_timeout_ms = millis;
                }
            }
            "payload_shape" => {
                self.payload_shape = value.parse().map_err(|err: String| invalid(&err))?;
            }
            "currency_symbol" => self.currency_symbol = value.to_string(),
            "ui_color_enabled" => {
                self.ui_color_enabled = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    _ => return Err(invalid("expected true or false")),
                }
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        ensure_dir(&base)?;
        ensure_dir(&paths::config_dir_in(&base))?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| ConfigError::Serde(err.to_string()))?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
