// Application settings
// Loaded from ~/.config/calcert/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Every settings key, in file order.
pub const KEYS: &[&str] = &[
    "registry.path",
    "report.outputDir",
    "report.officeCommand",
    "report.convertToPdf",
    "export.xmlDir",
    "installations.file",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Registry
    #[serde(rename = "registry.path")]
    pub registry_path: PathBuf,

    // Report
    #[serde(rename = "report.outputDir")]
    pub report_output_dir: Option<PathBuf>, // None = next to the certificate

    #[serde(rename = "report.officeCommand")]
    pub office_command: String,

    #[serde(rename = "report.convertToPdf")]
    pub convert_to_pdf: bool,

    // Export
    #[serde(rename = "export.xmlDir")]
    pub xml_dir: Option<PathBuf>,

    // Reconciliation
    #[serde(rename = "installations.file")]
    pub installations_file: Option<PathBuf>, // None = built-in whitelist
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: Self::config_dir().join("registry.db"),
            report_output_dir: None,
            office_command: "soffice".to_string(),
            convert_to_pdf: true,
            xml_dir: None,
            installations_file: None,
        }
    }
}

impl Settings {
    fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calcert")
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("settings.json")
    }

    /// Load settings from `path`, writing a default file on first use
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("error parsing {}: {e}; using default settings", path.display());
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)
    }

    /// Set one key from its command-line spelling. `null` or an empty value
    /// clears an optional key.
    pub fn set_key(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        let raw = raw.trim();
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        };
        let value = match key {
            "report.convertToPdf" => match raw.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => serde_json::Value::Bool(true),
                "false" | "no" | "off" | "0" => serde_json::Value::Bool(false),
                _ => return Err(invalid()),
            },
            "registry.path" | "report.officeCommand" if raw.is_empty() || raw == "null" => {
                return Err(invalid());
            }
            _ if !KEYS.contains(&key) => return Err(ConfigError::UnknownKey(key.to_string())),
            _ if raw.is_empty() || raw == "null" => serde_json::Value::Null,
            _ => serde_json::Value::String(raw.to_string()),
        };

        let mut doc = serde_json::to_value(&*self)?;
        if let serde_json::Value::Object(map) = &mut doc {
            map.insert(key.to_string(), value);
        }
        *self = serde_json::from_value(doc)?;
        Ok(())
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {e}");
                return;
            }
        }

        let registry = serde_json::to_string(&self.registry_path)
            .unwrap_or_else(|_| "\"registry.db\"".to_string());
        let default_config = format!(
            r#"{{
    // Instrument registry (SQLite)
    "registry.path": {registry},

    // Critical-analysis report
    // outputDir null = same folder as the certificate
    "report.outputDir": null,
    "report.officeCommand": "soffice",
    "report.convertToPdf": true,

    // Structured XML export (null = disabled in batch processing)
    "export.xmlDir": null,

    // Installation whitelist (TOML); null = built-in list
    "installations.file": null
}}
"#
        );

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("error writing default {}: {e}", path.display());
        }
    }
}
