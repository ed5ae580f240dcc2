//! `calcert config`: locate, print and edit the settings file.

use std::path::Path;

use clap::Subcommand;

use calcert_config::{ConfigError, Settings, KEYS};

use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the settings file path
    Path,

    /// Print the effective settings
    Show {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one setting and save the file
    #[command(after_help = "\
Examples:
  calcert config set registry.path /srv/instruments.db
  calcert config set report.convertToPdf false
  calcert config set export.xmlDir null")]
    Set { key: String, value: String },
}

pub fn cmd_config(path: &Path, settings: Settings, cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Show { json } => {
            let doc = serde_json::to_value(&settings)
                .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
            if json {
                let text = serde_json::to_string_pretty(&doc)
                    .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
                println!("{text}");
            } else {
                for key in KEYS {
                    println!("{:<22} {}", key, display_value(&doc[*key]));
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut settings = settings;
            settings.set_key(&key, &value)?;
            settings.save_to(path)?;
            eprintln!("saved {} to {}", key, path.display());
        }
    }
    Ok(())
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "-".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::UnknownKey(_) => CliError::args(err.to_string())
                .with_hint(format!("known settings: {}", KEYS.join(", "))),
            ConfigError::InvalidValue { .. } => CliError::args(err.to_string()),
            ConfigError::Io { .. } => CliError::io(err.to_string()),
            ConfigError::Serialize(_) => CliError::general(err.to_string()),
        }
    }
}
