//! `calcert registry`: consult and edit instrument records.

use std::path::PathBuf;

use clap::Subcommand;

use calcert_config::Settings;
use calcert_core::tag::registry_key;
use calcert_core::{parse_decimal, InstrumentRecord, Numeric};
use calcert_recon::{GatewayError, RegistryGateway};

use crate::{open_registry, CliError};

#[derive(Subcommand)]
pub enum RegistryCommands {
    /// Create the registry database if it does not exist
    Init,

    /// Show the record of one tag
    Show {
        tag: String,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List every record
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or update a record
    #[command(after_help = "\
Examples:
  calcert registry set FIT-1231010-PT --serial 4471A --min 0 --max 250,5
  calcert registry set TE-0101-A --sensor S-0098")]
    Set {
        tag: String,

        /// Instrument serial number
        #[arg(long)]
        serial: Option<String>,

        /// Sensor serial number
        #[arg(long)]
        sensor: Option<String>,

        /// Range lower bound (`.` or `,` decimal separator)
        #[arg(long, requires = "max", allow_hyphen_values = true, value_parser = parse_bound)]
        min: Option<f64>,

        /// Range upper bound
        #[arg(long, requires = "min", allow_hyphen_values = true, value_parser = parse_bound)]
        max: Option<f64>,
    },
}

fn parse_bound(raw: &str) -> Result<f64, String> {
    parse_decimal(raw).ok_or_else(|| format!("'{raw}' is not a number"))
}

pub fn cmd_registry(
    settings: &Settings,
    registry: Option<PathBuf>,
    cmd: RegistryCommands,
) -> Result<(), CliError> {
    let mut db = open_registry(settings, registry)?;
    match cmd {
        RegistryCommands::Init => {
            eprintln!("registry ready ({} records)", db.list()?.len());
        }
        RegistryCommands::Show { tag, json } => {
            let record = db.find_by_tag(&tag)?.ok_or_else(|| {
                CliError::from(GatewayError::NotFound {
                    key: "tag",
                    value: registry_key(&tag),
                })
                .with_hint("add it with `calcert registry set`")
            })?;
            if json {
                print_json(&record)?;
            } else {
                print_table(std::slice::from_ref(&record));
            }
        }
        RegistryCommands::List { json } => {
            let records = db.list()?;
            if json {
                print_json(&records)?;
            } else if records.is_empty() {
                eprintln!("registry is empty");
            } else {
                print_table(&records);
            }
        }
        RegistryCommands::Set { tag, serial, sensor, min, max } => {
            let key = registry_key(&tag);
            if key.is_empty() {
                return Err(CliError::args("tag must not be empty"));
            }
            let mut record = db.find_by_tag(&key)?.unwrap_or_else(|| InstrumentRecord {
                tag: key.clone(),
                ..Default::default()
            });
            if let Some(serial) = serial {
                record.serial_instrument = Some(serial.trim().to_string());
            }
            if let Some(sensor) = sensor {
                record.serial_sensor = Some(sensor.trim().to_string());
            }
            if let (Some(min), Some(max)) = (min, max) {
                record.min_range = Some(Numeric::Value(min));
                record.max_range = Some(Numeric::Value(max));
            }
            db.upsert(&record)?;
            eprintln!("saved {}", record.tag);
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
    println!("{text}");
    Ok(())
}

fn cell(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn bound(value: Option<&Numeric>) -> String {
    value.map(Numeric::to_string).unwrap_or_else(|| "-".to_string())
}

fn print_table(records: &[InstrumentRecord]) {
    println!("{:<24} {:<16} {:<16} {:>10} {:>10}", "TAG", "SN", "SENSOR", "MIN", "MAX");
    for r in records {
        println!(
            "{:<24} {:<16} {:<16} {:>10} {:>10}",
            r.tag,
            cell(r.serial_instrument.as_deref()),
            cell(r.serial_sensor.as_deref()),
            bound(r.min_range.as_ref()),
            bound(r.max_range.as_ref())
        );
    }
}
