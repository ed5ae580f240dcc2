use serde::Serialize;

use calcert_core::{CertificateFields, InstrumentRecord, Numeric};

use crate::error::GatewayError;
use crate::gateway::RegistryGateway;

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

/// Stable identifier of the condition an issue reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKey {
    /// Serial registered under a sibling tag of the same family.
    Mvs,
    TagDivergente,
    NovoInstrumento,
    SnInstrumento,
    SnSensor,
    Range,
    Haste,
    HasteParse,
    Local,
}

impl IssueKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mvs => "mvs",
            Self::TagDivergente => "tag_divergente",
            Self::NovoInstrumento => "novo_instrumento",
            Self::SnInstrumento => "sn_instrumento",
            Self::SnSensor => "sn_sensor",
            Self::Range => "range",
            Self::Haste => "haste",
            Self::HasteParse => "haste_parse",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for IssueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One divergence or missing-data condition found by a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub key: IssueKey,
    pub title: String,
    pub message: String,
    /// Registry fix offered to the user, if the condition is correctable.
    pub action: Option<Remediation>,
    /// Unresolved blocking issues prevent report generation.
    pub blocking: bool,
}

impl ValidationIssue {
    pub fn new(key: IssueKey, title: &str, message: String) -> Self {
        Self {
            key,
            title: title.to_string(),
            message,
            action: None,
            blocking: false,
        }
    }

    pub fn with_action(mut self, action: Remediation) -> Self {
        self.action = Some(action);
        self
    }

    pub fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Remediation
// ---------------------------------------------------------------------------

/// A registry mutation proposed by a rule. Applying one performs exactly one
/// gateway write; re-applying leaves the registry unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Remediation {
    InsertInstrument {
        tag: String,
        serial_instrument: Option<String>,
        serial_sensor: Option<String>,
        min_range: Option<f64>,
        max_range: Option<f64>,
    },
    UpdateSerial {
        tag: String,
        serial: String,
    },
    UpdateSensorSerial {
        tag: String,
        serial: String,
    },
    /// Rename the record that owns `serial`.
    UpdateTag {
        serial: String,
        new_tag: String,
    },
    UpdateRange {
        tag: String,
        min: f64,
        max: f64,
    },
}

impl Remediation {
    /// New record carrying every extracted registry field.
    pub fn insert_from(tag: &str, fields: &CertificateFields) -> Self {
        Self::InsertInstrument {
            tag: tag.to_string(),
            serial_instrument: fields.serial_instrument.clone(),
            serial_sensor: fields.serial_sensor.clone(),
            min_range: fields.min_range,
            max_range: fields.max_range,
        }
    }

    /// Execute against the registry and flag `fields` for the report.
    pub fn apply(
        &self,
        gateway: &mut dyn RegistryGateway,
        fields: &mut CertificateFields,
    ) -> Result<(), GatewayError> {
        match self {
            Self::InsertInstrument {
                tag,
                serial_instrument,
                serial_sensor,
                min_range,
                max_range,
            } => {
                if gateway.find_by_tag(tag)?.is_some() {
                    log::debug!("{tag} already registered; insert skipped");
                    return Ok(());
                }
                gateway.insert(&InstrumentRecord {
                    tag: tag.clone(),
                    serial_instrument: serial_instrument.clone(),
                    serial_sensor: serial_sensor.clone(),
                    min_range: min_range.map(Numeric::Value),
                    max_range: max_range.map(Numeric::Value),
                })?;
            }
            Self::UpdateSerial { tag, serial } => {
                gateway.update_instrument_serial(tag, serial)?;
                fields.serial_updated = true;
            }
            Self::UpdateSensorSerial { tag, serial } => {
                gateway.update_sensor_serial(tag, serial)?;
                fields.serial_updated = true;
            }
            Self::UpdateTag { serial, new_tag } => {
                gateway.update_tag(serial, new_tag)?;
            }
            Self::UpdateRange { tag, min, max } => {
                gateway.update_range(tag, *min, *max)?;
                fields.range_updated = true;
            }
        }
        log::debug!("applied {}", self.describe());
        Ok(())
    }

    /// One-line human description, used in prompts.
    pub fn describe(&self) -> String {
        match self {
            Self::InsertInstrument { tag, .. } => format!("cadastrar {tag} como novo instrumento"),
            Self::UpdateSerial { tag, serial } => format!("atualizar SN do instrumento de {tag} para {serial}"),
            Self::UpdateSensorSerial { tag, serial } => {
                format!("atualizar SN do sensor de {tag} para {serial}")
            }
            Self::UpdateTag { serial, new_tag } => format!("renomear o registro do SN {serial} para {new_tag}"),
            Self::UpdateRange { tag, min, max } => format!("gravar range {min} → {max} em {tag}"),
        }
    }
}
