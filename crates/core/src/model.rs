use serde::{Deserialize, Serialize};

use crate::numeric::Numeric;

// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// Metadata parsed from a calibration certificate.
///
/// Layouts vary between laboratories, so every field is optional and parsed
/// independently of the others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateFields {
    pub tag: Option<String>,
    pub serial_instrument: Option<String>,
    pub serial_sensor: Option<String>,
    pub certificate_number: Option<String>,
    /// `DD/MM/YYYY`
    pub calibration_date: Option<String>,
    /// `DD/MM/YYYY`
    pub report_date: Option<String>,
    pub location: Option<String>,
    pub system_description: Option<String>,
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub indicated_min_range: Option<f64>,
    pub indicated_max_range: Option<f64>,
    /// Temperature elements only. Kept as found; the geometry rule coerces it.
    pub rod_length: Option<Numeric>,
    /// Temperature elements only. Kept as found; the geometry rule coerces it.
    pub probe_diameter: Option<Numeric>,
    /// Percent.
    pub fiducial_error: Option<f64>,
    /// Percent.
    pub uncertainty: Option<f64>,

    /// Set when a remediation rewrote the registry serial.
    #[serde(default)]
    pub serial_updated: bool,
    /// Set when a remediation rewrote the registry range.
    #[serde(default)]
    pub range_updated: bool,
}

impl CertificateFields {
    /// Both range bounds, or nothing.
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.min_range, self.max_range) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration points
// ---------------------------------------------------------------------------

/// Instrument family inferred from certificate content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FamilyType {
    /// Resistance thermometer element.
    TE,
    /// Temperature transmitter / digital thermometer.
    TT,
    /// Pressure transmitter.
    PT,
    /// Differential-pressure transmitter.
    DPT,
}

impl FamilyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TE => "TE",
            Self::TT => "TT",
            Self::PT => "PT",
            Self::DPT => "DPT",
        }
    }

    pub fn is_pressure(&self) -> bool {
        matches!(self, Self::PT | Self::DPT)
    }
}

impl std::fmt::Display for FamilyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One as-found row of the calibration table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub family_type: FamilyType,
    pub reference: f64,
    pub measured_mean: Option<f64>,
    pub deviation: Option<f64>,
    pub uncertainty: Option<f64>,
    pub coverage_factor_k: Option<f64>,
}

/// Linear transfer function `reading = intercept + slope * physical_value`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub intercept: f64,
    pub slope: f64,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A row of the instrument registry. `tag` is the primary key; the instrument
/// serial is a secondary, not necessarily unique, lookup key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub tag: String,
    pub serial_instrument: Option<String>,
    pub serial_sensor: Option<String>,
    pub min_range: Option<Numeric>,
    pub max_range: Option<Numeric>,
}
