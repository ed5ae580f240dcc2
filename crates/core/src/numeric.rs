use std::fmt;

use serde::{Deserialize, Serialize};

/// Parse a decimal written with either `.` or `,` as the separator.
///
/// Blank cells, lone dashes and the infinity glyph some certificates print in
/// empty table slots are "no value", as is anything that is not finite.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "-" | "∞") {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// A number as it was found at the source: either already numeric, or the raw
/// text that still has to be coerced.
///
/// Registry rows written by older tooling hold ranges as text (`"0,5"`), and
/// labeled certificate values are kept verbatim until a rule interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Value(f64),
    Text(String),
}

impl Numeric {
    /// Keep `raw` as a number when it parses, as text otherwise.
    pub fn from_raw(raw: &str) -> Self {
        match parse_decimal(raw) {
            Some(v) => Self::Value(v),
            None => Self::Text(raw.trim().to_string()),
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Value(v) if v.is_finite() => Some(*v),
            Self::Value(_) => None,
            Self::Text(s) => parse_decimal(s),
        }
    }
}

impl From<f64> for Numeric {
    fn from(v: f64) -> Self {
        Self::Value(v)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Normalize an optional stored value in place; unparsable text becomes `None`.
pub fn normalize_in_place(value: &mut Option<Numeric>) -> Option<f64> {
    let parsed = value.as_ref().and_then(Numeric::to_f64);
    *value = parsed.map(Numeric::Value);
    parsed
}
