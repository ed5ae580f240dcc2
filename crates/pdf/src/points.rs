//! As-found calibration point extraction.
//!
//! The certificate's family decides which table holds the calibration data
//! and how its columns are laid out:
//!
//! | Family | Table  | Columns                                                   |
//! |--------|--------|-----------------------------------------------------------|
//! | TE, TT | first  | reference, mean, deviation, uncertainty, k                |
//! | PT, DPT| second | reference, reading, mean (kPa), deviation, uncertainty, k |
//!
//! The first table of a pressure certificate is a different section, so the
//! second one is used unconditionally.

use lazy_static::lazy_static;
use regex::Regex;

use calcert_core::{parse_decimal, CalibrationCurve, CalibrationPoint, FamilyType};

use crate::curve::{apply_inverse, extract_curve};
use crate::extract::{Document, Table};

const DPT_KEYWORDS: &[&str] = &[
    "PRESSÃO DIFERENCIAL",
    "PRESSAO DIFERENCIAL",
    "DIFFERENTIAL PRESSURE",
];
const PT_KEYWORDS: &[&str] = &[
    "TRANSMISSOR DE PRESSÃO",
    "TRANSMISSOR DE PRESSAO",
    "PRESSURE TRANSMITTER",
];
const TT_KEYWORDS: &[&str] = &[
    "TRANSMISSOR DE TEMPERATURA",
    "TEMPERATURE TRANSMITTER",
    "TERMÔMETRO DIGITAL",
    "TERMOMETRO DIGITAL",
    "DIGITAL THERMOMETER",
];
const TE_KEYWORDS: &[&str] = &[
    "TERMORRESISTÊNCIA",
    "TERMORRESISTENCIA",
    "TERMORESISTÊNCIA",
    "THERMORESISTANCE",
    "RESISTANCE THERMOMETER",
    "PT-100",
    "PT100",
];

lazy_static! {
    static ref CURRENT_HEADER_RE: Regex = Regex::new(r"(?i)\bmA\b").expect("current header pattern");
}

/// Infer the instrument family from certificate text.
///
/// Pressure families win over temperature ones (pressure certificates quote
/// ambient temperature); DPT wins over PT and TT wins over TE.
pub fn classify(text: &str) -> Option<FamilyType> {
    let upper = text.to_uppercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| upper.contains(k));

    if has(DPT_KEYWORDS) {
        Some(FamilyType::DPT)
    } else if has(PT_KEYWORDS) || (upper.contains("KPA") && upper.contains("MA DC")) {
        Some(FamilyType::PT)
    } else if has(TT_KEYWORDS) {
        Some(FamilyType::TT)
    } else if has(TE_KEYWORDS) {
        Some(FamilyType::TE)
    } else {
        None
    }
}

/// Extract the as-found points of a certificate. Empty when there are no
/// usable tables or the family cannot be identified.
pub fn extract_points(doc: &Document) -> Vec<CalibrationPoint> {
    let tables: Vec<&Table> = doc.tables().filter(|t| t.len() > 2).collect();
    if tables.is_empty() {
        log::debug!("no calibration tables found");
        return Vec::new();
    }

    let text = doc.text();
    let Some(family) = classify(&text) else {
        log::debug!("certificate family not recognized");
        return Vec::new();
    };

    if !family.is_pressure() {
        return temperature_points(family, tables[0]);
    }
    match tables.get(1) {
        Some(table) => {
            let curve = extract_curve(&text);
            pressure_points(family, table, curve.as_ref())
        }
        None => {
            log::debug!("{family} certificate has a single table; no points");
            Vec::new()
        }
    }
}

fn temperature_points(family: FamilyType, table: &Table) -> Vec<CalibrationPoint> {
    data_rows(table)
        .map(|(reference, row)| CalibrationPoint {
            family_type: family,
            reference,
            measured_mean: cell(row, 1),
            deviation: slash_cell(row, 2),
            uncertainty: slash_cell(row, 3),
            coverage_factor_k: cell(row, 4),
        })
        .collect()
}

fn pressure_points(
    family: FamilyType,
    table: &Table,
    curve: Option<&CalibrationCurve>,
) -> Vec<CalibrationPoint> {
    let current_reading = reads_current(table);
    if current_reading && curve.is_none() {
        log::warn!("table reads current but no calibration curve was found; means are unknown");
    }

    data_rows(table)
        .map(|(reference, row)| {
            let measured_mean = if current_reading {
                apply_inverse(cell(row, 1), curve)
            } else {
                cell(row, 2)
            };
            CalibrationPoint {
                family_type: family,
                reference,
                measured_mean,
                deviation: slash_cell(row, 3),
                uncertainty: slash_cell(row, 4),
                coverage_factor_k: cell(row, 5),
            }
        })
        .collect()
}

/// Rows with a parseable reference value, paired with it. Everything else is
/// header or layout residue.
fn data_rows(table: &Table) -> impl Iterator<Item = (f64, &Vec<String>)> {
    table
        .rows
        .iter()
        .filter_map(|row| row.first().and_then(|c| parse_decimal(c)).map(|r| (r, row)))
}

/// Whether the reading column (second) is labeled as a current in the header.
fn reads_current(table: &Table) -> bool {
    table
        .rows
        .iter()
        .take_while(|row| row.first().and_then(|c| parse_decimal(c)).is_none())
        .filter_map(|row| row.get(1))
        .any(|label| CURRENT_HEADER_RE.is_match(label))
}

fn cell(row: &[String], idx: usize) -> Option<f64> {
    row.get(idx).and_then(|c| parse_decimal(c))
}

/// Value stored either plainly or as `A/B`, where the value is `B`.
fn slash_cell(row: &[String], idx: usize) -> Option<f64> {
    let raw = row.get(idx)?;
    let value = raw.rsplit('/').next().unwrap_or(raw);
    parse_decimal(value)
}
