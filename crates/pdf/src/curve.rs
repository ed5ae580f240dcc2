//! Calibration-curve resolver.
//!
//! Current-output transmitters state their transfer function as
//! `y = a + b·x`, with `y` the electrical reading (mA) and `x` the physical
//! quantity. Inverting it turns table readings back into engineering units.

use lazy_static::lazy_static;
use regex::Regex;

use calcert_core::{parse_decimal, CalibrationCurve};

const NUMBER: &str = r"\d+(?:[.,]\d+)?";
const TIMES: &str = r"\s*[·⋅*×.]?\s*";

lazy_static! {
    /// `y = a ± b·x`
    static ref INTERCEPT_FIRST_RE: Regex = Regex::new(&format!(
        r"(?i)\by\s*=\s*([-+]?\s*{NUMBER})\s*([-+])\s*({NUMBER}){TIMES}x\b"
    ))
    .expect("curve pattern");
    /// `y = b·x ± a`
    static ref SLOPE_FIRST_RE: Regex = Regex::new(&format!(
        r"(?i)\by\s*=\s*([-+]?\s*{NUMBER}){TIMES}x\s*([-+])\s*({NUMBER})"
    ))
    .expect("curve pattern");
}

/// Find the stated calibration equation. `None` when the certificate has none
/// (temperature certificates usually do not).
pub fn extract_curve(text: &str) -> Option<CalibrationCurve> {
    if let Some(caps) = INTERCEPT_FIRST_RE.captures(text) {
        let intercept = signed(caps.get(1)?.as_str(), "+")?;
        let slope = signed(caps.get(3)?.as_str(), caps.get(2)?.as_str())?;
        return Some(CalibrationCurve { intercept, slope });
    }

    if let Some(caps) = SLOPE_FIRST_RE.captures(text) {
        let slope = signed(caps.get(1)?.as_str(), "+")?;
        let intercept = signed(caps.get(3)?.as_str(), caps.get(2)?.as_str())?;
        return Some(CalibrationCurve { intercept, slope });
    }

    None
}

fn signed(number: &str, sign: &str) -> Option<f64> {
    let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    let value = parse_decimal(&compact)?;
    Some(if sign == "-" { -value } else { value })
}

/// `x = (reading - a) / b`, rounded to three decimals.
///
/// `None` when there is no curve, no reading, or the slope is zero.
pub fn apply_inverse(reading: Option<f64>, curve: Option<&CalibrationCurve>) -> Option<f64> {
    let reading = reading?;
    let curve = curve?;
    if curve.slope == 0.0 {
        return None;
    }
    let x = (reading - curve.intercept) / curve.slope;
    if !x.is_finite() {
        return None;
    }
    Some((x * 1000.0).round() / 1000.0)
}
