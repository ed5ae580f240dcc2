//! `calcert-core`: shared data model for certificate reconciliation.
//!
//! Every stage (extraction, reconciliation, rendering) exchanges these types.
//! Fields that a certificate may omit are `Option`s: absence is "unknown",
//! never a default value.

pub mod model;
pub mod numeric;
pub mod tag;

pub use model::{
    CalibrationCurve, CalibrationPoint, CertificateFields, FamilyType, InstrumentRecord,
};
pub use numeric::{normalize_in_place, parse_decimal, Numeric};
