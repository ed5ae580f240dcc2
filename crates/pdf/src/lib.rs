//! `calcert-pdf`: everything that turns a certificate PDF into data.
//!
//! Extraction never fails on data-shape problems: an unreadable document is an
//! empty [`Document`], an unmatched field is `None`, a table row without a
//! reference value is skipped.

pub mod curve;
pub mod extract;
pub mod fields;
pub mod points;
pub mod tables;

pub use curve::{apply_inverse, extract_curve};
pub use extract::{Document, Page, Table};
pub use fields::parse;
pub use points::{classify, extract_points};
