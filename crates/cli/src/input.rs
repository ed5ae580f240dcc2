//! Certificate loading shared by every subcommand.

use std::path::{Path, PathBuf};

use serde::Serialize;

use calcert_core::{CalibrationCurve, CalibrationPoint, CertificateFields, FamilyType};
use calcert_pdf::{classify, extract_curve, extract_points, parse, Document};

use crate::CliError;

/// Where a certificate's text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Pdf(PathBuf),
    /// Text already extracted with `pdftotext -layout`.
    Text(PathBuf),
}

impl Source {
    pub fn path(&self) -> &Path {
        match self {
            Source::Pdf(p) | Source::Text(p) => p,
        }
    }
}

/// Positional PDFs first, then `--text` files.
pub fn sources(pdfs: Vec<PathBuf>, texts: Vec<PathBuf>) -> Result<Vec<Source>, CliError> {
    let all: Vec<Source> = pdfs
        .into_iter()
        .map(Source::Pdf)
        .chain(texts.into_iter().map(Source::Text))
        .collect();
    if all.is_empty() {
        return Err(CliError::args("no certificate given")
            .with_hint("pass a PDF path or --text FILE"));
    }
    Ok(all)
}

/// Exactly one certificate.
pub fn single_source(pdf: Option<PathBuf>, text: Option<PathBuf>) -> Result<Source, CliError> {
    match (pdf, text) {
        (Some(pdf), None) => Ok(Source::Pdf(pdf)),
        (None, Some(text)) => Ok(Source::Text(text)),
        (Some(_), Some(_)) => Err(CliError::args("give either a PDF or --text, not both")),
        (None, None) => Err(CliError::args("no certificate given")
            .with_hint("pass a PDF path or --text FILE")),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub source: PathBuf,
    pub family: Option<FamilyType>,
    pub curve: Option<CalibrationCurve>,
    pub fields: CertificateFields,
    pub points: Vec<CalibrationPoint>,
}

/// Extract and parse. An unreadable PDF yields a certificate with every field
/// unknown; only a missing `--text` file is an error.
pub fn load(source: &Source) -> Result<Certificate, CliError> {
    let doc = match source {
        Source::Pdf(path) => {
            if !path.exists() {
                return Err(CliError::io(format!("{}: file not found", path.display())));
            }
            Document::open(path)
        }
        Source::Text(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
            Document::from_text(&text)
        }
    };

    let text = doc.text();
    let certificate = Certificate {
        source: source.path().to_path_buf(),
        family: classify(&text),
        curve: extract_curve(&text),
        fields: parse(&text),
        points: extract_points(&doc),
    };
    log::debug!(
        "{}: tag {:?}, {} points",
        certificate.source.display(),
        certificate.fields.tag,
        certificate.points.len()
    );
    Ok(certificate)
}
