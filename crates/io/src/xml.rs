//! Structured calibration export (`Calibracion` XML document).

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use calcert_core::{CalibrationPoint, CertificateFields, FamilyType};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no calibration points to export")]
    NoPoints,
    #[error("XML write error: {0}")]
    Xml(String),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Installation identified by the location rule.
    pub installation: Option<String>,
    /// Certificate of the RTD previously calibrated with this transmitter (TT only).
    pub rtd_certificate: Option<String>,
}

/// Certificate number without spaces, `--` folded to `-`.
pub fn normalize_certificate(number: Option<&str>) -> String {
    number
        .map(|n| n.replace(' ', "").replace("--", "-"))
        .unwrap_or_default()
}

/// `FPSO FORTE` → `FPSO Forte`; anything else in title case.
pub fn format_installation(location: Option<&str>) -> String {
    let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return String::new();
    };
    let parts: Vec<&str> = location.split_whitespace().collect();
    if parts.len() >= 2 && parts[0].eq_ignore_ascii_case("FPSO") {
        return format!("FPSO {}", capitalize(parts[1]));
    }
    parts.iter().map(|p| capitalize(p)).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// FPSO Forte registers transmitters without the `-TT`/`-PT`/`-DPT` suffix.
pub fn export_tag(tag: Option<&str>, installation: &str) -> String {
    let tag = tag.map(|t| t.trim().to_uppercase()).unwrap_or_default();
    if installation.trim().eq_ignore_ascii_case("FPSO FORTE") {
        for suffix in ["-TT", "-PT", "-DPT"] {
            if let Some(stripped) = tag.strip_suffix(suffix) {
                return stripped.to_string();
            }
        }
    }
    tag
}

/// Fixed decimals with a comma separator; unknown renders as zero.
pub fn format_number(value: Option<f64>, decimals: usize) -> String {
    format!("{:.*}", decimals, value.unwrap_or(0.0)).replace('.', ",")
}

/// Render the export document.
pub fn render_xml(
    fields: &CertificateFields,
    points: &[CalibrationPoint],
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let first = points.first().ok_or(ExportError::NoPoints)?;
    let family = first.family_type;
    let installation = options
        .installation
        .clone()
        .unwrap_or_else(|| format_installation(fields.location.as_deref()));

    let mut xml = XmlOut::new();
    xml.decl()?;
    xml.open("Calibracion")?;
    xml.leaf("NroCertificado", &normalize_certificate(fields.certificate_number.as_deref()))?;
    xml.leaf("FechaDeCalibracion", fields.calibration_date.as_deref().unwrap_or_default())?;
    xml.leaf("FechaEmisionCertificado", fields.report_date.as_deref().unwrap_or_default())?;
    xml.leaf("Instalacao", &installation)?;
    xml.leaf("Tipo", family.as_str())?;
    xml.leaf("Serial", fields.serial_instrument.as_deref().unwrap_or_default())?;
    xml.leaf("FajaInicial", &format_number(fields.min_range, 2))?;
    xml.leaf("FajaFinal", &format_number(fields.max_range, 2))?;
    xml.leaf("InLoco", "1")?;
    xml.leaf("AsLeft", "0")?;
    if family == FamilyType::TT {
        xml.leaf(
            "NroCertificadoRTD",
            &normalize_certificate(options.rtd_certificate.as_deref()),
        )?;
    }
    xml.leaf("CalcularValorNominal", "0")?;
    xml.leaf("TAG", &export_tag(fields.tag.as_deref(), &installation))?;

    for p in points {
        xml.open("GrillaAsFound")?;
        xml.leaf("ValorNominal", &format_number(Some(p.reference), 3))?;
        xml.leaf("MediaInstrumento", &format_number(p.measured_mean, 3))?;
        xml.leaf("Tendencia", &format_number(p.deviation, 3))?;
        xml.leaf("Incerteza", &format_number(p.uncertainty, 3))?;
        xml.leaf("K", &format_number(p.coverage_factor_k, 2))?;
        xml.close("GrillaAsFound")?;
    }
    xml.close("Calibracion")?;

    xml.finish()
}

/// Render and write to `output`, creating parent directories.
pub fn export_xml(
    fields: &CertificateFields,
    points: &[CalibrationPoint],
    output: &Path,
    options: &ExportOptions,
) -> Result<PathBuf, ExportError> {
    let document = render_xml(fields, points, options)?;
    let io_err = |source| ExportError::Io {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(output, document).map_err(io_err)?;
    log::debug!("wrote {} ({} points)", output.display(), points.len());
    Ok(output.to_path_buf())
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ExportError> {
        self.writer
            .write_event(event)
            .map_err(|e| ExportError::Xml(e.to_string()))
    }

    fn decl(&mut self) -> Result<(), ExportError> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    }

    fn open(&mut self, name: &str) -> Result<(), ExportError> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, text: &str) -> Result<(), ExportError> {
        self.open(name)?;
        // An empty text event keeps `<X></X>` on one line.
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, ExportError> {
        let mut out = String::from_utf8(self.writer.into_inner())
            .map_err(|e| ExportError::Xml(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields() -> CertificateFields {
        CertificateFields {
            tag: Some("tit-3301-tt".into()),
            serial_instrument: Some("4471A".into()),
            certificate_number: Some("25 - ODS -- 0412 ".into()),
            calibration_date: Some("28/09/2025".into()),
            report_date: Some("30/09/2025".into()),
            location: Some("FPSO FORTE".into()),
            min_range: Some(-50.0),
            max_range: Some(150.0),
            ..Default::default()
        }
    }

    fn point(family: FamilyType, reference: f64) -> CalibrationPoint {
        CalibrationPoint {
            family_type: family,
            reference,
            measured_mean: Some(reference + 0.0125),
            deviation: Some(0.0125),
            uncertainty: None,
            coverage_factor_k: Some(2.0),
        }
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(normalize_certificate(Some("25 - ODS -- 0412 ")), "25-ODS-0412");
        assert_eq!(normalize_certificate(None), "");
        assert_eq!(format_installation(Some("FPSO BRAVO field")), "FPSO Bravo");
        assert_eq!(format_installation(Some("plataforma POLVO")), "Plataforma Polvo");
        assert_eq!(format_number(Some(1.5), 3), "1,500");
        assert_eq!(format_number(None, 2), "0,00");
        assert_eq!(export_tag(Some("TIT-3301-TT"), "FPSO Forte"), "TIT-3301");
        assert_eq!(export_tag(Some("TIT-3301-TT"), "FPSO Frade"), "TIT-3301-TT");
    }

    #[test]
    fn renders_transmitter_document() {
        let options = ExportOptions {
            installation: None,
            rtd_certificate: Some("25-ODS 0100".into()),
        };
        let xml = render_xml(&fields(), &[point(FamilyType::TT, 0.0), point(FamilyType::TT, 100.0)], &options)
            .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<NroCertificado>25-ODS-0412</NroCertificado>"));
        assert!(xml.contains("<Instalacao>FPSO Forte</Instalacao>"));
        assert!(xml.contains("<Tipo>TT</Tipo>"));
        assert!(xml.contains("<FajaInicial>-50,00</FajaInicial>"));
        assert!(xml.contains("<NroCertificadoRTD>25-ODS0100</NroCertificadoRTD>"));
        assert!(xml.contains("<TAG>TIT-3301</TAG>"));
        assert_eq!(xml.matches("<GrillaAsFound>").count(), 2);
        assert!(xml.contains("<ValorNominal>100,000</ValorNominal>"));
        assert!(xml.contains("<Incerteza>0,000</Incerteza>"));
        assert!(xml.contains("<K>2,00</K>"));
        assert!(xml.contains("\n  <Tipo>"));
    }

    #[test]
    fn rtd_certificate_only_for_transmitters() {
        let xml = render_xml(&fields(), &[point(FamilyType::TE, 0.0)], &ExportOptions::default()).unwrap();
        assert!(!xml.contains("NroCertificadoRTD"));
        assert!(xml.contains("<Tipo>TE</Tipo>"));
    }

    #[test]
    fn identified_installation_wins() {
        let options = ExportOptions {
            installation: Some("Polvo".into()),
            ..Default::default()
        };
        let xml = render_xml(&fields(), &[point(FamilyType::PT, 1.0)], &options).unwrap();
        assert!(xml.contains("<Instalacao>Polvo</Instalacao>"));
        assert!(xml.contains("<TAG>TIT-3301-TT</TAG>"));
    }

    #[test]
    fn empty_points_is_an_error() {
        assert!(matches!(
            render_xml(&fields(), &[], &ExportOptions::default()),
            Err(ExportError::NoPoints)
        ));
    }

    #[test]
    fn export_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("xml").join("2025").join("cert.xml");
        let written = export_xml(&fields(), &[point(FamilyType::TT, 0.0)], &out, &ExportOptions::default()).unwrap();
        assert_eq!(written, out);
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("<Calibracion>"));
        assert!(content.trim_end().ends_with("</Calibracion>"));
    }
}
