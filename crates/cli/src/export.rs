//! `calcert export-xml` and the XML naming shared with `process`.

use std::path::PathBuf;

use calcert_config::Settings;
use calcert_core::CertificateFields;
use calcert_io::xml::normalize_certificate;
use calcert_io::{export_xml, ExportOptions};
use calcert_recon::{ReconConfig, ValidationContext};

use crate::input::{self, single_source};
use crate::{recon_config, CliError};

/// `<certificate>_<tag>.xml`; either part may be missing.
pub fn xml_file_name(fields: &CertificateFields) -> String {
    let certificate = normalize_certificate(fields.certificate_number.as_deref());
    let tag = fields
        .tag
        .as_deref()
        .map(|t| t.trim().replace(' ', "").to_uppercase())
        .unwrap_or_default();
    let stem = match (certificate.is_empty(), tag.is_empty()) {
        (false, false) => format!("{certificate}_{tag}"),
        (false, true) => certificate,
        (true, false) => tag,
        (true, true) => "calibracion".to_string(),
    };
    format!("{}.xml", stem.replace('/', "-"))
}

/// Options for a certificate exported without reconciliation: the
/// installation comes from the whitelist when the location is recognized.
pub fn export_options(
    config: &ReconConfig,
    fields: &CertificateFields,
    rtd_certificate: Option<String>,
) -> ExportOptions {
    ExportOptions {
        installation: fields
            .location
            .as_deref()
            .and_then(|loc| config.identify(loc))
            .map(|rule| rule.name.clone()),
        rtd_certificate,
    }
}

/// Options for a reconciled certificate, reusing the installation the
/// location rule identified.
pub fn reconciled_options(ctx: &ValidationContext, rtd_certificate: Option<String>) -> ExportOptions {
    ExportOptions {
        installation: ctx.installation.clone(),
        rtd_certificate,
    }
}

pub fn cmd_export_xml(
    settings: &Settings,
    pdf: Option<PathBuf>,
    text: Option<PathBuf>,
    out: PathBuf,
    rtd_cert: Option<String>,
    installations: Option<PathBuf>,
) -> Result<(), CliError> {
    let source = single_source(pdf, text)?;
    let config = recon_config(settings, installations)?;
    let cert = input::load(&source)?;

    let options = export_options(&config, &cert.fields, rtd_cert);
    let written = export_xml(&cert.fields, &cert.points, &out, &options)?;
    eprintln!("wrote {} ({} points)", written.display(), cert.points.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_certificate_and_tag() {
        let fields = CertificateFields {
            certificate_number: Some("25 - ODS -- 0412".into()),
            tag: Some("fit-100-pt".into()),
            ..Default::default()
        };
        assert_eq!(xml_file_name(&fields), "25-ODS-0412_FIT-100-PT.xml");

        let slashed = CertificateFields {
            certificate_number: Some("0412/25".into()),
            ..Default::default()
        };
        assert_eq!(xml_file_name(&slashed), "0412-25.xml");
        assert_eq!(xml_file_name(&CertificateFields::default()), "calibracion.xml");
    }

    #[test]
    fn installation_from_whitelist() {
        let fields = CertificateFields {
            location: Some("FPSO Frade".into()),
            ..Default::default()
        };
        let options = export_options(&ReconConfig::default(), &fields, None);
        assert_eq!(options.installation.as_deref(), Some("FPSO Frade"));

        let options = export_options(&ReconConfig::without_whitelist(), &fields, Some("X".into()));
        assert_eq!(options.installation, None);
        assert_eq!(options.rtd_certificate.as_deref(), Some("X"));
    }

    #[test]
    fn reconciled_installation_is_not_looked_up_again() {
        let fields = CertificateFields {
            location: Some("somewhere else".into()),
            ..Default::default()
        };
        let mut ctx = ValidationContext::new(fields, None, None, Vec::new());
        ctx.installation = Some("FPSO Bravo".into());
        let options = reconciled_options(&ctx, None);
        assert_eq!(options.installation.as_deref(), Some("FPSO Bravo"));
    }
}
