//! The reconciliation rules. Each looks at the shared context and reports at
//! most one issue; [`crate::engine::RULES`] fixes their order.

use calcert_core::tag::{is_temperature_element, registry_key};
use calcert_core::{normalize_in_place, parse_decimal, Numeric};

use crate::config::ReconConfig;
use crate::context::ValidationContext;
use crate::issue::{IssueKey, Remediation, ValidationIssue};

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Tag unknown but the serial is registered under another tag.
pub fn tag_vs_serial(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    if ctx.by_tag.is_some() {
        return None;
    }
    let found = ctx.by_serial.as_ref()?;
    let tag = ctx.fields.tag.clone()?;
    let registered = registry_key(&found.tag);
    if registered == tag {
        return None;
    }
    let message = format!("Banco: {registered}\nCertificado: {tag}");

    if ctx.tag_base.is_some() && ctx.tag_base == ctx.serial_tag_base {
        ctx.is_family_substitution = true;
        return Some(
            ValidationIssue::new(
                IssueKey::Mvs,
                "TAG compatível (Família MVS)",
                format!("NS pertence à mesma família.\n\n{message}"),
            )
            .with_action(Remediation::insert_from(&tag, &ctx.fields)),
        );
    }

    let serial = ctx.fields.serial_instrument.clone()?;
    Some(
        ValidationIssue::new(
            IssueKey::TagDivergente,
            "TAG divergente",
            format!("NS já cadastrado com outra TAG.\n\n{message}"),
        )
        .with_action(Remediation::UpdateTag {
            serial,
            new_tag: tag,
        })
        .blocking(),
    )
}

/// Neither the tag nor the serial is registered.
pub fn new_instrument(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    if ctx.by_tag.is_some() || ctx.by_serial.is_some() {
        return None;
    }
    let tag = ctx.tag()?;
    Some(
        ValidationIssue::new(
            IssueKey::NovoInstrumento,
            "TAG não encontrada",
            format!(
                "TAG {tag} não existe.\n\nSN Instrumento: {}\nSN Sensor: {}",
                show(ctx.fields.serial_instrument.as_deref()),
                show(ctx.fields.serial_sensor.as_deref()),
            ),
        )
        .with_action(Remediation::insert_from(tag, &ctx.fields))
        .blocking(),
    )
}

pub fn instrument_serial(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    let record = ctx.by_tag.as_ref()?;
    let extracted = ctx.fields.serial_instrument.as_deref()?.trim();
    let stored = record.serial_instrument.as_deref().map(str::trim);
    if extracted.is_empty() || stored == Some(extracted) {
        return None;
    }
    Some(
        ValidationIssue::new(
            IssueKey::SnInstrumento,
            "SN do Instrumento divergente",
            format!("PDF: {extracted}\nBanco: {}", show(stored)),
        )
        .with_action(Remediation::UpdateSerial {
            tag: record.tag.clone(),
            serial: extracted.to_string(),
        }),
    )
}

pub fn sensor_serial(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    let record = ctx.by_tag.as_ref()?;
    let extracted = ctx.fields.serial_sensor.as_deref()?.trim();
    let stored = record.serial_sensor.as_deref().map(str::trim);
    if extracted.is_empty() || stored == Some(extracted) {
        return None;
    }
    Some(
        ValidationIssue::new(
            IssueKey::SnSensor,
            "SN do Sensor divergente",
            format!("PDF: {extracted}\nBanco: {}", show(stored)),
        )
        .with_action(Remediation::UpdateSensorSerial {
            tag: record.tag.clone(),
            serial: extracted.to_string(),
        }),
    )
}

/// Calibrated range vs registry. Stored bounds are normalized in place so
/// later readers of the context see numbers.
pub fn range(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    if ctx.is_family_substitution {
        return None;
    }
    let record = ctx.by_tag.as_mut()?;
    let stored_min = normalize_in_place(&mut record.min_range);
    let stored_max = normalize_in_place(&mut record.max_range);
    let (min, max) = ctx.fields.range()?;

    let action = Remediation::UpdateRange {
        tag: record.tag.clone(),
        min,
        max,
    };

    match (stored_min, stored_max) {
        (Some(db_min), Some(db_max)) if db_min == min && db_max == max => None,
        (Some(db_min), Some(db_max)) => Some(
            ValidationIssue::new(
                IssueKey::Range,
                "Range divergente",
                format!("PDF: {min} → {max}\nBanco: {db_min} → {db_max}"),
            )
            .with_action(action),
        ),
        _ => Some(
            ValidationIssue::new(
                IssueKey::Range,
                "Range ausente no banco",
                format!("PDF: {min} → {max}\nBanco: não cadastrado"),
            )
            .with_action(action),
        ),
    }
}

/// Coerce a geometry value. `Err` carries the raw text that is not a number.
fn geometry_value(value: &Option<Numeric>) -> Result<Option<f64>, String> {
    match value {
        None => Ok(None),
        Some(Numeric::Value(v)) if v.is_finite() => Ok(Some(*v)),
        Some(Numeric::Value(v)) => Err(v.to_string()),
        Some(Numeric::Text(raw)) => parse_decimal(raw).map(Some).ok_or_else(|| raw.clone()),
    }
}

/// Temperature elements: the probe must fit in the rod.
pub fn rod_geometry(ctx: &mut ValidationContext, _config: &ReconConfig) -> Option<ValidationIssue> {
    if !is_temperature_element(ctx.tag()?) {
        return None;
    }

    let coerced = geometry_value(&ctx.fields.rod_length)
        .and_then(|rod| geometry_value(&ctx.fields.probe_diameter).map(|dia| (rod, dia)));

    match coerced {
        Err(raw) => Some(
            ValidationIssue::new(
                IssueKey::HasteParse,
                "Erro na leitura da Haste",
                format!("Erro ao interpretar os valores: '{raw}'"),
            )
            .blocking(),
        ),
        Ok((Some(rod), Some(dia))) if dia <= rod => None,
        Ok((rod, dia)) => Some(
            ValidationIssue::new(
                IssueKey::Haste,
                "Dados de Haste inválidos",
                format!("Comprimento: {}\nDiâmetro: {}", show(rod), show(dia)),
            )
            .blocking(),
        ),
    }
}

/// Location must name a whitelisted installation. Disabled by an empty list.
pub fn location(ctx: &mut ValidationContext, config: &ReconConfig) -> Option<ValidationIssue> {
    if config.installations.is_empty() {
        return None;
    }
    let location = ctx.fields.location.as_deref().unwrap_or_default();
    if let Some(rule) = config.identify(location) {
        ctx.installation = Some(rule.name.clone());
        return None;
    }

    let message = if location.trim().is_empty() {
        "O certificado não informa o local da calibração.".to_string()
    } else {
        format!("Local \"{}\" não corresponde a nenhuma instalação conhecida.", location.trim())
    };
    Some(ValidationIssue::new(IssueKey::Local, "Local de calibração não reconhecido", message).blocking())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcert_core::{CertificateFields, InstrumentRecord};

    fn ctx(fields: CertificateFields, by_tag: Option<InstrumentRecord>, by_serial: Option<InstrumentRecord>) -> ValidationContext {
        ValidationContext::new(fields, by_tag, by_serial, Vec::new())
    }

    fn tagged(tag: &str) -> CertificateFields {
        CertificateFields {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    fn record(tag: &str, serial: Option<&str>) -> InstrumentRecord {
        InstrumentRecord {
            tag: tag.into(),
            serial_instrument: serial.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn same_base_is_family_substitution() {
        let fields = CertificateFields {
            serial_instrument: Some("SN1".into()),
            ..tagged("FIT-100-B")
        };
        let mut c = ctx(fields, None, Some(record("FIT-100-A", Some("SN1"))));
        let issue = tag_vs_serial(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::Mvs);
        assert!(!issue.blocking);
        assert!(matches!(issue.action, Some(Remediation::InsertInstrument { ref tag, .. }) if tag == "FIT-100-B"));
        assert!(c.is_family_substitution);
    }

    #[test]
    fn different_base_is_tag_conflict() {
        let fields = CertificateFields {
            serial_instrument: Some("SN1".into()),
            ..tagged("PIT-300-A")
        };
        let mut c = ctx(fields, None, Some(record("FIT-100-A", Some("SN1"))));
        let issue = tag_vs_serial(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::TagDivergente);
        assert!(issue.blocking);
        assert_eq!(
            issue.action,
            Some(Remediation::UpdateTag { serial: "SN1".into(), new_tag: "PIT-300-A".into() })
        );
        assert!(!c.is_family_substitution);
    }

    #[test]
    fn serial_rules_need_a_registry_record() {
        let fields = CertificateFields {
            serial_instrument: Some("SN1".into()),
            serial_sensor: Some("S1".into()),
            ..tagged("TT-1-A")
        };
        let mut c = ctx(fields, None, None);
        assert!(instrument_serial(&mut c, &ReconConfig::default()).is_none());
        assert!(sensor_serial(&mut c, &ReconConfig::default()).is_none());
    }

    #[test]
    fn serial_mismatch_offers_update() {
        let fields = CertificateFields {
            serial_instrument: Some("SN2".into()),
            ..tagged("TT-1-A")
        };
        let mut c = ctx(fields, Some(record("TT-1-A", Some("SN1"))), None);
        let issue = instrument_serial(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::SnInstrumento);
        assert_eq!(issue.message, "PDF: SN2\nBanco: SN1");
        assert!(!issue.blocking);
    }

    #[test]
    fn sensor_missing_in_registry_is_divergent() {
        let fields = CertificateFields {
            serial_sensor: Some("S-77".into()),
            ..tagged("TT-1-A")
        };
        let mut c = ctx(fields, Some(record("TT-1-A", None)), None);
        let issue = sensor_serial(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(
            issue.action,
            Some(Remediation::UpdateSensorSerial { tag: "TT-1-A".into(), serial: "S-77".into() })
        );
    }

    #[test]
    fn range_normalizes_legacy_text_in_place() {
        let fields = CertificateFields {
            min_range: Some(0.0),
            max_range: Some(250.5),
            ..tagged("PIT-1-A")
        };
        let stored = InstrumentRecord {
            min_range: Some(Numeric::Text("0".into())),
            max_range: Some(Numeric::Text("250,5".into())),
            ..record("PIT-1-A", None)
        };
        let mut c = ctx(fields, Some(stored), None);
        assert!(range(&mut c, &ReconConfig::default()).is_none());
        let record = c.by_tag.unwrap();
        assert_eq!(record.max_range, Some(Numeric::Value(250.5)));
    }

    #[test]
    fn range_missing_in_registry() {
        let fields = CertificateFields {
            min_range: Some(0.0),
            max_range: Some(10.0),
            ..tagged("PIT-1-A")
        };
        let mut c = ctx(fields, Some(record("PIT-1-A", None)), None);
        let issue = range(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.title, "Range ausente no banco");
    }

    #[test]
    fn range_without_extracted_bounds_is_silent() {
        let mut c = ctx(tagged("PIT-1-A"), Some(record("PIT-1-A", None)), None);
        assert!(range(&mut c, &ReconConfig::default()).is_none());
    }

    #[test]
    fn geometry_probe_larger_than_rod() {
        let fields = CertificateFields {
            rod_length: Some(Numeric::Value(50.0)),
            probe_diameter: Some(Numeric::Value(60.0)),
            ..tagged("TE-100-A")
        };
        let mut c = ctx(fields, None, None);
        let issue = rod_geometry(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::Haste);
        assert!(issue.blocking);
        assert!(issue.action.is_none());
    }

    #[test]
    fn geometry_text_is_parse_issue() {
        let fields = CertificateFields {
            rod_length: Some(Numeric::Text("approx. 300".into())),
            probe_diameter: Some(Numeric::Value(6.0)),
            ..tagged("TE-100-A")
        };
        let mut c = ctx(fields, None, None);
        let issue = rod_geometry(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::HasteParse);
        assert!(issue.blocking);
    }

    #[test]
    fn geometry_valid_and_comma_text() {
        let fields = CertificateFields {
            rod_length: Some(Numeric::Text("300,0".into())),
            probe_diameter: Some(Numeric::Value(6.0)),
            ..tagged("TE-100-A")
        };
        let mut c = ctx(fields, None, None);
        assert!(rod_geometry(&mut c, &ReconConfig::default()).is_none());
    }

    #[test]
    fn geometry_probe_equal_to_rod_is_valid() {
        let fields = CertificateFields {
            rod_length: Some(Numeric::Value(6.0)),
            probe_diameter: Some(Numeric::Value(6.0)),
            ..tagged("TE-100-A")
        };
        let mut c = ctx(fields, None, None);
        assert!(rod_geometry(&mut c, &ReconConfig::default()).is_none());
    }

    #[test]
    fn geometry_missing_probe_is_haste() {
        let fields = CertificateFields {
            rod_length: Some(Numeric::Value(300.0)),
            ..tagged("TE-100-A")
        };
        let mut c = ctx(fields, None, None);
        let issue = rod_geometry(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::Haste);
        assert!(issue.blocking);
    }

    #[test]
    fn geometry_only_for_temperature_elements() {
        let mut c = ctx(tagged("PIT-100-A"), None, None);
        assert!(rod_geometry(&mut c, &ReconConfig::default()).is_none());
    }

    #[test]
    fn location_match_records_installation() {
        let fields = CertificateFields {
            location: Some("Plataforma POLVO Bacia de Campos".into()),
            ..tagged("PIT-1-A")
        };
        let mut c = ctx(fields, None, None);
        assert!(location(&mut c, &ReconConfig::default()).is_none());
        assert_eq!(c.installation.as_deref(), Some("Polvo"));
    }

    #[test]
    fn location_unknown_or_empty_is_blocking() {
        let fields = CertificateFields {
            location: Some("Laboratório central".into()),
            ..tagged("PIT-1-A")
        };
        let mut c = ctx(fields, None, None);
        let issue = location(&mut c, &ReconConfig::default()).unwrap();
        assert_eq!(issue.key, IssueKey::Local);
        assert!(issue.blocking);

        let mut c = ctx(tagged("PIT-1-A"), None, None);
        assert!(location(&mut c, &ReconConfig::default()).unwrap().blocking);
        assert!(location(&mut c, &ReconConfig::without_whitelist()).is_none());
    }
}
