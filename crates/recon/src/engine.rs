use crate::config::ReconConfig;
use crate::context::ValidationContext;
use crate::error::ReconError;
use crate::issue::ValidationIssue;
use crate::rules;

pub type Rule = fn(&mut ValidationContext, &ReconConfig) -> Option<ValidationIssue>;

/// Rules in execution order. The range rule reads the substitution flag the
/// tag rule sets, so the order is part of the contract.
pub const RULES: &[(&str, Rule)] = &[
    ("tag_vs_serial", rules::tag_vs_serial),
    ("new_instrument", rules::new_instrument),
    ("instrument_serial", rules::instrument_serial),
    ("sensor_serial", rules::sensor_serial),
    ("range", rules::range),
    ("rod_geometry", rules::rod_geometry),
    ("location", rules::location),
];

/// Run every rule against the context. Returns the issues in emission order.
pub fn run(config: &ReconConfig, ctx: &mut ValidationContext) -> Result<Vec<ValidationIssue>, ReconError> {
    if ctx.tag().map_or(true, |t| t.trim().is_empty()) {
        return Err(ReconError::MissingTag);
    }

    let mut issues = Vec::new();
    for (name, rule) in RULES {
        if let Some(issue) = rule(ctx, config) {
            log::debug!("rule {name} raised '{}' (blocking={})", issue.key, issue.blocking);
            issues.push(issue);
        }
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{IssueKey, Remediation};
    use calcert_core::{CertificateFields, InstrumentRecord, Numeric};
    use proptest::prelude::*;

    fn fields(tag: &str) -> CertificateFields {
        CertificateFields {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    fn run_plain(ctx: &mut ValidationContext) -> Vec<ValidationIssue> {
        run(&ReconConfig::without_whitelist(), ctx).unwrap()
    }

    #[test]
    fn missing_tag_is_an_error() {
        let mut ctx = ValidationContext::new(CertificateFields::default(), None, None, Vec::new());
        assert!(matches!(
            run(&ReconConfig::default(), &mut ctx),
            Err(ReconError::MissingTag)
        ));
    }

    #[test]
    fn unknown_instrument_yields_single_blocking_issue() {
        let f = CertificateFields {
            serial_instrument: Some("SN1".into()),
            min_range: Some(0.0),
            max_range: Some(10.0),
            ..fields("FIT-100-PT")
        };
        let mut ctx = ValidationContext::new(f, None, None, Vec::new());
        let issues = run_plain(&mut ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key.as_str(), "novo_instrumento");
        assert!(issues[0].blocking);
    }

    #[test]
    fn divergent_range_offers_rewrite() {
        let f = CertificateFields {
            min_range: Some(5.0),
            max_range: Some(15.0),
            ..fields("FIT-100-PT")
        };
        let stored = InstrumentRecord {
            tag: "FIT-100-PT".into(),
            min_range: Some(Numeric::Value(0.0)),
            max_range: Some(Numeric::Value(10.0)),
            ..Default::default()
        };
        let mut ctx = ValidationContext::new(f, Some(stored), None, Vec::new());
        let issues = run_plain(&mut ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key.as_str(), "range");
        assert_eq!(issues[0].title, "Range divergente");
        assert_eq!(
            issues[0].action,
            Some(Remediation::UpdateRange { tag: "FIT-100-PT".into(), min: 5.0, max: 15.0 })
        );
    }

    #[test]
    fn temperature_element_without_rod_length() {
        let stored = InstrumentRecord {
            tag: "TE-1001-A".into(),
            ..Default::default()
        };
        let f = CertificateFields {
            probe_diameter: Some(Numeric::Value(6.0)),
            ..fields("TE-1001-A")
        };
        let mut ctx = ValidationContext::new(f, Some(stored), None, Vec::new());
        let issues = run_plain(&mut ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, IssueKey::Haste);
        assert!(issues[0].blocking);
        assert!(issues[0].action.is_none());
    }

    #[test]
    fn whitelisted_location_is_silent() {
        let stored = InstrumentRecord {
            tag: "PIT-1-A".into(),
            ..Default::default()
        };
        let f = CertificateFields {
            location: Some("Plataforma POLVO Bacia de Campos".into()),
            ..fields("PIT-1-A")
        };
        let config = ReconConfig::from_toml("[[installations]]\nname = \"Polvo\"\nkeywords = [\"POLVO\"]\n").unwrap();
        let mut ctx = ValidationContext::new(f, Some(stored), None, Vec::new());
        assert!(run(&config, &mut ctx).unwrap().is_empty());
        assert_eq!(ctx.installation.as_deref(), Some("Polvo"));
    }

    #[test]
    fn emission_follows_rule_order() {
        let stored = InstrumentRecord {
            tag: "TE-5-A".into(),
            serial_instrument: Some("OLD".into()),
            serial_sensor: Some("OLDS".into()),
            min_range: None,
            max_range: None,
        };
        let f = CertificateFields {
            serial_instrument: Some("NEW".into()),
            serial_sensor: Some("NEWS".into()),
            min_range: Some(0.0),
            max_range: Some(100.0),
            ..fields("TE-5-A")
        };
        let mut ctx = ValidationContext::new(f, Some(stored), None, Vec::new());
        let keys: Vec<&str> = run(&ReconConfig::default(), &mut ctx)
            .unwrap()
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(keys, vec!["sn_instrumento", "sn_sensor", "range", "haste", "local"]);
    }

    fn arb_range() -> impl Strategy<Value = Option<(f64, f64)>> {
        prop::option::of((-1000.0f64..1000.0, -1000.0f64..1000.0))
    }

    proptest! {
        #[test]
        fn pipeline_is_deterministic(
            serial in prop::option::of("[A-Z0-9]{1,6}"),
            stored_serial in prop::option::of("[A-Z0-9]{1,6}"),
            extracted in arb_range(),
            stored in arb_range(),
            te in any::<bool>(),
        ) {
            let tag = if te { "TE-10-A" } else { "PIT-10-A" };
            let f = CertificateFields {
                serial_instrument: serial,
                min_range: extracted.map(|r| r.0),
                max_range: extracted.map(|r| r.1),
                ..fields(tag)
            };
            let record = InstrumentRecord {
                tag: tag.into(),
                serial_instrument: stored_serial,
                serial_sensor: None,
                min_range: stored.map(|r| Numeric::Value(r.0)),
                max_range: stored.map(|r| Numeric::Value(r.1)),
            };
            let ctx = ValidationContext::new(f, Some(record), None, Vec::new());
            let config = ReconConfig::default();

            let first: Vec<IssueKey> = run(&config, &mut ctx.clone()).unwrap().iter().map(|i| i.key).collect();
            let second: Vec<IssueKey> = run(&config, &mut ctx.clone()).unwrap().iter().map(|i| i.key).collect();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn substitution_suppresses_range(
            extracted in (-1000.0f64..1000.0, -1000.0f64..1000.0),
            stored in (-1000.0f64..1000.0, -1000.0f64..1000.0),
        ) {
            let f = CertificateFields {
                serial_instrument: Some("SN1".into()),
                min_range: Some(extracted.0),
                max_range: Some(extracted.1),
                ..fields("FIT-100-B")
            };
            let sibling = InstrumentRecord {
                tag: "FIT-100-A".into(),
                serial_instrument: Some("SN1".into()),
                serial_sensor: None,
                min_range: Some(Numeric::Value(stored.0)),
                max_range: Some(Numeric::Value(stored.1)),
            };
            // A same-tag record makes the range rule reachable; only the flag stops it.
            let mut ctx = ValidationContext::new(f, None, Some(sibling.clone()), Vec::new());
            let issues = run(&ReconConfig::without_whitelist(), &mut ctx).unwrap();
            prop_assert!(ctx.is_family_substitution);
            prop_assert!(issues.iter().all(|i| i.key != IssueKey::Range));

            let mut flagged = ValidationContext::new(ctx.fields.clone(), Some(sibling), None, Vec::new());
            flagged.is_family_substitution = true;
            prop_assert!(rules::range(&mut flagged, &ReconConfig::default()).is_none());
        }
    }
}
