//! Issue resolution: the caller-side loop that turns an issue list into a
//! "ready for report" decision.

use serde::Serialize;

use calcert_core::{CertificateFields, InstrumentRecord};

use crate::error::GatewayError;
use crate::gateway::RegistryGateway;
use crate::issue::{IssueKey, ValidationIssue};

/// Decides on issues as they are presented. Implemented by the front-end.
pub trait IssueHandler {
    /// Ask whether to apply the issue's remediation.
    fn confirm(&mut self, issue: &ValidationIssue) -> bool;

    /// Show an issue that has nothing to apply.
    fn warn(&mut self, issue: &ValidationIssue);
}

/// Accept every remediation; warnings are logged.
pub struct AcceptAll;

impl IssueHandler for AcceptAll {
    fn confirm(&mut self, _issue: &ValidationIssue) -> bool {
        true
    }

    fn warn(&mut self, issue: &ValidationIssue) {
        log::warn!("{}: {}", issue.title, issue.message);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Report generation may proceed.
    pub ready: bool,
    pub applied: Vec<IssueKey>,
    pub declined: Vec<IssueKey>,
    /// Blocking issue that ended iteration early.
    pub stopped_at: Option<IssueKey>,
}

/// Walk the issues in order.
///
/// A remediation is applied only after `confirm`. Declining clears `ready`;
/// declining a blocking issue, or meeting a blocking issue without a
/// remediation, also stops the walk.
pub fn resolve(
    issues: &[ValidationIssue],
    handler: &mut dyn IssueHandler,
    gateway: &mut dyn RegistryGateway,
    fields: &mut CertificateFields,
) -> Result<Resolution, GatewayError> {
    let mut resolution = Resolution {
        ready: true,
        ..Default::default()
    };

    for issue in issues {
        match &issue.action {
            Some(action) => {
                if handler.confirm(issue) {
                    action.apply(gateway, fields)?;
                    resolution.applied.push(issue.key);
                } else {
                    resolution.ready = false;
                    resolution.declined.push(issue.key);
                    if issue.blocking {
                        resolution.stopped_at = Some(issue.key);
                        break;
                    }
                }
            }
            None => {
                handler.warn(issue);
                if issue.blocking {
                    resolution.ready = false;
                    resolution.stopped_at = Some(issue.key);
                    break;
                }
            }
        }
    }

    Ok(resolution)
}

// ---------------------------------------------------------------------------
// Comparison summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonLine {
    pub label: &'static str,
    pub certificate: Option<String>,
    pub registry: Option<String>,
    pub matches: bool,
}

/// Certificate vs registry, field by field. The sensor line appears only when
/// the certificate has a sensor serial.
pub fn compare(fields: &CertificateFields, record: &InstrumentRecord) -> Vec<ComparisonLine> {
    let mut lines = vec![
        line("TAG", fields.tag.as_deref(), Some(record.tag.as_str())),
        line(
            "SN Instrumento",
            fields.serial_instrument.as_deref(),
            record.serial_instrument.as_deref(),
        ),
    ];
    if fields.serial_sensor.is_some() {
        lines.push(line(
            "SN Sensor",
            fields.serial_sensor.as_deref(),
            record.serial_sensor.as_deref(),
        ));
    }
    lines
}

fn line(label: &'static str, certificate: Option<&str>, registry: Option<&str>) -> ComparisonLine {
    ComparisonLine {
        label,
        certificate: certificate.map(String::from),
        registry: registry.map(String::from),
        matches: certificate == registry,
    }
}
