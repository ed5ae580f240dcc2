//! `calcert inspect`: extraction results, and the issues a registry would raise.
//! Nothing is written to the registry.

use std::path::PathBuf;

use serde::Serialize;

use calcert_config::Settings;
use calcert_recon::{ValidationContext, ValidationIssue};

use crate::input::{self, single_source, Certificate};
use crate::{open_registry, recon_config, CliError};

#[derive(Serialize)]
struct InspectOutput<'a> {
    #[serde(flatten)]
    certificate: &'a Certificate,
    installation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<ValidationIssue>>,
}

pub fn cmd_inspect(
    settings: &Settings,
    pdf: Option<PathBuf>,
    text: Option<PathBuf>,
    json: bool,
    registry: Option<PathBuf>,
    installations: Option<PathBuf>,
) -> Result<(), CliError> {
    let source = single_source(pdf, text)?;
    let config = recon_config(settings, installations)?;
    let cert = input::load(&source)?;

    let installation = cert
        .fields
        .location
        .as_deref()
        .and_then(|loc| config.identify(loc))
        .map(|rule| rule.name.clone());

    let issues = match registry {
        Some(path) => {
            let registry = open_registry(settings, Some(path))?;
            let mut ctx =
                ValidationContext::lookup(cert.fields.clone(), cert.points.clone(), &registry)?;
            Some(calcert_recon::run(&config, &mut ctx)?)
        }
        None => None,
    };

    let output = InspectOutput {
        certificate: &cert,
        installation,
        issues,
    };

    if json {
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization failed: {e}")))?;
        println!("{text}");
    } else {
        print_human(&output);
    }
    Ok(())
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_human(output: &InspectOutput<'_>) {
    let cert = output.certificate;
    let f = &cert.fields;

    println!("{}", cert.source.display());
    println!("  tag:               {}", opt(f.tag.as_deref()));
    println!("  family:            {}", opt(cert.family));
    println!("  certificate:       {}", opt(f.certificate_number.as_deref()));
    println!("  calibration date:  {}", opt(f.calibration_date.as_deref()));
    println!("  report date:       {}", opt(f.report_date.as_deref()));
    println!("  serial:            {}", opt(f.serial_instrument.as_deref()));
    println!("  sensor serial:     {}", opt(f.serial_sensor.as_deref()));
    println!("  location:          {}", opt(f.location.as_deref()));
    println!("  installation:      {}", opt(output.installation.as_deref()));
    println!("  system:            {}", opt(f.system_description.as_deref()));
    println!("  range:             {} .. {}", opt(f.min_range), opt(f.max_range));
    println!(
        "  indicated range:   {} .. {}",
        opt(f.indicated_min_range),
        opt(f.indicated_max_range)
    );
    if f.rod_length.is_some() || f.probe_diameter.is_some() {
        println!("  rod length:        {}", opt(f.rod_length.as_ref()));
        println!("  probe diameter:    {}", opt(f.probe_diameter.as_ref()));
    }
    println!("  fiducial error %:  {}", opt(f.fiducial_error));
    println!("  uncertainty %:     {}", opt(f.uncertainty));
    if let Some(curve) = cert.curve {
        println!(
            "  curve:             reading = {} + {} * value",
            curve.intercept, curve.slope
        );
    }

    println!();
    if cert.points.is_empty() {
        println!("no calibration points");
    } else {
        println!(
            "  {:>12} {:>12} {:>10} {:>10} {:>6}",
            "reference", "mean", "deviation", "unc", "k"
        );
        for p in &cert.points {
            println!(
                "  {:>12} {:>12} {:>10} {:>10} {:>6}",
                p.reference,
                opt(p.measured_mean),
                opt(p.deviation),
                opt(p.uncertainty),
                opt(p.coverage_factor_k)
            );
        }
    }

    if let Some(issues) = &output.issues {
        println!();
        if issues.is_empty() {
            println!("no issues");
        }
        for issue in issues {
            let marker = if issue.blocking { "blocking" } else { "warning" };
            println!("[{marker}] {} ({})", issue.title, issue.key);
            println!("    {}", issue.message);
            if let Some(action) = &issue.action {
                println!("    -> {}", action.describe());
            }
        }
    }
}
