//! `calcert process`: the batch reconciliation loop.
//!
//! A worker thread extracts and parses certificates and posts each outcome
//! over a channel. The main thread owns the registry and stdin, and takes one
//! certificate through lookup, rules, remediation and rendering before it
//! receives the next, so no two reconciliations touch the registry at once.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use calcert_config::Settings;
use calcert_io::{render_report, ExportError, RenderOptions, SqliteRegistry};
use calcert_recon::{
    compare, resolve, IssueHandler, ReconConfig, RegistryGateway, ValidationContext,
    ValidationIssue,
};

use crate::exit_codes::EXIT_PENDING;
use crate::export::{reconciled_options, xml_file_name};
use crate::input::{self, Certificate, Source};
use crate::{open_registry, recon_config, CliError};

pub struct ProcessArgs {
    pub pdfs: Vec<PathBuf>,
    pub texts: Vec<PathBuf>,
    pub registry: Option<PathBuf>,
    pub installations: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub yes: bool,
    pub no_report: bool,
    pub xml_dir: Option<PathBuf>,
    pub rtd_cert: Option<String>,
}

// ---------------------------------------------------------------------------
// Console issue handler
// ---------------------------------------------------------------------------

/// Presents issues on stderr and reads y/N answers from `input`.
pub struct ConsolePrompt<R> {
    input: R,
    accept_all: bool,
}

impl<R: BufRead> ConsolePrompt<R> {
    pub fn new(input: R, accept_all: bool) -> Self {
        Self { input, accept_all }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim")
}

impl<R: BufRead> IssueHandler for ConsolePrompt<R> {
    fn confirm(&mut self, issue: &ValidationIssue) -> bool {
        eprintln!();
        eprintln!("{}", issue.title);
        eprintln!("  {}", issue.message);
        if let Some(action) = &issue.action {
            eprintln!("  -> {}", action.describe());
        }
        if self.accept_all {
            eprintln!("  applied (--yes)");
            return true;
        }

        eprint!("Apply? [y/N] ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                eprintln!();
                false
            }
            Ok(_) => is_yes(&line),
        }
    }

    fn warn(&mut self, issue: &ValidationIssue) {
        eprintln!("warning: {}: {}", issue.title, issue.message);
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Batch {
    ready: usize,
    pending: usize,
    failed: usize,
    first_error: Option<CliError>,
}

impl Batch {
    fn fail(&mut self, source: &std::path::Path, err: CliError) {
        eprintln!("error: {}: {}", source.display(), err.message);
        if let Some(hint) = &err.hint {
            eprintln!("hint:  {}", hint);
        }
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }
}

pub fn cmd_process(settings: &Settings, args: ProcessArgs) -> Result<(), CliError> {
    let sources = input::sources(args.pdfs, args.texts)?;
    let config = recon_config(settings, args.installations)?;
    let mut registry = open_registry(settings, args.registry)?;
    let render = RenderOptions {
        output_dir: args.out_dir.or_else(|| settings.report_output_dir.clone()),
        office_command: settings.office_command.clone(),
        convert_to_pdf: settings.convert_to_pdf,
    };
    let xml_dir = args.xml_dir.or_else(|| settings.xml_dir.clone());

    let total = sources.len();
    let (tx, rx) = mpsc::channel::<(Source, Result<Certificate, CliError>)>();
    let worker = thread::spawn(move || {
        for source in sources {
            let loaded = input::load(&source);
            if tx.send((source, loaded)).is_err() {
                break;
            }
        }
    });

    let stdin = io::stdin();
    let mut prompt = ConsolePrompt::new(stdin.lock(), args.yes);
    let mut batch = Batch::default();

    for (index, (source, loaded)) in rx.into_iter().enumerate() {
        eprintln!("[{}/{}] {}", index + 1, total, source.path().display());
        let cert = match loaded {
            Ok(cert) => cert,
            Err(err) => {
                batch.fail(source.path(), err);
                continue;
            }
        };

        let source = cert.source.clone();
        let Some(ctx) = reconcile(&config, &mut registry, &mut prompt, &mut batch, cert)? else {
            continue;
        };

        if !args.no_report {
            let report = render_report(&ctx.fields, &source, &render)?;
            println!("report: {} ({})", report.path.display(), report.family);
        }
        if let Some(dir) = &xml_dir {
            let out = dir.join(xml_file_name(&ctx.fields));
            let options = reconciled_options(&ctx, args.rtd_cert.clone());
            match calcert_io::export_xml(&ctx.fields, &ctx.points, &out, &options) {
                Ok(path) => println!("xml: {}", path.display()),
                Err(ExportError::NoPoints) => {
                    eprintln!("warning: no calibration points found; XML not written");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    if worker.join().is_err() {
        return Err(CliError::general("certificate extraction thread panicked"));
    }

    eprintln!(
        "{} certificate(s): {} ready, {} pending, {} failed",
        total, batch.ready, batch.pending, batch.failed
    );

    if let Some(err) = batch.first_error {
        return Err(CliError { message: String::new(), hint: None, ..err });
    }
    if batch.pending > 0 {
        return Err(CliError {
            code: EXIT_PENDING,
            message: format!(
                "{} certificate(s) with unresolved divergences; report not generated",
                batch.pending
            ),
            hint: None,
        });
    }
    Ok(())
}

/// One certificate through lookup, rules and resolution. Returns the context,
/// with its final fields, when the report may be generated.
fn reconcile(
    config: &ReconConfig,
    registry: &mut SqliteRegistry,
    handler: &mut dyn IssueHandler,
    batch: &mut Batch,
    cert: Certificate,
) -> Result<Option<ValidationContext>, CliError> {
    let source = cert.source.clone();
    let mut ctx = ValidationContext::lookup(cert.fields, cert.points, &*registry)?;
    let issues = match calcert_recon::run(config, &mut ctx) {
        Ok(issues) => issues,
        Err(err) => {
            batch.fail(&source, err.into());
            return Ok(None);
        }
    };

    let resolution = resolve(&issues, handler, registry, &mut ctx.fields)?;

    if let Some(tag) = ctx.tag() {
        if let Some(record) = registry.find_by_tag(tag)? {
            println!("{}", tag);
            for line in compare(&ctx.fields, &record) {
                println!(
                    "  {:<16} {:<20} {:<20} {}",
                    line.label,
                    line.certificate.as_deref().unwrap_or("-"),
                    line.registry.as_deref().unwrap_or("-"),
                    if line.matches { "ok" } else { "DIFF" }
                );
            }
        }
    }

    if !resolution.ready {
        match resolution.stopped_at {
            Some(key) => eprintln!("pending: stopped at '{key}'; report not generated"),
            None => eprintln!("pending: corrections declined; report not generated"),
        }
        batch.pending += 1;
        return Ok(None);
    }

    batch.ready += 1;
    Ok(Some(ctx))
}
