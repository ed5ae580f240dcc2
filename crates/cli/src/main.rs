// calcert - calibration certificate reconciliation (headless)

mod config;
mod exit_codes;
mod export;
mod input;
mod inspect;
mod process;
mod registry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use calcert_config::Settings;
use calcert_io::{ExportError, RenderError, SqliteRegistry};
use calcert_recon::{GatewayError, ReconConfig, ReconError};

use exit_codes::{
    EXIT_ERROR, EXIT_EXPORT, EXIT_IO, EXIT_PARSE, EXIT_REGISTRY, EXIT_REPORT_LOCKED, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "calcert")]
#[command(about = "Reconcile calibration certificates against the instrument registry")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Settings file (default: <config dir>/calcert/settings.json)
    #[arg(long, global = true, env = "CALCERT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile certificates, then render reports for those that are ready
    #[command(after_help = "\
Examples:
  calcert process cert-0412.pdf
  calcert process *.pdf --yes --xml-dir out/xml
  calcert process --text cert-0412.txt --no-report
  calcert process cert.pdf --registry /srv/instruments.db --out-dir reports/")]
    Process {
        /// Certificate PDFs, processed in order
        pdfs: Vec<PathBuf>,

        /// Pre-extracted certificate text (pdftotext -layout). Repeatable.
        #[arg(long, value_name = "FILE")]
        text: Vec<PathBuf>,

        /// Registry database (overrides registry.path)
        #[arg(long, value_name = "DB")]
        registry: Option<PathBuf>,

        /// Installation whitelist TOML (overrides installations.file)
        #[arg(long, value_name = "FILE")]
        installations: Option<PathBuf>,

        /// Report directory (overrides report.outputDir)
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Apply every proposed registry correction without asking
        #[arg(long, short = 'y')]
        yes: bool,

        /// Reconcile only; do not render reports
        #[arg(long)]
        no_report: bool,

        /// Also write the structured XML of each ready certificate here
        #[arg(long, value_name = "DIR")]
        xml_dir: Option<PathBuf>,

        /// Certificate of the RTD calibrated with the transmitter (TT export)
        #[arg(long, value_name = "N")]
        rtd_cert: Option<String>,
    },

    /// Show what was extracted from a certificate, and the issues it would raise
    #[command(after_help = "\
Examples:
  calcert inspect cert-0412.pdf
  calcert inspect --text cert-0412.txt --json
  calcert inspect cert-0412.pdf --registry /srv/instruments.db")]
    Inspect {
        /// Certificate PDF
        pdf: Option<PathBuf>,

        /// Pre-extracted certificate text
        #[arg(long, value_name = "FILE")]
        text: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,

        /// Registry to validate against (read only)
        #[arg(long, value_name = "DB")]
        registry: Option<PathBuf>,

        /// Installation whitelist TOML (overrides installations.file)
        #[arg(long, value_name = "FILE")]
        installations: Option<PathBuf>,
    },

    /// Write the structured XML of one certificate
    #[command(name = "export-xml")]
    #[command(after_help = "\
Examples:
  calcert export-xml cert-0412.pdf --out cert-0412.xml
  calcert export-xml --text cert.txt --out out/cert.xml --rtd-cert 25-ODS-0100")]
    ExportXml {
        /// Certificate PDF
        pdf: Option<PathBuf>,

        /// Pre-extracted certificate text
        #[arg(long, value_name = "FILE")]
        text: Option<PathBuf>,

        /// Output file (parent directories are created)
        #[arg(long, short = 'o', value_name = "FILE")]
        out: PathBuf,

        /// Certificate of the RTD calibrated with the transmitter (TT only)
        #[arg(long, value_name = "N")]
        rtd_cert: Option<String>,

        /// Installation whitelist TOML (overrides installations.file)
        #[arg(long, value_name = "FILE")]
        installations: Option<PathBuf>,
    },

    /// Consult or edit the instrument registry
    Registry {
        /// Registry database (overrides registry.path)
        #[arg(long, global = true, value_name = "DB")]
        registry: Option<PathBuf>,

        #[command(subcommand)]
        command: registry::RegistryCommands,
    },

    /// Locate, print or edit the settings file
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&config_path);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: calcert <command> [options]");
            eprintln!("       calcert --help for more information");
            Ok(())
        }
        Some(Commands::Process {
            pdfs,
            text,
            registry,
            installations,
            out_dir,
            yes,
            no_report,
            xml_dir,
            rtd_cert,
        }) => process::cmd_process(
            &settings,
            process::ProcessArgs {
                pdfs,
                texts: text,
                registry,
                installations,
                out_dir,
                yes,
                no_report,
                xml_dir,
                rtd_cert,
            },
        ),
        Some(Commands::Inspect { pdf, text, json, registry, installations }) => {
            inspect::cmd_inspect(&settings, pdf, text, json, registry, installations)
        }
        Some(Commands::ExportXml { pdf, text, out, rtd_cert, installations }) => {
            export::cmd_export_xml(&settings, pdf, text, out, rtd_cert, installations)
        }
        Some(Commands::Registry { registry, command }) => {
            registry::cmd_registry(&settings, registry, command)
        }
        Some(Commands::Config { command }) => config::cmd_config(&config_path, settings, command),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Open the registry named on the command line, else the configured one.
pub fn open_registry(settings: &Settings, flag: Option<PathBuf>) -> Result<SqliteRegistry, CliError> {
    let path = flag.unwrap_or_else(|| settings.registry_path.clone());
    log::debug!("registry: {}", path.display());
    SqliteRegistry::open(&path).map_err(|e| {
        CliError::from(e).with_hint(format!("registry path: {}", path.display()))
    })
}

/// Installation whitelist from the flag, else the configured file, else the
/// built-in list.
pub fn recon_config(settings: &Settings, flag: Option<PathBuf>) -> Result<ReconConfig, CliError> {
    let Some(path) = flag.or_else(|| settings.installations_file.clone()) else {
        return Ok(ReconConfig::default());
    };
    load_recon_config(&path)
}

fn load_recon_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
    ReconConfig::from_toml(&text)
        .map_err(|e| CliError::parse(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        Self { code: EXIT_REGISTRY, message: err.to_string(), hint: None }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingTag => Some("the certificate has no readable 'TAG:' line".to_string()),
            _ => None,
        };
        Self { code: EXIT_PARSE, message: err.to_string(), hint }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        let (code, hint) = match &err {
            RenderError::TargetLocked(_) => (
                EXIT_REPORT_LOCKED,
                Some("close the report in the program holding it and run again".to_string()),
            ),
            RenderError::ConverterMissing(_) => (
                EXIT_EXPORT,
                Some("install LibreOffice, or set \"report.convertToPdf\": false".to_string()),
            ),
            _ => (EXIT_EXPORT, None),
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        Self { code: EXIT_EXPORT, message: err.to_string(), hint: None }
    }
}
