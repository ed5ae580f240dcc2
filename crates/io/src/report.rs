//! Critical-analysis report ("AC") rendering.
//!
//! The sheet is built with `rust_xlsxwriter` and converted to PDF by a
//! headless office suite. The family tag returned with the output path is
//! derived from the instrument tag; nothing is kept between calls.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use thiserror::Error;

use calcert_core::{CertificateFields, FamilyType};

const DATE_FORMAT: &str = "%d/%m/%Y";
const LOCATION_WRAP: usize = 28;
const SHEET_NAME: &str = "Template Formulário";

#[derive(Debug, Error)]
pub enum RenderError {
    /// The target exists and is held open by another program.
    #[error("report file is open elsewhere and cannot be overwritten: {}", .0.display())]
    TargetLocked(PathBuf),
    #[error("office converter '{0}' not found on PATH")]
    ConverterMissing(String),
    #[error("PDF conversion failed: {0}")]
    Conversion(String),
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn xlsx(e: XlsxError) -> RenderError {
    RenderError::Workbook(e.to_string())
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Defaults to the certificate's directory.
    pub output_dir: Option<PathBuf>,
    pub office_command: String,
    /// When false the `.xlsx` itself is the report.
    pub convert_to_pdf: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            office_command: "soffice".to_string(),
            convert_to_pdf: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub path: PathBuf,
    pub family: FamilyType,
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Report wording family, from the tag's prefix/suffix/infix.
pub fn report_family(tag: &str) -> FamilyType {
    let tag = tag.trim().to_uppercase();
    let marked = |codes: &[&str]| {
        codes.iter().any(|code| {
            tag.starts_with(code)
                || tag.ends_with(&format!("-{code}"))
                || tag.contains(&format!("-{code}-"))
        })
    };

    if marked(&["TE"]) {
        FamilyType::TE
    } else if marked(&["TT", "TIT", "TI"]) {
        FamilyType::TT
    } else if marked(&["PT", "PIT"]) {
        FamilyType::PT
    } else {
        FamilyType::DPT
    }
}

pub fn report_title(family: FamilyType) -> &'static str {
    match family {
        FamilyType::TE | FamilyType::TT => "Análise Crítica de Calibração dos Sensores de Temperatura",
        FamilyType::PT => "Análise Crítica de Calibração dos Transmissores de Pressão",
        FamilyType::DPT => {
            "Análise Crítica de Calibração dos Transmissores de Pressão Diferencial"
        }
    }
}

/// Next day, pushed past the weekend.
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let next = date + Duration::days(1);
    match next.weekday() {
        Weekday::Sat => next + Duration::days(2),
        Weekday::Sun => next + Duration::days(1),
        _ => next,
    }
}

/// Break a long location at the first space from column 28 on.
pub fn wrap_location(location: &str) -> String {
    let location = location.trim();
    if location.chars().count() <= LOCATION_WRAP {
        return location.to_string();
    }
    let split = location
        .char_indices()
        .skip(LOCATION_WRAP)
        .find(|(_, c)| *c == ' ')
        .map(|(i, _)| i);
    match split {
        Some(i) => format!("{}\n{}", &location[..i], &location[i + 1..]),
        None => location.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    RangeUpdated,
    SerialUpdated,
    Unchanged,
}

impl Observation {
    fn from_fields(fields: &CertificateFields) -> Self {
        if fields.range_updated {
            Self::RangeUpdated
        } else if fields.serial_updated {
            Self::SerialUpdated
        } else {
            Self::Unchanged
        }
    }

    fn header(&self) -> &'static str {
        match self {
            Self::Unchanged => "(  ) Sim ( X ) Não\nOBSERVAÇÕES:\n",
            _ => "( X ) Sim (  ) Não\nOBSERVAÇÕES:\n",
        }
    }

    fn note(&self) -> Option<&'static str> {
        match self {
            Self::RangeUpdated => Some("Novo range e alarmes alterados no computador de vazão\n"),
            Self::SerialUpdated => Some("Novo NS alterado no computador de vazão / XML / SFP\n"),
            Self::Unchanged => None,
        }
    }
}

/// Values placed on the sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContent {
    pub family: FamilyType,
    pub tag: String,
    pub certificate: String,
    pub calibration_date: String,
    pub system_description: String,
    pub location: String,
    /// Report date plus one business day.
    pub issue_date: Option<String>,
    pub observation: Observation,
}

impl ReportContent {
    pub fn from_fields(fields: &CertificateFields) -> Self {
        let tag = fields.tag.clone().unwrap_or_default();
        let issue_date = fields.report_date.as_deref().and_then(|raw| {
            match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
                Ok(date) => Some(next_business_day(date).format(DATE_FORMAT).to_string()),
                Err(e) => {
                    log::warn!("report date '{raw}' not understood: {e}");
                    None
                }
            }
        });

        Self {
            family: report_family(&tag),
            certificate: fields.certificate_number.clone().unwrap_or_default(),
            calibration_date: fields.calibration_date.clone().unwrap_or_default(),
            system_description: fields.system_description.clone().unwrap_or_default(),
            location: wrap_location(fields.location.as_deref().unwrap_or_default()),
            observation: Observation::from_fields(fields),
            issue_date,
            tag,
        }
    }

    /// `<certificate>_<tag>_AC`, spaces removed.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_AC",
            self.certificate.replace(' ', ""),
            self.tag.replace(' ', "")
        )
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render_report(
    fields: &CertificateFields,
    source: &Path,
    options: &RenderOptions,
) -> Result<RenderedReport, RenderError> {
    let content = ReportContent::from_fields(fields);
    let dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&dir).map_err(|source| RenderError::Io {
        path: dir.clone(),
        source,
    })?;

    let stem = content.file_stem();
    let workbook_path = dir.join(format!("{stem}.xlsx"));
    let target = if options.convert_to_pdf {
        dir.join(format!("{stem}.pdf"))
    } else {
        workbook_path.clone()
    };

    clear_target(&target)?;
    write_workbook(&content, &workbook_path)?;

    if options.convert_to_pdf {
        convert_to_pdf(&options.office_command, &workbook_path, &dir)?;
        if !target.exists() {
            return Err(RenderError::Conversion(format!(
                "converter finished but {} was not produced",
                target.display()
            )));
        }
        if let Err(e) = std::fs::remove_file(&workbook_path) {
            log::warn!("cannot remove intermediate {}: {e}", workbook_path.display());
        }
    }

    log::debug!("rendered {} report {}", content.family, target.display());
    Ok(RenderedReport {
        path: target,
        family: content.family,
    })
}

/// Remove a previous report; a file held open elsewhere is `TargetLocked`.
fn clear_target(target: &Path) -> Result<(), RenderError> {
    if !target.exists() {
        return Ok(());
    }
    std::fs::remove_file(target).map_err(|source| {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            RenderError::TargetLocked(target.to_path_buf())
        } else {
            RenderError::Io {
                path: target.to_path_buf(),
                source,
            }
        }
    })
}

fn write_workbook(content: &ReportContent, path: &Path) -> Result<(), RenderError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME).map_err(xlsx)?;
    worksheet
        .set_portrait()
        .set_print_fit_to_pages(1, 1)
        .set_margins(0.3, 0.3, 0.3, 0.3, 0.3, 0.3);

    let title = Format::new().set_bold().set_font_size(14).set_align(FormatAlign::Center);
    let label = Format::new().set_bold();
    let wrapped = Format::new().set_text_wrap().set_align(FormatAlign::Top);
    let bold = Format::new().set_bold();
    let plain = Format::new();

    worksheet
        .merge_range(1, 1, 1, 7, report_title(content.family), &title)
        .map_err(xlsx)?;

    worksheet.set_column_width(1, 16).map_err(xlsx)?;
    worksheet.set_column_width(2, 22).map_err(xlsx)?;
    worksheet.set_column_width(4, 14).map_err(xlsx)?;
    worksheet.set_column_width(5, 24).map_err(xlsx)?;

    worksheet.write_string_with_format(6, 1, "Local:", &label).map_err(xlsx)?;
    worksheet
        .write_string_with_format(6, 2, &content.location, &wrapped)
        .map_err(xlsx)?;
    let lines = content.location.lines().count().max(1);
    worksheet.set_row_height(6, 15 * lines as u32).map_err(xlsx)?;

    worksheet.write_string_with_format(6, 4, "TAG:", &label).map_err(xlsx)?;
    worksheet.write_string(6, 5, &content.tag).map_err(xlsx)?;
    worksheet.write_string_with_format(7, 1, "Sistema:", &label).map_err(xlsx)?;
    worksheet.write_string(7, 2, &content.system_description).map_err(xlsx)?;
    worksheet.write_string_with_format(7, 4, "Certificado:", &label).map_err(xlsx)?;
    worksheet.write_string(7, 5, &content.certificate).map_err(xlsx)?;
    worksheet.write_string_with_format(8, 1, "Data:", &label).map_err(xlsx)?;
    worksheet.write_string(8, 2, &content.calibration_date).map_err(xlsx)?;

    let header = content.observation.header();
    match content.observation.note() {
        Some(note) => {
            worksheet
                .write_rich_string_with_format(34, 1, &[(&plain, header), (&bold, note)], &wrapped)
                .map_err(xlsx)?;
        }
        None => {
            worksheet
                .write_string_with_format(34, 1, header, &wrapped)
                .map_err(xlsx)?;
        }
    }

    if let Some(date) = &content.issue_date {
        worksheet.write_string_with_format(39, 6, "Data:", &label).map_err(xlsx)?;
        worksheet.write_string(39, 7, date).map_err(xlsx)?;
    }

    workbook.save(path).map_err(xlsx)
}

fn convert_to_pdf(command: &str, workbook: &Path, out_dir: &Path) -> Result<(), RenderError> {
    let bin = which::which(command).map_err(|_| RenderError::ConverterMissing(command.to_string()))?;
    let output = Command::new(bin)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(out_dir)
        .arg(workbook)
        .output()
        .map_err(|e| RenderError::Conversion(format!("failed to run {command}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RenderError::Conversion(format!(
            "{command} exited with {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }
    Ok(())
}
