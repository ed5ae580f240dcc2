//! Raw text and table extraction.
//!
//! Text comes from poppler's `pdftotext`: once in reading order (fed to the
//! field parser) and once with `-layout` (column-preserving, fed to table
//! detection). Pages are separated by form feeds in both outputs.

use std::path::Path;
use std::process::Command;

use crate::tables;

const PAGE_BREAK: char = '\x0c';

/// A detected table: rows of trimmed cell strings, header first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub text: String,
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Extract a PDF. Any failure is logged and yields an empty document.
    pub fn open(path: &Path) -> Self {
        let reading = match run_pdftotext(path, false) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("cannot extract text from {}: {e}", path.display());
                return Self::default();
            }
        };
        let layout = run_pdftotext(path, true).unwrap_or_else(|e| {
            log::warn!("cannot extract layout from {}: {e}", path.display());
            String::new()
        });

        let reading_pages = split_pages(&reading);
        let layout_pages = split_pages(&layout);
        let count = reading_pages.len().max(layout_pages.len());

        let pages = (0..count)
            .map(|i| Page {
                text: reading_pages.get(i).map(|p| normalize_text(p)).unwrap_or_default(),
                tables: layout_pages
                    .get(i)
                    .map(|p| tables::detect(p))
                    .unwrap_or_default(),
            })
            .collect();

        Self { pages }
    }

    /// Build a document from already-extracted text. The same text is used for
    /// field parsing and table detection.
    pub fn from_text(text: &str) -> Self {
        let pages = split_pages(text)
            .into_iter()
            .map(|page| Page {
                text: normalize_text(page),
                tables: tables::detect(page),
            })
            .collect();
        Self { pages }
    }

    /// Concatenated page text, one newline after each page.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            if !page.text.is_empty() {
                out.push_str(&page.text);
                out.push('\n');
            }
        }
        out.trim().to_string()
    }

    /// Tables in page order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.pages.iter().flat_map(|p| p.tables.iter())
    }
}

fn split_pages(text: &str) -> Vec<&str> {
    let mut pages: Vec<&str> = text.split(PAGE_BREAK).collect();
    while pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

fn normalize_text(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_string()
}

/// Run `pdftotext [-layout] <file> -` and capture stdout.
fn run_pdftotext(file: &Path, layout: bool) -> Result<String, String> {
    let bin = which::which("pdftotext")
        .map_err(|_| "pdftotext not installed (poppler-utils)".to_string())?;

    let mut cmd = Command::new(bin);
    if layout {
        cmd.arg("-layout");
    }
    let output = cmd
        .arg(file)
        .arg("-")
        .output()
        .map_err(|e| format!("failed to run pdftotext: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "pdftotext failed (exit {}): {}",
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
