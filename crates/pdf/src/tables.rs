//! Table detection over `pdftotext -layout` output.
//!
//! A table is a run of lines with at least three cells, where cells are
//! separated by two or more spaces. Column boundaries are the whitespace
//! "rivers" shared by the run's numeric rows, so empty cells keep their
//! position instead of shifting the row left.

use crate::extract::Table;

const MIN_CELLS: usize = 3;
const MIN_GAP: usize = 2;

/// Detect every table on one page of layout text, in top-to-bottom order.
pub fn detect(layout_text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut block: Vec<Vec<char>> = Vec::new();
    let mut blank_run = 0;

    for line in layout_text.lines() {
        let chars: Vec<char> = line.replace('\t', "    ").chars().collect();

        if chars.iter().all(|c| c.is_whitespace()) {
            blank_run += 1;
            if blank_run > 1 {
                flush(&mut block, &mut tables);
            }
            continue;
        }
        blank_run = 0;

        if chunks(&chars).len() >= MIN_CELLS {
            block.push(chars);
        } else {
            flush(&mut block, &mut tables);
        }
    }
    flush(&mut block, &mut tables);

    tables
}

fn flush(block: &mut Vec<Vec<char>>, tables: &mut Vec<Table>) {
    if block.len() >= 2 {
        let table = build_table(block);
        if !table.is_empty() {
            tables.push(table);
        }
    }
    block.clear();
}

/// Text runs of a line, split wherever at least `MIN_GAP` spaces occur.
/// Returns `(start, end)` char offsets, end exclusive.
fn chunks(line: &[char]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    let mut spaces = 0;

    for (i, c) in line.iter().enumerate() {
        if c.is_whitespace() {
            spaces += 1;
            if spaces >= MIN_GAP {
                if let Some(s) = start.take() {
                    out.push((s, i + 1 - spaces));
                }
            }
        } else {
            if start.is_none() {
                start = Some(i);
            }
            spaces = 0;
        }
    }
    if let Some(s) = start {
        out.push((s, line.len() - spaces));
    }
    out
}

fn is_numeric_row(line: &[char]) -> bool {
    chunks(line)
        .iter()
        .filter(|(s, e)| line[*s..*e].iter().any(|c| c.is_ascii_digit()))
        .count()
        >= 2
}

/// Column spans: maximal runs of positions occupied in some basis line,
/// broken by gaps of at least `MIN_GAP` free positions.
fn column_spans(basis: &[&Vec<char>]) -> Vec<(usize, usize)> {
    let width = basis.iter().map(|l| l.len()).max().unwrap_or(0);
    let mut occupied = vec![false; width];
    for line in basis {
        for (s, e) in chunks(line) {
            for slot in occupied.iter_mut().take(e).skip(s) {
                *slot = true;
            }
        }
    }

    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut free = 0;
    for (i, &occ) in occupied.iter().enumerate() {
        if occ {
            if start.is_none() {
                start = Some(i);
            }
            free = 0;
        } else if let Some(s) = start {
            free += 1;
            if free >= MIN_GAP {
                spans.push((s, i + 1 - free));
                start = None;
                free = 0;
            }
        }
    }
    if let Some(s) = start {
        spans.push((s, width - free));
    }
    spans
}

fn build_table(block: &[Vec<char>]) -> Table {
    let numeric: Vec<&Vec<char>> = block.iter().filter(|l| is_numeric_row(l)).collect();
    let basis: Vec<&Vec<char>> = if numeric.len() >= 2 {
        numeric
    } else {
        block.iter().collect()
    };
    let spans = column_spans(&basis);
    if spans.is_empty() {
        return Table::default();
    }

    let rows = block
        .iter()
        .map(|line| {
            let mut cells = vec![String::new(); spans.len()];
            for (s, e) in chunks(line) {
                let idx = best_span(&spans, s, e);
                let text: String = line[s..e].iter().collect();
                let cell = &mut cells[idx];
                if !cell.is_empty() {
                    cell.push(' ');
                }
                cell.push_str(text.trim());
            }
            cells
        })
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect();

    Table::new(rows)
}

/// Span with the largest overlap with `[s, e)`, or the nearest one.
fn best_span(spans: &[(usize, usize)], s: usize, e: usize) -> usize {
    let mut best = 0;
    let mut best_overlap = 0usize;
    let mut best_distance = usize::MAX;

    for (i, &(ss, se)) in spans.iter().enumerate() {
        let overlap = e.min(se).saturating_sub(s.max(ss));
        let distance = if e <= ss {
            ss - e
        } else if s >= se {
            s - se
        } else {
            0
        };
        if overlap > best_overlap || (best_overlap == 0 && overlap == 0 && distance < best_distance) {
            best = i;
            best_overlap = overlap;
            best_distance = distance;
        }
    }
    best
}
