use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConvertError;

static CELL_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t+| {2,}").unwrap());

/// A detected table: rows of cells, `None` for empty cells.
pub type Table = Vec<Vec<Option<String>>>;

/// Text and tables of a single-page report.
#[derive(Debug)]
pub struct PageText {
    pub text: String,
    pub tables: Vec<Table>,
}

/// Read a single-page PDF report into text plus detected tables.
pub fn read_report(bytes: &[u8]) -> Result<PageText, ConvertError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ConvertError::Document(e.to_string()))?;
    Ok(page_from_text(text))
}

/// Build a page from already-extracted text, detecting tables from cell
/// alignment: runs of lines whose cells are separated by tabs or two-or-more
/// spaces. A run must span at least two lines to count as a table.
pub fn page_from_text(text: String) -> PageText {
    let tables = detect_tables(&text);
    PageText { text, tables }
}

fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut current: Table = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        let cells: Vec<&str> = CELL_SPLIT_RE.split(trimmed).collect();
        if trimmed.is_empty() || cells.len() < 2 {
            flush(&mut tables, &mut current);
            continue;
        }
        current.push(
            cells
                .into_iter()
                .map(|c| {
                    let c = c.trim();
                    (!c.is_empty()).then(|| c.to_string())
                })
                .collect(),
        );
    }
    flush(&mut tables, &mut current);
    tables
}

fn flush(tables: &mut Vec<Table>, current: &mut Table) {
    if current.len() >= 2 {
        tables.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

// ── Tests ──
