use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::Regex;
use tracing::info;
use unicode_bidi::BidiInfo;

use crate::config::{ExtractConfig, Registry, TableSpec};
use crate::document::{PageText, Table};
use crate::error::ConvertError;

/// Rows of a named table, keyed by configured column name.
pub type TableRows = Vec<BTreeMap<String, Option<String>>>;

/// Raw extraction result: validated-but-unparsed sampling date, the matched
/// config's name as the record type, and the configured tables.
#[derive(Debug)]
pub struct ExtractedReport {
    pub report_type: String,
    pub sampling_date: Option<String>,
    pub tables: BTreeMap<String, TableRows>,
}

/// Extract a report from page text and tables using the first matching config.
pub fn extract(registry: &Registry, page: &PageText) -> Result<ExtractedReport, ConvertError> {
    let text = display_order(&page.text);
    let (name, config) = find_matching_config(registry, &text)?;
    info!("using extract config '{}'", name);

    let sampling_date = extract_sampling_date(config, &text)?;
    let tables = extract_tables(config, &page.tables)?;

    Ok(ExtractedReport {
        report_type: name.to_string(),
        sampling_date: Some(sampling_date),
        tables,
    })
}

/// Reorder bidirectional text runs into visual order. Lab reports interleave
/// left-to-right test names with right-to-left script; matching and storage
/// both work on the visual form.
pub fn display_order(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    let bidi = BidiInfo::new(text, None);
    let mut out = String::with_capacity(text.len());
    for para in &bidi.paragraphs {
        out.push_str(&bidi.reorder_line(para, para.range.clone()));
    }
    out
}

fn find_matching_config<'a>(
    registry: &'a Registry,
    text: &str,
) -> Result<(&'a String, &'a ExtractConfig), ConvertError> {
    for (name, config) in registry.extract_configs() {
        let pattern = compile(name, &config.match_pattern)?;
        if pattern.is_match(text) {
            return Ok((name, config));
        }
    }
    Err(ConvertError::NoMatchingExtractConfig)
}

fn extract_sampling_date(config: &ExtractConfig, text: &str) -> Result<String, ConvertError> {
    let pattern = compile("dateExtractionPattern", &config.date_extraction_pattern)?;
    let raw = pattern
        .captures(text)
        .and_then(|caps| caps.name("date"))
        .ok_or(ConvertError::DateNotFound)?
        .as_str();

    // Validate now; the raw string is re-parsed downstream with the
    // normalize config's own format.
    NaiveDate::parse_from_str(raw, &config.date_format).map_err(|_| {
        ConvertError::InvalidDateFormat {
            value: raw.to_string(),
            format: config.date_format.clone(),
        }
    })?;
    Ok(raw.to_string())
}

fn extract_tables(
    config: &ExtractConfig,
    page_tables: &[Table],
) -> Result<BTreeMap<String, TableRows>, ConvertError> {
    let mut tables = BTreeMap::new();
    for spec in &config.tables {
        let table = page_tables.get(spec.table_index).ok_or_else(|| {
            ConvertError::ColumnSchemaMismatch {
                table: spec.name.clone(),
                detail: format!("document has no table at index {}", spec.table_index),
            }
        })?;
        let data = table.get(spec.header_row_count..).unwrap_or(&[]);
        if data.is_empty() {
            // Tables declared after an empty one are not processed.
            tables.insert(spec.name.clone(), Vec::new());
            break;
        }
        tables.insert(spec.name.clone(), map_rows(spec, data)?);
    }
    Ok(tables)
}

fn map_rows(spec: &TableSpec, data: &[Vec<Option<String>>]) -> Result<TableRows, ConvertError> {
    let width = data[0].len();
    let columns = spec.columns.resolve(width).ok_or_else(|| {
        ConvertError::ColumnSchemaMismatch {
            table: spec.name.clone(),
            detail: format!("no column schema for {width}-column rows"),
        }
    })?;

    let mut rows = Vec::with_capacity(data.len());
    for raw_row in data {
        let mut row = BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            let cell = raw_row
                .get(i)
                .and_then(|c| c.as_deref())
                .map(display_order);
            row.insert(column.clone(), cell);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn compile(name: &str, pattern: &str) -> Result<Regex, ConvertError> {
    Regex::new(pattern).map_err(|e| ConvertError::Config {
        name: name.to_string(),
        message: e.to_string(),
    })
}

// ── Tests ──
