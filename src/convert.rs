use std::io::Cursor;

use chrono::NaiveDate;
use tracing::info;
use umya_spreadsheet::Spreadsheet;

use crate::config::Registry;
use crate::document::{self, PageText};
use crate::error::ConvertError;
use crate::extract;
use crate::load;
use crate::transform::{self, FieldIssue, NormalizedRecord};

/// Result of a successful conversion.
pub struct ConversionOutcome {
    /// The mutated workbook, serialized.
    pub workbook: Vec<u8>,
    pub report_type: String,
    pub sampling_date: NaiveDate,
    /// Non-fatal field issues encountered while normalizing.
    pub issues: Vec<FieldIssue>,
}

/// Convert one report against one workbook, bytes in, bytes out. The
/// workbook is serialized only after the upsert succeeds; on any error the
/// caller's copy is untouched.
pub fn convert_report(
    registry: &Registry,
    report: &[u8],
    workbook: &[u8],
    load_target: &str,
) -> Result<ConversionOutcome, ConvertError> {
    let page = document::read_report(report)?;
    let mut book = read_workbook(workbook)?;
    let (record, issues) = apply_report(registry, &mut book, &page, load_target)?;
    Ok(ConversionOutcome {
        workbook: write_workbook(&book)?,
        report_type: record.report_type,
        sampling_date: record.sampling_date,
        issues,
    })
}

/// Run extract → normalize → upsert against an open workbook. The batch
/// entry point folds many reports into one document this way and saves once.
pub fn apply_report(
    registry: &Registry,
    book: &mut Spreadsheet,
    page: &PageText,
    load_target: &str,
) -> Result<(NormalizedRecord, Vec<FieldIssue>), ConvertError> {
    let extracted = extract::extract(registry, page)?;
    let (record, issues) = transform::normalize(registry, &extracted.report_type, &extracted)?;
    let row = load::upsert(registry, load_target, book, &record)?;
    info!(
        "wrote {} result(s) for {} at row {} ({})",
        record.results.len(),
        record.sampling_date,
        row,
        record.report_type
    );
    Ok((record, issues))
}

pub fn read_workbook(bytes: &[u8]) -> Result<Spreadsheet, ConvertError> {
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| ConvertError::Workbook(e.to_string()))
}

pub fn write_workbook(book: &Spreadsheet) -> Result<Vec<u8>, ConvertError> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| ConvertError::Workbook(e.to_string()))?;
    Ok(cursor.into_inner())
}

// ── Tests ──
