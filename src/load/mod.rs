pub mod cells;
pub mod rows;
pub mod search;

use chrono::NaiveDate;
use tracing::{debug, info};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::config::{Registry, SheetSpec};
use crate::error::ConvertError;
use crate::transform::{NormalizedRecord, ResultValue};
use self::search::RowLookup;

/// Upsert a normalized record into the workbook governed by `config_name`:
/// locate or create the row for the record's date, keeping the date column
/// gap-free at day granularity, then write the schema-mapped result values.
/// Returns the row that was written.
pub fn upsert(
    registry: &Registry,
    config_name: &str,
    book: &mut Spreadsheet,
    record: &NormalizedRecord,
) -> Result<u32, ConvertError> {
    let config = registry
        .load_config(config_name)
        .ok_or_else(|| ConvertError::ConfigNotFound {
            stage: "load",
            name: config_name.to_string(),
        })?;
    let spec = config.sheets.get(&record.report_type).ok_or_else(|| {
        ConvertError::SheetNotFound(format!(
            "no sheet configured for report type '{}'",
            record.report_type
        ))
    })?;
    let ws = book
        .get_sheet_by_name_mut(&spec.sheet_name)
        .ok_or_else(|| ConvertError::SheetNotFound(spec.sheet_name.clone()))?;

    let date_column = date_column(spec)?;
    let row = locate_or_create_row(ws, spec, date_column, record.sampling_date)?;
    write_fields(ws, spec, row, record)?;
    Ok(row)
}

/// The sheet's date column: the `date` field entry, defaulting to column A.
fn date_column(spec: &SheetSpec) -> Result<u32, ConvertError> {
    match spec.fields.get("date") {
        Some(field) => {
            cells::column_index(&field.column).ok_or_else(|| ConvertError::Config {
                name: spec.sheet_name.clone(),
                message: format!("bad column letter '{}'", field.column),
            })
        }
        None => Ok(1),
    }
}

fn locate_or_create_row(
    ws: &mut Worksheet,
    spec: &SheetSpec,
    date_column: u32,
    target: NaiveDate,
) -> Result<u32, ConvertError> {
    let first_data_row = spec.header_row_count + 1;
    let max_date_row = max_date_row(ws, date_column, first_data_row)
        .ok_or_else(|| ConvertError::NoDateRowsFound(spec.sheet_name.clone()))?;

    let lookup = search::find_date_row(target, first_data_row, max_date_row, |row| {
        cell_date(ws, date_column, row)
    });
    match lookup {
        RowLookup::Found(row) => {
            debug!("date {} already at row {}", target, row);
            Ok(row)
        }
        RowLookup::Missing(point) => {
            let plan = search::plan_gap_fill(target, &point);
            let template = rows::template_row_for(spec.header_row_count, max_date_row);
            info!(
                "inserting {} day row(s) at row {} of '{}'",
                plan.rows, plan.insert_at, spec.sheet_name
            );
            rows::synthesize_rows(ws, plan.insert_at, plan.rows, template);
            for (i, date) in plan.dates().enumerate() {
                ws.get_cell_mut((date_column, plan.insert_at + i as u32))
                    .set_value_number(cells::serial_from_date(date));
            }
            Ok(plan.target_row())
        }
    }
}

/// Last row whose date cell holds a valid date, scanning backward past
/// trailing summary/footer rows. Non-date rows, if any, sit contiguously at
/// the end of the sheet.
fn max_date_row(ws: &Worksheet, date_column: u32, first_data_row: u32) -> Option<u32> {
    let mut row = ws.get_highest_row();
    while row >= first_data_row {
        if cell_date(ws, date_column, row).is_some() {
            return Some(row);
        }
        row -= 1;
    }
    None
}

fn cell_date(ws: &Worksheet, column: u32, row: u32) -> Option<NaiveDate> {
    let cell = ws.get_cell((column, row))?;
    cells::parse_cell_date(&cell.get_value())
}

/// Write every schema-mapped field present in the record into its column.
/// Record entries without a mapped column are ignored; mapped fields missing
/// from the record leave their cells untouched.
fn write_fields(
    ws: &mut Worksheet,
    spec: &SheetSpec,
    row: u32,
    record: &NormalizedRecord,
) -> Result<(), ConvertError> {
    for (field, field_spec) in &spec.fields {
        let Some(value) = record.results.get(field) else {
            continue;
        };
        let column = cells::column_index(&field_spec.column).ok_or_else(|| {
            ConvertError::Config {
                name: spec.sheet_name.clone(),
                message: format!("bad column letter '{}'", field_spec.column),
            }
        })?;
        match value {
            ResultValue::Number(n) => {
                ws.get_cell_mut((column, row)).set_value_number(*n);
            }
            ResultValue::Text(s) => {
                ws.get_cell_mut((column, row)).set_value(s.as_str());
            }
        }
    }
    Ok(())
}

// ── Tests ──
