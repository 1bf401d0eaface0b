use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::warn;

use crate::config::Registry;
use crate::error::ConvertError;
use crate::extract::ExtractedReport;

/// The table every normalize config reads results from.
pub const RESULTS_TABLE: &str = "results";

const TEST_NAME_COLUMN: &str = "testName";
const RESULT_COLUMN: &str = "result";

/// A result value: numeric when coercion succeeded, otherwise the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Number(f64),
    Text(String),
}

/// A report normalized to canonical field keys and a calendar date.
#[derive(Debug)]
pub struct NormalizedRecord {
    pub report_type: String,
    pub sampling_date: NaiveDate,
    pub results: BTreeMap<String, ResultValue>,
}

/// Non-fatal per-row issues; the record still flows through with them.
#[derive(Debug, PartialEq)]
pub enum FieldIssue {
    UnmappedTest(String),
    NotNumeric { test: String, value: String },
}

/// Map raw test names to canonical keys and coerce results to numbers.
pub fn normalize(
    registry: &Registry,
    name: &str,
    extracted: &ExtractedReport,
) -> Result<(NormalizedRecord, Vec<FieldIssue>), ConvertError> {
    let config = registry
        .normalize_config(name)
        .ok_or_else(|| ConvertError::ConfigNotFound {
            stage: "normalize",
            name: name.to_string(),
        })?;

    let raw_date = extracted
        .sampling_date
        .as_deref()
        .ok_or(ConvertError::MissingSamplingDate)?;
    let rows = extracted
        .tables
        .get(RESULTS_TABLE)
        .ok_or(ConvertError::MissingResultsTable)?;

    let sampling_date =
        NaiveDate::parse_from_str(raw_date, &config.date_format).map_err(|_| {
            ConvertError::InvalidDateFormat {
                value: raw_date.to_string(),
                format: config.date_format.clone(),
            }
        })?;

    let mut results = BTreeMap::new();
    let mut issues = Vec::new();

    for row in rows {
        let Some(Some(test_name)) = row.get(TEST_NAME_COLUMN) else {
            continue;
        };
        let Some(key) = config.result_field_map.get(test_name) else {
            warn!("test '{}' has no canonical field, skipping", test_name);
            issues.push(FieldIssue::UnmappedTest(test_name.clone()));
            continue;
        };
        let raw = row
            .get(RESULT_COLUMN)
            .and_then(|c| c.clone())
            .unwrap_or_default();
        match raw.trim().parse::<f64>() {
            Ok(value) => {
                results.insert(key.clone(), ResultValue::Number(value));
            }
            Err(_) => {
                warn!("result for '{}' is not numeric: '{}'", test_name, raw);
                issues.push(FieldIssue::NotNumeric {
                    test: test_name.clone(),
                    value: raw.clone(),
                });
                results.insert(key.clone(), ResultValue::Text(raw));
            }
        }
    }

    Ok((
        NormalizedRecord {
            report_type: extracted.report_type.clone(),
            sampling_date,
            results,
        },
        issues,
    ))
}

// ── Tests ──
