use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConvertError;

/// Extraction config for one lab's report format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConfig {
    /// Pattern that identifies this lab's reports in the page text.
    pub match_pattern: String,
    /// Pattern with a `(?P<date>...)` capture for the sampling date.
    pub date_extraction_pattern: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

/// One table to pull out of the page, in declared order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub name: String,
    /// Index into the page's detected tables.
    pub table_index: usize,
    #[serde(default)]
    pub header_row_count: usize,
    pub columns: ColumnsByCount,
}

/// Column names for a table's data rows. Either a single list (shorthand,
/// keyed by its own length) or an explicit map from column count to list,
/// for labs that emit the same table at more than one width.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnsByCount {
    Single(Vec<String>),
    ByWidth(BTreeMap<String, Vec<String>>),
}

impl ColumnsByCount {
    /// Resolve the column list for rows of `width` cells.
    pub fn resolve(&self, width: usize) -> Option<&[String]> {
        match self {
            ColumnsByCount::Single(cols) if cols.len() == width => Some(cols),
            ColumnsByCount::Single(_) => None,
            ColumnsByCount::ByWidth(map) => map.get(&width.to_string()).map(Vec::as_slice),
        }
    }
}

/// Normalization config: raw test names to canonical field keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeConfig {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    pub result_field_map: BTreeMap<String, String>,
}

/// Loading config for one tracking workbook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfig {
    /// Record type → sheet to update.
    pub sheets: BTreeMap<String, SheetSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSpec {
    pub sheet_name: String,
    #[serde(default)]
    pub header_row_count: u32,
    /// Canonical field key → column. The `date` entry doubles as the sheet's
    /// date column; without one the date column defaults to A.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub column: String,
}

fn default_date_format() -> String {
    "%d/%m/%y".to_string()
}

/// All configuration documents, loaded once at startup and immutable after.
#[derive(Debug, Default)]
pub struct Registry {
    extract: BTreeMap<String, ExtractConfig>,
    normalize: BTreeMap<String, NormalizeConfig>,
    load: BTreeMap<String, LoadConfig>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Load every config document under `dir`: `extract/*.json`,
    /// `normalize/*.json` and `load/*.json`, keyed by file stem.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let dir = dir.as_ref();
        let mut registry = Registry::new();
        for (name, config) in read_stage::<ExtractConfig>(&dir.join("extract"))? {
            registry.add_extract(name, config);
        }
        for (name, config) in read_stage::<NormalizeConfig>(&dir.join("normalize"))? {
            registry.add_normalize(name, config);
        }
        for (name, config) in read_stage::<LoadConfig>(&dir.join("load"))? {
            registry.add_load(name, config);
        }
        info!(
            "loaded {} extract, {} normalize, {} load config(s) from {}",
            registry.extract.len(),
            registry.normalize.len(),
            registry.load.len(),
            dir.display()
        );
        Ok(registry)
    }

    pub fn add_extract(&mut self, name: impl Into<String>, config: ExtractConfig) {
        self.extract.insert(name.into(), config);
    }

    pub fn add_normalize(&mut self, name: impl Into<String>, config: NormalizeConfig) {
        self.normalize.insert(name.into(), config);
    }

    pub fn add_load(&mut self, name: impl Into<String>, config: LoadConfig) {
        self.load.insert(name.into(), config);
    }

    /// Extract configs in name order; the first whose pattern matches wins.
    pub fn extract_configs(&self) -> impl Iterator<Item = (&String, &ExtractConfig)> {
        self.extract.iter()
    }

    pub fn normalize_config(&self, name: &str) -> Option<&NormalizeConfig> {
        self.normalize.get(name)
    }

    pub fn load_config(&self, name: &str) -> Option<&LoadConfig> {
        self.load.get(name)
    }

    pub fn normalize_names(&self) -> impl Iterator<Item = &String> {
        self.normalize.keys()
    }

    pub fn load_names(&self) -> impl Iterator<Item = &String> {
        self.load.keys()
    }
}

fn read_stage<T: serde::de::DeserializeOwned>(
    dir: &Path,
) -> Result<Vec<(String, T)>, ConvertError> {
    let mut configs = Vec::new();
    if !dir.is_dir() {
        return Ok(configs);
    }
    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(|e| config_error(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let text = fs::read_to_string(&path).map_err(|e| config_error(&path, e))?;
        let config = serde_json::from_str(&text).map_err(|e| config_error(&path, e))?;
        configs.push((stem.to_string(), config));
    }
    Ok(configs)
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> ConvertError {
    ConvertError::Config {
        name: path.display().to_string(),
        message: err.to_string(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_columns_keyed_by_length() {
        let cols = ColumnsByCount::Single(vec!["name".into(), "unit".into(), "result".into()]);
        assert_eq!(
            cols.resolve(3).map(|c| c.len()),
            Some(3),
        );
        assert!(cols.resolve(4).is_none());
    }

    #[test]
    fn explicit_columns_by_width() {
        let mut map = BTreeMap::new();
        map.insert("3".to_string(), vec!["a".into(), "b".into(), "c".into()]);
        map.insert("4".to_string(), vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        let cols = ColumnsByCount::ByWidth(map);
        assert_eq!(cols.resolve(4).map(|c| c.len()), Some(4));
        assert!(cols.resolve(5).is_none());
    }

    #[test]
    fn extract_config_parses_both_column_shapes() {
        let shorthand: ExtractConfig = serde_json::from_str(
            r#"{
                "matchPattern": "AquaTest",
                "dateExtractionPattern": "Sampling date: (?P<date>\\S+)",
                "dateFormat": "%d/%m/%Y",
                "tables": [
                    {"name": "results", "tableIndex": 0, "headerRowCount": 1,
                     "columns": ["testName", "unit", "result"]}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(shorthand.tables[0].columns, ColumnsByCount::Single(_)));

        let by_width: ExtractConfig = serde_json::from_str(
            r#"{
                "matchPattern": "AquaTest",
                "dateExtractionPattern": "(?P<date>\\S+)",
                "tables": [
                    {"name": "results", "tableIndex": 0,
                     "columns": {"3": ["testName", "unit", "result"]}}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(by_width.tables[0].columns, ColumnsByCount::ByWidth(_)));
        // Omitted dateFormat falls back to the conventional short form
        assert_eq!(by_width.date_format, "%d/%m/%y");
    }

    #[test]
    fn registry_loads_fixture_dir() {
        let registry = Registry::load_dir("tests/fixtures/schemas").unwrap();
        let names: Vec<_> = registry.extract_configs().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["aquatest".to_string()]);
        assert!(registry.normalize_config("aquatest").is_some());
        assert!(registry.load_config("acre").is_some());
        assert!(registry.normalize_config("missing").is_none());
    }

    #[test]
    fn missing_stage_dirs_are_empty() {
        let registry = Registry::load_dir("tests/fixtures").unwrap();
        assert_eq!(registry.extract_configs().count(), 0);
    }
}
