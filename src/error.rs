use thiserror::Error;

/// Fatal conversion errors. Each one means the input and the configuration
/// disagree structurally; retrying the same conversion cannot succeed.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("no {stage} config named '{name}'")]
    ConfigNotFound { stage: &'static str, name: String },

    #[error("no extract config matches the document text")]
    NoMatchingExtractConfig,

    #[error("sampling date not found in document text")]
    DateNotFound,

    #[error("sampling date '{value}' does not match format '{format}'")]
    InvalidDateFormat { value: String, format: String },

    #[error("table '{table}': {detail}")]
    ColumnSchemaMismatch { table: String, detail: String },

    #[error("extracted report has no sampling date")]
    MissingSamplingDate,

    #[error("extracted report has no results table")]
    MissingResultsTable,

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("sheet '{0}' has no rows with a date in the date column")]
    NoDateRowsFound(String),

    #[error("reading document: {0}")]
    Document(String),

    #[error("workbook i/o: {0}")]
    Workbook(String),

    #[error("config '{name}': {message}")]
    Config { name: String, message: String },
}
