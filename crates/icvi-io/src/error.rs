//! I/O error types for icvi-io.

use std::path::PathBuf;

use icvi_index::{ConfigError, DataError, IndexError, ParseTagError};

/// Errors from file I/O, CSV/GeoJSON parsing, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a required column is absent from the header.
    #[error("missing required column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: &'static str,
    },

    /// Returned when a data row is shorter than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a value cell is neither a number nor a missing marker.
    #[error("invalid number in {path}: row {row_index}, column \"{column}\", raw value \"{raw}\"")]
    InvalidNumber {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Column name.
        column: &'static str,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a row has an empty province name.
    #[error("empty province name in {path}: row {row_index}")]
    EmptyProvince {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when a row has an empty indicator id.
    #[error("empty indicator id in {path}: row {row_index}")]
    EmptyIndicator {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned in strict mode when a province is not in the ADM1 list.
    #[error("unknown province \"{name}\" in {path}: row {row_index}")]
    UnknownProvince {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The name as written in the file.
        name: String,
    },

    /// Returned when a category, DPSIR or polarity tag is not recognized.
    #[error("invalid tag in {path}: row {row_index}")]
    InvalidTag {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Underlying parse error.
        source: ParseTagError,
    },

    /// Returned when a row violates a table invariant (duplicate key,
    /// conflicting indicator metadata, year out of range).
    #[error("invalid row in {path}: row {row_index}")]
    InvalidRow {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Underlying table error.
        source: DataError,
    },

    /// Returned when the reader was configured with an invalid year range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Returned when the engine rejects a query made while writing results.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Returned when a year cell is not an integer year.
    #[error("invalid year in {path}: row {row_index}, raw value \"{raw}\"")]
    InvalidYear {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when the assembled table is rejected.
    #[error("invalid indicator table in {path}")]
    Table {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying table error.
        source: DataError,
    },

    /// Returned when a GeoJSON file is not valid JSON or lacks a feature list.
    #[error("invalid GeoJSON in {path}")]
    GeoJson {
        /// Path to the GeoJSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when the run name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid run name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidRunName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a CSV result file cannot be written.
    #[error("cannot write CSV {path}")]
    WriteCsv {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON artifact cannot be serialized.
    #[error("cannot serialize {path}")]
    Serialize {
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
