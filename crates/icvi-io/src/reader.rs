//! Long-format CSV reader for indicator panels.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use icvi_index::{
    Category, DataError, Dpsir, FIRST_YEAR, IndicatorMeta, IndicatorTable, LAST_YEAR, ParseTagError,
    Polarity, Region, Year,
};
use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::provinces::{is_known, normalize_name};

/// Cell texts read as a missing value (case-insensitive).
const MISSING_MARKERS: [&str; 5] = ["", "na", "nan", "null", "-"];

/// Reads an indicator panel from a long-format CSV file.
///
/// Expected CSV format:
/// - Header row required; column order is free, names are case-insensitive
/// - `province,year,indicator,value,category,dpsir[,polarity]`
/// - One row per (province, year, indicator); `region` is accepted for `province`
/// - Empty, `NA`, `NaN`, `null` or `-` values are missing observations
/// - `polarity` defaults to positive when the column is absent or blank
///
/// Province names are harmonized with [`normalize_name`] before use.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent from the header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row is shorter than the header |
/// | [`IoError::EmptyProvince`] | Province cell is blank |
/// | [`IoError::EmptyIndicator`] | Indicator cell is blank |
/// | [`IoError::UnknownProvince`] | Strict mode and the province is not an ADM1 name |
/// | [`IoError::InvalidYear`] | Year cell is not an integer |
/// | [`IoError::InvalidNumber`] | Value cell is neither a number nor a missing marker |
/// | [`IoError::InvalidTag`] | Unknown category, DPSIR class or polarity |
/// | [`IoError::InvalidRow`] | Duplicate key, conflicting metadata, year out of range, non-finite value |
/// | [`IoError::Table`] | The assembled table is empty |
pub struct IndicatorReader {
    path: PathBuf,
    first_year: Year,
    last_year: Year,
    strict_provinces: bool,
}

/// Positions of the named columns in the header.
struct Columns {
    province: usize,
    year: usize,
    indicator: usize,
    value: usize,
    category: usize,
    dpsir: usize,
    polarity: Option<usize>,
}

impl Columns {
    fn locate(path: &Path, header: &csv::StringRecord) -> Result<Self, IoError> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let require = |names: &[&'static str]| {
            find(names).ok_or_else(|| IoError::MissingColumn {
                path: path.to_path_buf(),
                column: names[0],
            })
        };
        Ok(Self {
            province: require(&["province", "region"])?,
            year: require(&["year"])?,
            indicator: require(&["indicator"])?,
            value: require(&["value"])?,
            category: require(&["category"])?,
            dpsir: require(&["dpsir"])?,
            polarity: find(&["polarity"]),
        })
    }
}

impl IndicatorReader {
    /// Create a new reader for the given CSV file path.
    ///
    /// Accepts years 2014–2023 and unknown province names by default.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            first_year: FIRST_YEAR,
            last_year: LAST_YEAR,
            strict_provinces: false,
        }
    }

    /// Override the inclusive range of accepted years.
    #[must_use]
    pub fn with_year_range(mut self, first: Year, last: Year) -> Self {
        self.first_year = first;
        self.last_year = last;
        self
    }

    /// Reject provinces outside the ADM1 list instead of warning.
    #[must_use]
    pub fn with_strict_provinces(mut self, strict: bool) -> Self {
        self.strict_provinces = strict;
        self
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn tag<T>(&self, row_index: usize, raw: &str) -> Result<T, IoError>
    where
        T: std::str::FromStr<Err = ParseTagError>,
    {
        raw.parse().map_err(|source| IoError::InvalidTag {
            path: self.path.clone(),
            row_index,
            source,
        })
    }

    fn value(&self, row_index: usize, raw: &str) -> Result<Option<f64>, IoError> {
        if MISSING_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m)) {
            return Ok(None);
        }
        raw.parse::<f64>()
            .map(Some)
            .map_err(|_| IoError::InvalidNumber {
                path: self.path.clone(),
                row_index,
                column: "value",
                raw: raw.to_string(),
            })
    }

    /// Read and validate the CSV file, returning an [`IndicatorTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<IndicatorTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short rows surface as InconsistentRowLength
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let cols = Columns::locate(&self.path, &header)?;
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let mut builder =
            IndicatorTable::builder().with_year_range(self.first_year, self.last_year)?;
        let mut unknown: HashSet<String> = HashSet::new();
        let mut n_rows = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() < expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            let cell = |i: usize| record.get(i).unwrap_or("");

            let raw_province = cell(cols.province);
            if raw_province.is_empty() {
                return Err(IoError::EmptyProvince {
                    path: self.path.clone(),
                    row_index,
                });
            }
            let province = normalize_name(raw_province);
            if !is_known(&province) {
                if self.strict_provinces {
                    return Err(IoError::UnknownProvince {
                        path: self.path.clone(),
                        row_index,
                        name: raw_province.to_string(),
                    });
                }
                unknown.insert(province.clone());
            }

            let raw_year = cell(cols.year);
            let year: Year = raw_year.parse().map_err(|_| IoError::InvalidYear {
                path: self.path.clone(),
                row_index,
                raw: raw_year.to_string(),
            })?;

            let indicator = cell(cols.indicator);
            if indicator.is_empty() {
                return Err(IoError::EmptyIndicator {
                    path: self.path.clone(),
                    row_index,
                });
            }
            let category: Category = self.tag(row_index, cell(cols.category))?;
            let dpsir: Dpsir = self.tag(row_index, cell(cols.dpsir))?;
            let polarity: Polarity = match cols.polarity {
                Some(i) => self.tag(row_index, cell(i))?,
                None => Polarity::default(),
            };
            let value = self.value(row_index, cell(cols.value))?;

            let row_error = |source: DataError| IoError::InvalidRow {
                path: self.path.clone(),
                row_index,
                source,
            };
            builder
                .register(IndicatorMeta::new(indicator, category, dpsir, polarity))
                .map_err(row_error)?;
            builder
                .insert(Region::new(province), year, indicator, value)
                .map_err(row_error)?;
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        if !unknown.is_empty() {
            let mut names: Vec<_> = unknown.into_iter().collect();
            names.sort();
            warn!(?names, "provinces outside the ADM1 list");
        }

        let table = builder.build().map_err(|source| IoError::Table {
            path: self.path.clone(),
            source,
        })?;

        info!(
            n_rows,
            n_regions = table.regions().len(),
            n_years = table.years().len(),
            n_indicators = table.indicators().len(),
            n_missing = table.n_missing(),
            "indicator panel loaded"
        );

        Ok(table)
    }
}
