//! Error types for table construction, normalization, weighting and queries.

use crate::domain::{Category, Year};

/// Errors caused by missing, invalid or uninformative indicator data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Returned when the table has no regions, years or indicators.
    #[error("indicator table is empty: {reason}")]
    EmptyTable {
        /// Which dimension is empty.
        reason: &'static str,
    },

    /// Returned when the same (region, year, indicator) key is inserted twice.
    #[error("duplicate entry for region \"{region}\", year {year}, indicator \"{indicator}\"")]
    DuplicateEntry {
        /// Region of the duplicated key.
        region: String,
        /// Year of the duplicated key.
        year: Year,
        /// Indicator of the duplicated key.
        indicator: String,
    },

    /// Returned when a value is NaN or infinite.
    #[error("non-finite value for region \"{region}\", year {year}, indicator \"{indicator}\"")]
    NonFiniteValue {
        /// Region of the offending entry.
        region: String,
        /// Year of the offending entry.
        year: Year,
        /// Indicator of the offending entry.
        indicator: String,
    },

    /// Returned when a year falls outside the table's accepted range.
    #[error("year {year} outside accepted range {first}..={last}")]
    YearOutOfRange {
        /// The rejected year.
        year: Year,
        /// First accepted year.
        first: Year,
        /// Last accepted year.
        last: Year,
    },

    /// Returned when a value references an indicator that was never registered.
    #[error("indicator \"{indicator}\" has no registered metadata")]
    UnregisteredIndicator {
        /// The unknown indicator id.
        indicator: String,
    },

    /// Returned when an indicator is registered twice with different metadata.
    #[error("indicator \"{indicator}\" registered with conflicting metadata")]
    ConflictingMetadata {
        /// The indicator id.
        indicator: String,
    },

    /// Returned when every value of an indicator within a unit is missing.
    #[error("indicator \"{indicator}\" has no observations in {unit}")]
    NoObservations {
        /// The indicator id.
        indicator: String,
        /// The unit of analysis (a year or the full panel).
        unit: String,
    },

    /// Returned when an indicator has fewer than two distinct values and no
    /// zero-variance fallback is configured.
    #[error("indicator \"{indicator}\" has zero variance in {unit} (all values {value})")]
    ZeroVariance {
        /// The indicator id.
        indicator: String,
        /// The unit of analysis.
        unit: String,
        /// The single observed value.
        value: f64,
    },

    /// Returned when entropy is requested over fewer than two observations.
    #[error("entropy of \"{indicator}\" needs at least 2 observations, got {n}")]
    TooFewObservations {
        /// The indicator (or group) id.
        indicator: String,
        /// Number of non-missing observations.
        n: usize,
    },

    /// Returned when a composite needs a value that is missing.
    #[error("missing value for indicator \"{indicator}\" in region \"{region}\", year {year}")]
    MissingValue {
        /// Region of the missing entry.
        region: String,
        /// Year of the missing entry.
        year: Year,
        /// Indicator of the missing entry.
        indicator: String,
    },

    /// Returned when a category has no indicators at all.
    #[error("category {category} has no indicators")]
    EmptyGroup {
        /// The empty category.
        category: Category,
    },
}

/// Returned when every indicator of a group is perfectly uniform, so no
/// entropy-based split exists.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("all {n_indicators} indicators of {group} have zero diversification")]
pub struct DegenerateWeightsError {
    /// Name of the group being weighted.
    pub group: String,
    /// Number of indicators in the group.
    pub n_indicators: usize,
}

/// Errors from queries against keys that are not part of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Returned when the region is not in the table.
    #[error("unknown region \"{0}\"")]
    UnknownRegion(String),

    /// Returned when the year is not in the table.
    #[error("unknown year {0}")]
    UnknownYear(Year),

    /// Returned when the indicator is not in the table.
    #[error("unknown indicator \"{0}\"")]
    UnknownIndicator(String),
}

/// Errors from invalid engine configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Returned when the zero-variance constant is outside [0, 1].
    #[error("zero-variance fallback must be in [0, 1], got {value}")]
    InvalidFallback {
        /// The rejected constant.
        value: f64,
    },

    /// Returned when the accepted year range is inverted.
    #[error("invalid year range {first}..={last}")]
    InvalidYearRange {
        /// First year.
        first: Year,
        /// Last year.
        last: Year,
    },
}

/// Top-level error for engine operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndexError {
    /// Invalid or insufficient data.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Entropy weighting produced no usable split.
    #[error(transparent)]
    DegenerateWeights(#[from] DegenerateWeightsError),

    /// Query for a key that does not exist.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Weight computation for a specific slice failed during engine build.
    #[error("weighting {category} for {unit} failed")]
    Slice {
        /// Category being weighted.
        category: String,
        /// Unit of analysis.
        unit: String,
        /// Underlying error.
        source: Box<IndexError>,
    },
}
