//! Contribution breakdowns for one region and year.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::{Category, Dpsir, IndicatorId, ParseTagError, Region, Year};

/// Which indicators a drill-down covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Indicators of one ESA category.
    Category(Category),
    /// Indicators of one DPSIR class, across categories.
    Dpsir(Dpsir),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Category(c) => c.fmt(f),
            Selector::Dpsir(d) => d.fmt(f),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses a category name first, then a DPSIR class, so the single
/// letter `s` means sensitivity; spell out `state` for the DPSIR class.
impl FromStr for Selector {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(c) = s.parse::<Category>() {
            return Ok(Selector::Category(c));
        }
        s.parse::<Dpsir>().map(Selector::Dpsir).map_err(|_| ParseTagError {
            kind: "selector",
            value: s.to_string(),
        })
    }
}

/// One indicator's share of a composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionRecord {
    /// Indicator id.
    pub indicator: IndicatorId,
    /// ESA category of the indicator.
    pub category: Category,
    /// DPSIR class of the indicator.
    pub dpsir: Dpsir,
    /// Raw input value.
    pub raw: f64,
    /// Normalized value in `[0, 1]`.
    pub normalized: f64,
    /// Entropy weight within the indicator's category.
    pub weight: f64,
    /// `weight × normalized`.
    pub contribution: f64,
}

/// Ordered breakdown returned by a drill-down query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drilldown {
    /// Region queried.
    pub region: Region,
    /// Year queried.
    pub year: Year,
    /// Selector queried.
    pub selector: Selector,
    /// Sum of contributions; equals the category composite for a category selector.
    pub total: f64,
    /// Records sorted by descending contribution.
    pub records: Vec<ContributionRecord>,
}

/// ICVI-level contribution of one DPSIR class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DpsirShare {
    /// DPSIR class.
    pub dpsir: Dpsir,
    /// Number of indicators in the class.
    pub n_indicators: usize,
    /// Σ category weight × indicator weight × normalized value.
    pub contribution: f64,
    /// `contribution / ICVI`, 0 when the ICVI is 0.
    pub share: f64,
}

/// Category and ICVI scores of one region in one year; `None` marks a
/// score that could not be resolved (missing data).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionScores {
    /// Region.
    pub region: Region,
    /// Year.
    pub year: Year,
    /// Exposure composite.
    pub exposure: Option<f64>,
    /// Sensitivity composite.
    pub sensitivity: Option<f64>,
    /// Adaptive capacity composite.
    pub adaptive_capacity: Option<f64>,
    /// Integrated index.
    pub icvi: Option<f64>,
}

/// Sort records by descending contribution, ties by indicator id.
pub(crate) fn sort_contributions(records: &mut [ContributionRecord]) {
    records.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.indicator.cmp(&b.indicator))
    });
}
