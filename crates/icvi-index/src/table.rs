//! The raw indicator panel: (region, year, indicator) -> optional value.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::domain::{FIRST_YEAR, IndicatorId, IndicatorMeta, LAST_YEAR, Region, Year};
use crate::error::{ConfigError, DataError, LookupError};

/// Sorted key sets shared by a table and every snapshot derived from it.
#[derive(Debug)]
pub(crate) struct Layout {
    regions: Vec<Region>,
    years: Vec<Year>,
    indicators: Vec<IndicatorMeta>,
    region_index: HashMap<String, usize>,
    year_index: HashMap<Year, usize>,
    indicator_index: HashMap<String, usize>,
}

impl Layout {
    fn new(regions: Vec<Region>, years: Vec<Year>, indicators: Vec<IndicatorMeta>) -> Self {
        let region_index = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.as_str().to_string(), i))
            .collect();
        let year_index = years.iter().enumerate().map(|(i, &y)| (y, i)).collect();
        let indicator_index = indicators
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.as_str().to_string(), i))
            .collect();
        Self {
            regions,
            years,
            indicators,
            region_index,
            year_index,
            indicator_index,
        }
    }

    pub(crate) fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub(crate) fn years(&self) -> &[Year] {
        &self.years
    }

    pub(crate) fn indicators(&self) -> &[IndicatorMeta] {
        &self.indicators
    }

    pub(crate) fn n_regions(&self) -> usize {
        self.regions.len()
    }

    pub(crate) fn region_idx(&self, region: &str) -> Result<usize, LookupError> {
        self.region_index
            .get(region)
            .copied()
            .ok_or_else(|| LookupError::UnknownRegion(region.to_string()))
    }

    pub(crate) fn year_idx(&self, year: Year) -> Result<usize, LookupError> {
        self.year_index
            .get(&year)
            .copied()
            .ok_or(LookupError::UnknownYear(year))
    }

    pub(crate) fn indicator_idx(&self, indicator: &str) -> Result<usize, LookupError> {
        self.indicator_index
            .get(indicator)
            .copied()
            .ok_or_else(|| LookupError::UnknownIndicator(indicator.to_string()))
    }

    /// Offset of the first cell of the `(year, indicator)` column.
    pub(crate) fn column_offset(&self, year_idx: usize, indicator_idx: usize) -> usize {
        (year_idx * self.indicators.len() + indicator_idx) * self.regions.len()
    }

    pub(crate) fn n_cells(&self) -> usize {
        self.regions.len() * self.years.len() * self.indicators.len()
    }
}

/// Immutable panel of raw indicator values.
///
/// Every `(region, year, indicator)` key maps to at most one value; keys
/// that were never supplied, or supplied as `None`, are missing. Values are
/// stored column-wise so that one indicator in one year is a contiguous
/// slice over regions.
#[derive(Debug, Clone)]
pub struct IndicatorTable {
    layout: Arc<Layout>,
    values: Vec<Option<f64>>,
}

impl IndicatorTable {
    /// Start building a table with the default 2014–2023 year range.
    #[must_use]
    pub fn builder() -> IndicatorTableBuilder {
        IndicatorTableBuilder::default()
    }

    /// Regions in sorted order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        self.layout.regions()
    }

    /// Years present in the table, ascending.
    #[must_use]
    pub fn years(&self) -> &[Year] {
        self.layout.years()
    }

    /// Indicator metadata sorted by id.
    #[must_use]
    pub fn indicators(&self) -> &[IndicatorMeta] {
        self.layout.indicators()
    }

    /// Most recent year in the table.
    #[must_use]
    pub fn latest_year(&self) -> Year {
        // build() rejects tables without years
        self.layout.years().last().copied().unwrap_or(LAST_YEAR)
    }

    /// Look up metadata for one indicator.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownIndicator`] if the id is not in the table.
    pub fn indicator(&self, indicator: &str) -> Result<&IndicatorMeta, LookupError> {
        let idx = self.layout.indicator_idx(indicator)?;
        Ok(&self.layout.indicators()[idx])
    }

    /// Return the raw value for a key, `None` if it is missing.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] if any part of the key is unknown.
    pub fn value(&self, region: &str, year: Year, indicator: &str) -> Result<Option<f64>, LookupError> {
        let r = self.layout.region_idx(region)?;
        let y = self.layout.year_idx(year)?;
        let i = self.layout.indicator_idx(indicator)?;
        Ok(self.values[self.layout.column_offset(y, i) + r])
    }

    /// Number of present (non-missing) values.
    #[must_use]
    pub fn n_observed(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Number of missing cells in the full region × year × indicator grid.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        self.values.len() - self.n_observed()
    }

    pub(crate) fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Raw values of one indicator in one year, indexed by region.
    pub(crate) fn column(&self, year_idx: usize, indicator_idx: usize) -> &[Option<f64>] {
        let start = self.layout.column_offset(year_idx, indicator_idx);
        &self.values[start..start + self.layout.n_regions()]
    }
}

/// Incremental builder for an [`IndicatorTable`].
///
/// Indicators must be registered before values referencing them are
/// inserted.
#[derive(Debug)]
pub struct IndicatorTableBuilder {
    first_year: Year,
    last_year: Year,
    indicators: BTreeMap<IndicatorId, IndicatorMeta>,
    entries: HashMap<(Region, Year, IndicatorId), Option<f64>>,
}

impl Default for IndicatorTableBuilder {
    fn default() -> Self {
        Self {
            first_year: FIRST_YEAR,
            last_year: LAST_YEAR,
            indicators: BTreeMap::new(),
            entries: HashMap::new(),
        }
    }
}

impl IndicatorTableBuilder {
    /// Override the inclusive range of accepted years.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidYearRange`] if `first > last`.
    pub fn with_year_range(mut self, first: Year, last: Year) -> Result<Self, ConfigError> {
        if first > last {
            return Err(ConfigError::InvalidYearRange { first, last });
        }
        self.first_year = first;
        self.last_year = last;
        Ok(self)
    }

    /// Register an indicator. Registering the same metadata twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::ConflictingMetadata`] if the id is already
    /// registered with a different category, DPSIR class or polarity.
    pub fn register(&mut self, meta: IndicatorMeta) -> Result<(), DataError> {
        match self.indicators.get(&meta.id) {
            Some(existing) if *existing != meta => Err(DataError::ConflictingMetadata {
                indicator: meta.id.as_str().to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.indicators.insert(meta.id.clone(), meta);
                Ok(())
            }
        }
    }

    /// Insert one observation. `None` records an explicitly missing value.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::UnregisteredIndicator`] | `indicator` was not registered |
    /// | [`DataError::YearOutOfRange`] | `year` is outside the accepted range |
    /// | [`DataError::NonFiniteValue`] | `value` is NaN or infinite |
    /// | [`DataError::DuplicateEntry`] | The key was already inserted |
    pub fn insert(
        &mut self,
        region: Region,
        year: Year,
        indicator: &str,
        value: Option<f64>,
    ) -> Result<(), DataError> {
        let id = IndicatorId::new(indicator);
        if !self.indicators.contains_key(&id) {
            return Err(DataError::UnregisteredIndicator {
                indicator: indicator.to_string(),
            });
        }
        if year < self.first_year || year > self.last_year {
            return Err(DataError::YearOutOfRange {
                year,
                first: self.first_year,
                last: self.last_year,
            });
        }
        if value.is_some_and(|v| !v.is_finite()) {
            return Err(DataError::NonFiniteValue {
                region: region.as_str().to_string(),
                year,
                indicator: indicator.to_string(),
            });
        }
        let key = (region, year, id);
        if self.entries.contains_key(&key) {
            let (region, year, id) = key;
            return Err(DataError::DuplicateEntry {
                region: region.as_str().to_string(),
                year,
                indicator: id.as_str().to_string(),
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Finish building.
    ///
    /// Regions and years are taken from the inserted entries; every
    /// registered indicator becomes a column, even if it has no values.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyTable`] if no indicators were registered or
    /// no entries were inserted.
    pub fn build(self) -> Result<IndicatorTable, DataError> {
        if self.indicators.is_empty() {
            return Err(DataError::EmptyTable {
                reason: "no indicators registered",
            });
        }
        if self.entries.is_empty() {
            return Err(DataError::EmptyTable {
                reason: "no observations inserted",
            });
        }

        let regions: BTreeSet<&Region> = self.entries.keys().map(|(r, _, _)| r).collect();
        let years: BTreeSet<Year> = self.entries.keys().map(|&(_, y, _)| y).collect();
        let regions: Vec<Region> = regions.into_iter().cloned().collect();
        let years: Vec<Year> = years.into_iter().collect();
        let indicators: Vec<IndicatorMeta> = self.indicators.into_values().collect();

        let layout = Layout::new(regions, years, indicators);
        let mut values = vec![None; layout.n_cells()];
        for ((region, year, id), value) in self.entries {
            // keys were validated on insert, so every lookup resolves
            let (Ok(r), Ok(y), Ok(i)) = (
                layout.region_idx(region.as_str()),
                layout.year_idx(year),
                layout.indicator_idx(id.as_str()),
            ) else {
                continue;
            };
            values[layout.column_offset(y, i) + r] = value;
        }

        debug!(
            n_regions = layout.regions().len(),
            n_years = layout.years().len(),
            n_indicators = layout.indicators().len(),
            "indicator table built"
        );

        Ok(IndicatorTable {
            layout: Arc::new(layout),
            values,
        })
    }
}
