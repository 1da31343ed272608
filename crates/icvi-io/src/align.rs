//! Matching panel regions against boundary feature names.

use std::collections::{BTreeMap, BTreeSet};

use icvi_index::Region;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::provinces::normalize_name;

/// Outcome of joining panel regions to boundary features.
///
/// All lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionMatch {
    /// Boundary name and the region it joins to.
    pub matched: Vec<(String, Region)>,
    /// Boundary names with no region in the panel (rendered as "No data").
    pub unmatched_boundaries: Vec<String>,
    /// Panel regions with no boundary feature (not drawn on a map).
    pub unmatched_regions: Vec<Region>,
}

impl RegionMatch {
    /// True if every region and every boundary was matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unmatched_boundaries.is_empty() && self.unmatched_regions.is_empty()
    }
}

/// Join panel regions to boundary feature names via [`normalize_name`].
///
/// Panel regions are expected to hold harmonized names already (as produced
/// by [`IndicatorReader`](crate::IndicatorReader)); they are normalized
/// again so hand-built tables match too. Unmatched names on either side are
/// logged at warn level.
#[instrument(skip_all, fields(n_regions = regions.len(), n_boundaries = boundary_names.len()))]
pub fn match_regions(regions: &[Region], boundary_names: &[String]) -> RegionMatch {
    let by_key: BTreeMap<String, &Region> = regions
        .iter()
        .map(|r| (normalize_name(r.as_str()), r))
        .collect();

    let mut matched = Vec::new();
    let mut unmatched_boundaries = BTreeSet::new();
    let mut used = BTreeSet::new();
    for name in boundary_names {
        let key = normalize_name(name);
        match by_key.get(&key) {
            Some(&region) => {
                used.insert(key);
                matched.push((name.clone(), region.clone()));
            }
            None => {
                unmatched_boundaries.insert(name.clone());
            }
        }
    }
    matched.sort();
    matched.dedup();

    let unmatched_regions: Vec<Region> = by_key
        .into_iter()
        .filter(|(key, _)| !used.contains(key))
        .map(|(_, r)| r.clone())
        .collect();
    let unmatched_boundaries: Vec<String> = unmatched_boundaries.into_iter().collect();

    if !unmatched_boundaries.is_empty() {
        warn!(names = ?unmatched_boundaries, "boundaries without panel data");
    }
    if !unmatched_regions.is_empty() {
        warn!(regions = ?unmatched_regions, "panel regions without a boundary");
    }
    info!(n_matched = matched.len(), "regions matched to boundaries");

    RegionMatch {
        matched,
        unmatched_boundaries,
        unmatched_regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(names: &[&str]) -> Vec<Region> {
        names.iter().map(|n| Region::new(*n)).collect()
    }

    #[test]
    fn variants_match() {
        let r = regions(&["jakarta", "kepulauan riau", "yogyakarta"]);
        let b = vec![
            "Jakarta Capital Region".to_string(),
            "Riau Islands".to_string(),
            "Special Region of Yogyakarta".to_string(),
        ];
        let m = match_regions(&r, &b);
        assert!(m.is_complete());
        assert_eq!(m.matched.len(), 3);
    }

    #[test]
    fn unmatched_on_both_sides() {
        let r = regions(&["aceh", "atlantis"]);
        let b = vec!["Aceh".to_string(), "West Papua".to_string()];
        let m = match_regions(&r, &b);
        assert_eq!(m.matched, vec![("Aceh".to_string(), Region::new("aceh"))]);
        assert_eq!(m.unmatched_boundaries, vec!["West Papua".to_string()]);
        assert_eq!(m.unmatched_regions, regions(&["atlantis"]));
        assert!(!m.is_complete());
    }

    #[test]
    fn riau_and_riau_islands_stay_distinct() {
        let r = regions(&["riau"]);
        let b = vec!["Riau".to_string(), "Riau Islands".to_string()];
        let m = match_regions(&r, &b);
        assert_eq!(m.matched.len(), 1);
        assert_eq!(m.unmatched_boundaries, vec!["Riau Islands".to_string()]);
    }
}
