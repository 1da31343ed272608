//! Shannon-entropy weighting of indicator columns.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{DataError, DegenerateWeightsError, IndexError};

/// Diversification below this is treated as exactly zero.
const DIVERSIFICATION_EPSILON: f64 = 1e-12;

/// Normalized Shannon entropy of a non-negative column, in `[0, 1]`.
///
/// Uses `k = 1 / ln(n)` so a perfectly uniform column has entropy 1 and
/// a column concentrated on one observation has entropy 0. Zero entries
/// contribute nothing (`0 · ln 0 := 0`). A column summing to zero carries no
/// information and is reported as entropy 1.
///
/// Requires `values.len() >= 2`.
#[must_use]
pub fn shannon_entropy(values: &[f64]) -> f64 {
    let n = values.len();
    debug_assert!(n >= 2, "entropy needs at least two observations");
    let total: f64 = values.iter().sum();
    if total <= 0.0 || values.windows(2).all(|w| w[0] == w[1]) {
        return 1.0;
    }
    let k = 1.0 / (n as f64).ln();
    let h: f64 = values
        .iter()
        .map(|&x| x / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum();
    (-k * h).clamp(0.0, 1.0)
}

/// One weighted entry of a [`WeightSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry<K> {
    /// What is being weighted (an indicator, or a category for the ICVI).
    pub key: K,
    /// Normalized entropy in `[0, 1]`.
    pub entropy: f64,
    /// Degree of diversification, `1 - entropy`.
    pub diversification: f64,
    /// Final weight; all weights of a set sum to 1.
    pub weight: f64,
}

/// Weights for the members of one group in one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSet<K> {
    group: String,
    entries: Vec<WeightEntry<K>>,
    fallback: bool,
}

impl<K: Ord + fmt::Display> WeightSet<K> {
    /// Name of the weighted group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Entries sorted by key.
    #[must_use]
    pub fn entries(&self) -> &[WeightEntry<K>] {
        &self.entries
    }

    /// True if entropy was degenerate and equal weights were substituted.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Weight of `key`, if it belongs to the set.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<f64> {
        self.entries
            .binary_search_by(|e| e.key.cmp(key))
            .ok()
            .map(|i| self.entries[i].weight)
    }

    /// Weights as a name-keyed map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|e| (e.key.to_string(), e.weight))
            .collect()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Number of weighted members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn diversify<K: Clone + fmt::Display>(
    columns: &[(K, Vec<f64>)],
) -> Result<Vec<(K, f64, f64)>, DataError> {
    columns
        .iter()
        .map(|(key, values)| {
            if values.len() < 2 {
                return Err(DataError::TooFewObservations {
                    indicator: key.to_string(),
                    n: values.len(),
                });
            }
            let e = shannon_entropy(values);
            let mut d = 1.0 - e;
            if d < DIVERSIFICATION_EPSILON {
                d = 0.0;
            }
            Ok((key.clone(), e, d))
        })
        .collect()
}

fn into_set<K: Ord>(group: &str, mut entries: Vec<WeightEntry<K>>, fallback: bool) -> WeightSet<K> {
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    WeightSet {
        group: group.to_string(),
        entries,
        fallback,
    }
}

/// Compute entropy weights for the columns of one group.
///
/// Each column holds the non-missing normalized observations (values in
/// `[0, 1]`) of one member across regions. Weight is proportional to
/// diversification `1 - e`; a uniform column gets weight 0.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DataError::TooFewObservations`] | A column has fewer than 2 values |
/// | [`DegenerateWeightsError`] | Every column has zero diversification (or there are none) |
pub fn entropy_weights<K: Clone + Ord + fmt::Display>(
    group: &str,
    columns: &[(K, Vec<f64>)],
) -> Result<WeightSet<K>, IndexError> {
    let described = diversify(columns)?;
    let total_d: f64 = described.iter().map(|(_, _, d)| d).sum();
    if total_d <= 0.0 {
        return Err(DegenerateWeightsError {
            group: group.to_string(),
            n_indicators: columns.len(),
        }
        .into());
    }
    let entries = described
        .into_iter()
        .map(|(key, entropy, diversification)| WeightEntry {
            key,
            entropy,
            diversification,
            weight: diversification / total_d,
        })
        .collect();
    Ok(into_set(group, entries, false))
}

/// Assign `1 / n` to every column, keeping the entropy diagnostics.
///
/// # Errors
///
/// Returns [`DataError::TooFewObservations`] if a column has fewer than 2
/// values, or [`DegenerateWeightsError`] if there are no columns.
pub fn equal_weights<K: Clone + Ord + fmt::Display>(
    group: &str,
    columns: &[(K, Vec<f64>)],
) -> Result<WeightSet<K>, IndexError> {
    if columns.is_empty() {
        return Err(DegenerateWeightsError {
            group: group.to_string(),
            n_indicators: 0,
        }
        .into());
    }
    let w = 1.0 / columns.len() as f64;
    let entries = diversify(columns)?
        .into_iter()
        .map(|(key, entropy, diversification)| WeightEntry {
            key,
            entropy,
            diversification,
            weight: w,
        })
        .collect();
    Ok(into_set(group, entries, true))
}

/// Build a fixed-weight set without entropy diagnostics.
pub(crate) fn fixed_weights<K: Clone + Ord>(group: &str, keys: &[K]) -> WeightSet<K> {
    let w = 1.0 / keys.len() as f64;
    let entries = keys
        .iter()
        .map(|k| WeightEntry {
            key: k.clone(),
            entropy: f64::NAN,
            diversification: f64::NAN,
            weight: w,
        })
        .collect();
    into_set(group, entries, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(data: &[(&str, &[f64])]) -> Vec<(String, Vec<f64>)> {
        data.iter().map(|(k, v)| (k.to_string(), v.to_vec())).collect()
    }

    #[test]
    fn uniform_column_has_max_entropy() {
        assert_eq!(shannon_entropy(&[0.5, 0.5, 0.5]), 1.0);
        assert_eq!(shannon_entropy(&[0.0, 0.0]), 1.0);
    }

    #[test]
    fn concentrated_column_has_zero_entropy() {
        assert!(shannon_entropy(&[0.0, 0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_known_distribution() {
        // p = [0.25, 0.75], e = -(0.25 ln 0.25 + 0.75 ln 0.75) / ln 2
        let expected = -(0.25f64 * 0.25f64.ln() + 0.75 * 0.75f64.ln()) / 2f64.ln();
        assert!((shannon_entropy(&[1.0, 3.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn uniform_indicator_gets_zero_weight() {
        let c = cols(&[("A", &[0.2, 0.5, 0.9]), ("B", &[0.5, 0.5, 0.5])]);
        let w = entropy_weights("exposure", &c).unwrap();
        assert_eq!(w.get(&"B".to_string()), Some(0.0));
        assert_eq!(w.get(&"A".to_string()), Some(1.0));
        assert!(!w.is_fallback());
    }

    #[test]
    fn weights_sum_to_one() {
        let c = cols(&[
            ("a", &[0.1, 0.4, 0.9, 0.0]),
            ("b", &[1.0, 0.0, 0.3, 0.3]),
            ("c", &[0.6, 0.7, 0.65, 0.8]),
        ]);
        let w = entropy_weights("sensitivity", &c).unwrap();
        assert!((w.total() - 1.0).abs() < 1e-9);
        assert!(w.entries().iter().all(|e| e.weight >= 0.0));
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn more_dispersed_indicator_weighs_more() {
        let c = cols(&[("flat", &[0.4, 0.5, 0.6]), ("spread", &[0.0, 0.1, 1.0])]);
        let w = entropy_weights("g", &c).unwrap();
        assert!(w.get(&"spread".to_string()).unwrap() > w.get(&"flat".to_string()).unwrap());
    }

    #[test]
    fn single_uniform_indicator_is_degenerate() {
        let c = cols(&[("only", &[0.3, 0.3, 0.3])]);
        let err = entropy_weights("exposure", &c).unwrap_err();
        assert_eq!(
            err,
            IndexError::DegenerateWeights(DegenerateWeightsError {
                group: "exposure".into(),
                n_indicators: 1
            })
        );
    }

    #[test]
    fn equal_weights_fallback() {
        let c = cols(&[("x", &[0.3, 0.3]), ("y", &[0.7, 0.7])]);
        let w = equal_weights("g", &c).unwrap();
        assert!(w.is_fallback());
        assert_eq!(w.get(&"x".to_string()), Some(0.5));
        assert_eq!(w.to_map().len(), 2);
    }

    #[test]
    fn too_few_observations() {
        let c = cols(&[("x", &[0.3])]);
        assert!(matches!(
            entropy_weights("g", &c),
            Err(IndexError::Data(DataError::TooFewObservations { n: 1, .. }))
        ));
    }

    #[test]
    fn entries_sorted_by_key() {
        let c = cols(&[("z", &[0.0, 1.0]), ("a", &[1.0, 0.2])]);
        let w = entropy_weights("g", &c).unwrap();
        assert_eq!(w.entries()[0].key, "a");
        assert_eq!(w.entries()[1].key, "z");
    }
}
