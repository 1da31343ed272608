//! Convex aggregation of normalized values into composite scores.

/// Weighted sum `Σ wᵢ · xᵢ` of normalized values.
///
/// With non-negative weights summing to 1 and values in `[0, 1]` the result
/// is a convex combination; it is clamped to `[0, 1]` to absorb rounding.
#[must_use]
pub fn weighted_sum<I>(terms: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    terms
        .into_iter()
        .map(|(w, x)| w * x)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}
