//! Engine configuration: weighting scope, fallbacks and the ICVI rule.

use std::fmt;

use tracing::{info, instrument};

use crate::domain::Year;
use crate::engine::Engine;
use crate::error::{ConfigError, IndexError};
use crate::table::IndicatorTable;

/// Which observations form one unit of analysis for normalization and
/// entropy weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightScope {
    /// Each year is normalized and weighted independently across regions.
    #[default]
    PerYear,
    /// All region-year observations of the panel are pooled.
    Panel,
}

/// A unit of analysis: one year, or the pooled panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    /// A single year.
    Year(Year),
    /// The full panel.
    Panel,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Year(y) => write!(f, "year {y}"),
            Unit::Panel => f.write_str("panel"),
        }
    }
}

impl WeightScope {
    /// Return the unit that `year` belongs to under this scope.
    #[must_use]
    pub fn unit_for(self, year: Year) -> Unit {
        match self {
            WeightScope::PerYear => Unit::Year(year),
            WeightScope::Panel => Unit::Panel,
        }
    }
}

/// Behavior when an indicator has a single distinct value within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ZeroVariance {
    /// Fail with [`DataError::ZeroVariance`](crate::DataError::ZeroVariance).
    #[default]
    Reject,
    /// Use this constant (in `[0, 1]`) as every normalized value.
    Constant(f64),
}

/// Behavior when every indicator of a group has zero diversification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegenerateFallback {
    /// Fail with [`DegenerateWeightsError`](crate::DegenerateWeightsError).
    #[default]
    Reject,
    /// Assign `1 / n` to each of the `n` indicators.
    EqualWeights,
}

/// How the ICVI combines the three category composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IcviRule {
    /// Arithmetic mean of exposure, sensitivity and adaptive capacity.
    #[default]
    EqualWeights,
    /// A second entropy pass over the category composites across regions.
    Entropy,
}

/// Configuration for building an [`Engine`] snapshot.
///
/// Construct via [`EngineConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter       | Default                        |
/// |-----------------|--------------------------------|
/// | `weight_scope`  | `WeightScope::PerYear`         |
/// | `zero_variance` | `ZeroVariance::Reject`         |
/// | `degenerate`    | `DegenerateFallback::Reject`   |
/// | `icvi_rule`     | `IcviRule::EqualWeights`       |
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub(crate) weight_scope: WeightScope,
    pub(crate) zero_variance: ZeroVariance,
    pub(crate) degenerate: DegenerateFallback,
    pub(crate) icvi_rule: IcviRule,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether weights are computed per year or over the whole panel.
    #[must_use]
    pub fn with_weight_scope(mut self, weight_scope: WeightScope) -> Self {
        self.weight_scope = weight_scope;
        self
    }

    /// Set the zero-variance behavior of the normalizer.
    #[must_use]
    pub fn with_zero_variance(mut self, zero_variance: ZeroVariance) -> Self {
        self.zero_variance = zero_variance;
        self
    }

    /// Set the fallback for groups whose entropy weights are degenerate.
    #[must_use]
    pub fn with_degenerate_fallback(mut self, degenerate: DegenerateFallback) -> Self {
        self.degenerate = degenerate;
        self
    }

    /// Set how the ICVI is aggregated from the category composites.
    #[must_use]
    pub fn with_icvi_rule(mut self, icvi_rule: IcviRule) -> Self {
        self.icvi_rule = icvi_rule;
        self
    }

    /// Return the weighting scope.
    #[must_use]
    pub fn weight_scope(&self) -> WeightScope {
        self.weight_scope
    }

    /// Return the zero-variance behavior.
    #[must_use]
    pub fn zero_variance(&self) -> ZeroVariance {
        self.zero_variance
    }

    /// Return the degenerate-weights fallback.
    #[must_use]
    pub fn degenerate_fallback(&self) -> DegenerateFallback {
        self.degenerate
    }

    /// Return the ICVI aggregation rule.
    #[must_use]
    pub fn icvi_rule(&self) -> IcviRule {
        self.icvi_rule
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let ZeroVariance::Constant(value) = self.zero_variance
            && !(0.0..=1.0).contains(&value)
        {
            return Err(ConfigError::InvalidFallback { value });
        }
        Ok(())
    }

    /// Normalize `table`, compute every weight set and return the snapshot.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IndexError::Config`] | The zero-variance constant is outside `[0, 1]` |
    /// | [`IndexError::Data`] | Normalization fails (no observations, zero variance under `Reject`) |
    /// | [`IndexError::Slice`] | Weighting one category in one unit fails |
    #[instrument(skip_all, fields(scope = ?self.weight_scope, icvi_rule = ?self.icvi_rule))]
    pub fn build(&self, table: IndicatorTable) -> Result<Engine, IndexError> {
        self.validate()?;
        let engine = Engine::build(self.clone(), table)?;
        info!(
            n_regions = engine.table().regions().len(),
            n_years = engine.table().years().len(),
            n_indicators = engine.table().indicators().len(),
            "engine snapshot built"
        );
        Ok(engine)
    }
}
