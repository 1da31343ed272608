//! Entropy-weighted composite vulnerability index computation.
//!
//! Pure math library, zero I/O. Builds an immutable [`Engine`] snapshot from
//! an [`IndicatorTable`]: min-max normalization with polarity, Shannon
//! entropy weights per ESA category, composite scores, the integrated
//! ICVI, drill-down contribution breakdowns and DPSIR decomposition.

mod composite;
mod config;
mod domain;
mod drilldown;
mod engine;
mod entropy;
mod error;
mod normalize;
mod table;

pub use composite::weighted_sum;
pub use config::{DegenerateFallback, EngineConfig, IcviRule, Unit, WeightScope, ZeroVariance};
pub use domain::{
    Category, Dpsir, FIRST_YEAR, Group, IndicatorId, IndicatorMeta, LAST_YEAR, ParseTagError,
    Polarity, Region, Year,
};
pub use drilldown::{ContributionRecord, DpsirShare, Drilldown, RegionScores, Selector};
pub use engine::{Engine, GroupWeights, IndicatorWeights};
pub use entropy::{WeightEntry, WeightSet, entropy_weights, equal_weights, shannon_entropy};
pub use error::{ConfigError, DataError, DegenerateWeightsError, IndexError, LookupError};
pub use normalize::{Bounds, NormalizedTable, min_max_scale, normalize};
pub use table::{IndicatorTable, IndicatorTableBuilder};
