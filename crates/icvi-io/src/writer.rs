//! CSV and JSON result writer for index outputs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use icvi_index::{
    Category, Drilldown, Engine, IcviRule, IndexError, RegionScores, WeightScope, Year,
};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::RunName;

/// Header of the scores CSV.
const SCORES_HEADER: [&str; 6] = [
    "province",
    "year",
    "exposure",
    "sensitivity",
    "adaptive_capacity",
    "ICVI",
];

/// Writes index results to CSV and JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{run}_scores.csv`, `{run}_weights.json` and
/// `{run}_drilldown.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    run: RunName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and run name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), run = %run))]
    pub fn new(output_dir: &Path, run: RunName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            run,
        })
    }

    fn path_for(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{suffix}", self.run.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write scores to `{run}_scores.csv`, one row per region and year.
    ///
    /// Unresolvable scores are written as empty cells.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteCsv`] if the file cannot be written.
    #[instrument(skip_all, fields(n_rows = scores.len()))]
    pub fn write_scores(&self, scores: &[RegionScores]) -> Result<PathBuf, IoError> {
        let path = self.path_for("scores.csv");
        let csv_err = |e: csv::Error| IoError::WriteCsv {
            path: path.clone(),
            source: e,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(SCORES_HEADER).map_err(csv_err)?;

        let cell = |v: Option<f64>| v.map_or_else(String::new, |x| format!("{x:.6}"));
        for s in scores {
            wtr.write_record([
                s.region.as_str().to_string(),
                s.year.to_string(),
                cell(s.exposure),
                cell(s.sensitivity),
                cell(s.adaptive_capacity),
                cell(s.icvi),
            ])
            .map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "scores written");
        Ok(path)
    }

    /// Write every weight set of `engine` to `{run}_weights.json`.
    ///
    /// Under per-year scope there is one entry per year of the panel;
    /// under panel scope a single pooled entry. A slice whose weighting
    /// failed is written with no weights and an `error` message.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_weights(&self, engine: &Engine) -> Result<PathBuf, IoError> {
        let path = self.path_for("weights.json");
        let scope = engine.config().weight_scope();
        let years: Vec<Year> = match scope {
            WeightScope::PerYear => engine.table().years().to_vec(),
            WeightScope::Panel => vec![engine.latest_year()],
        };

        let mut units = Vec::with_capacity(years.len());
        for year in years {
            let mut categories = BTreeMap::new();
            for category in Category::ALL {
                let entry = match engine.weights(category, year) {
                    Ok(set) => CategoryEntry {
                        fallback: set.is_fallback(),
                        indicators: set
                            .entries()
                            .iter()
                            .map(|e| IndicatorEntry {
                                indicator: e.key.as_str(),
                                entropy: e.entropy,
                                diversification: e.diversification,
                                weight: e.weight,
                            })
                            .collect(),
                        error: None,
                    },
                    Err(err) => CategoryEntry {
                        fallback: false,
                        indicators: Vec::new(),
                        error: Some(error_chain(&err)),
                    },
                };
                categories.insert(category.as_str(), entry);
            }
            let (icvi, icvi_fallback, icvi_error) = match engine.group_weights(year) {
                Ok(group) => (group.to_map(), group.is_fallback(), None),
                Err(err) => (BTreeMap::new(), false, Some(error_chain(&err))),
            };
            units.push(UnitEntry {
                unit: scope.unit_for(year).to_string(),
                categories,
                icvi,
                icvi_fallback,
                icvi_error,
            });
        }

        let artifact = WeightsArtifact {
            run: self.run.as_str(),
            scope: match scope {
                WeightScope::PerYear => "per_year",
                WeightScope::Panel => "panel",
            },
            icvi_rule: match engine.config().icvi_rule() {
                IcviRule::EqualWeights => "equal",
                IcviRule::Entropy => "entropy",
            },
            units,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "weights written");
        Ok(path)
    }

    /// Write drill-down breakdowns to `{run}_drilldown.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n = drilldowns.len()))]
    pub fn write_drilldowns(&self, drilldowns: &[Drilldown]) -> Result<PathBuf, IoError> {
        let path = self.path_for("drilldown.json");
        let artifact = DrilldownArtifact {
            run: self.run.as_str(),
            drilldowns,
        };
        self.write_json(&path, &artifact)?;

        info!(path = %path.display(), "drill-downs written");
        Ok(path)
    }
}

/// `err` and its causes joined with `": "`.
fn error_chain(err: &IndexError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ---------------------------------------------------------------------------
// Shadow structs for serialization
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WeightsArtifact<'a> {
    run: &'a str,
    scope: &'static str,
    icvi_rule: &'static str,
    units: Vec<UnitEntry<'a>>,
}

#[derive(Serialize)]
struct UnitEntry<'a> {
    unit: String,
    categories: BTreeMap<&'static str, CategoryEntry<'a>>,
    icvi: BTreeMap<String, f64>,
    icvi_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    icvi_error: Option<String>,
}

#[derive(Serialize)]
struct CategoryEntry<'a> {
    fallback: bool,
    indicators: Vec<IndicatorEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct IndicatorEntry<'a> {
    indicator: &'a str,
    entropy: f64,
    diversification: f64,
    weight: f64,
}

#[derive(Serialize)]
struct DrilldownArtifact<'a> {
    run: &'a str,
    drilldowns: &'a [Drilldown],
}
