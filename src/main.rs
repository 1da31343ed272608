use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use icvi_index::{
    Category, DegenerateFallback, DpsirShare, Drilldown, Engine, EngineConfig, Group, IcviRule,
    IndicatorTable, IndicatorWeights, Selector, WeightScope, Year, ZeroVariance,
};
use icvi_io::provinces::normalize_name;
use icvi_io::{BoundaryReader, IndicatorReader, RegionMatch, ResultWriter, RunName, match_regions};

#[derive(Parser)]
#[command(name = "icvi")]
#[command(about = "Entropy-weighted integrated climate vulnerability index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for weight precomputation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input panel location and validation options.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the long-format indicator CSV
    #[arg(long)]
    data: PathBuf,

    /// First accepted year
    #[arg(long, default_value_t = icvi_index::FIRST_YEAR)]
    first_year: Year,

    /// Last accepted year
    #[arg(long, default_value_t = icvi_index::LAST_YEAR)]
    last_year: Year,

    /// Reject provinces outside the 38 ADM1 names instead of warning
    #[arg(long, default_value_t = false)]
    strict_provinces: bool,
}

/// Shared engine parameters.
#[derive(Args, Debug, Clone)]
struct EngineArgs {
    /// Unit of analysis for normalization and weights: "per-year" or "panel"
    #[arg(long, default_value = "per-year")]
    scope: String,

    /// Zero-variance indicators: "reject" or a constant in [0, 1]
    #[arg(long, default_value = "reject")]
    zero_variance: String,

    /// Groups with no diversification: "reject" or "equal"
    #[arg(long, default_value = "reject")]
    degenerate: String,

    /// ICVI aggregation of the three categories: "equal" or "entropy"
    #[arg(long, default_value = "equal")]
    icvi_rule: String,
}

#[derive(Subcommand)]
enum Command {
    /// Compute scores and weights for every region and write result files
    Compute {
        #[command(flatten)]
        input: InputArgs,

        /// Only compute this year (defaults to every year in the panel)
        #[arg(long)]
        year: Option<Year>,

        /// Run name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        run: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print indicator and category weights for one year
    Weights {
        #[command(flatten)]
        input: InputArgs,

        /// Year (defaults to the latest year in the data)
        #[arg(long)]
        year: Option<Year>,

        /// Only print this category
        #[arg(long)]
        category: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print one composite score
    Composite {
        #[command(flatten)]
        input: InputArgs,

        /// Province name (any spelling variant)
        #[arg(long)]
        region: String,

        /// "exposure", "sensitivity", "adaptive_capacity" or "icvi"
        #[arg(long, default_value = "icvi")]
        group: String,

        /// Year (defaults to the latest year in the data)
        #[arg(long)]
        year: Option<Year>,

        /// Average over every year of the panel instead of one year
        #[arg(long, default_value_t = false)]
        average: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print per-indicator contributions for a category or DPSIR class
    Drilldown {
        #[command(flatten)]
        input: InputArgs,

        /// Province name (any spelling variant)
        #[arg(long)]
        region: String,

        /// Category name or DPSIR class
        #[arg(long)]
        selector: String,

        /// Year (defaults to the latest year in the data)
        #[arg(long)]
        year: Option<Year>,

        /// Also write `{run}_drilldown.json`
        #[arg(long)]
        run: Option<String>,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the DPSIR decomposition of a region's ICVI
    Decompose {
        #[command(flatten)]
        input: InputArgs,

        /// Province name (any spelling variant)
        #[arg(long)]
        region: String,

        /// Year (defaults to the latest year in the data)
        #[arg(long)]
        year: Option<Year>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Report which panel regions join to GeoJSON boundary features
    MatchBoundaries {
        #[command(flatten)]
        input: InputArgs,

        /// Path to the GeoJSON boundary file
        #[arg(long)]
        boundaries: PathBuf,

        /// Feature property holding the province name
        #[arg(long, default_value = icvi_io::DEFAULT_NAME_PROPERTY)]
        name_property: String,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct ComputeOutput {
    run: String,
    n_regions: usize,
    n_indicators: usize,
    years: Vec<Year>,
    n_unresolved: usize,
    scores_path: PathBuf,
    weights_path: PathBuf,
    top_regions: Vec<RankedRegion>,
}

#[derive(Serialize)]
struct RankedRegion {
    region: String,
    year: Year,
    icvi: f64,
}

#[derive(Serialize)]
struct WeightsOutput<'a> {
    year: Year,
    unit: String,
    categories: Vec<&'a IndicatorWeights>,
    icvi: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct CompositeOutput {
    region: String,
    group: String,
    year: Option<Year>,
    score: f64,
}

#[derive(Serialize)]
struct DecomposeOutput {
    region: String,
    year: Year,
    icvi: f64,
    classes: Vec<DpsirShare>,
}

#[derive(Serialize)]
struct MatchOutput {
    n_regions: usize,
    n_boundaries: usize,
    complete: bool,
    #[serde(flatten)]
    result: RegionMatch,
}

fn parse_scope(s: &str) -> Result<WeightScope> {
    match s {
        "per-year" | "per_year" | "year" => Ok(WeightScope::PerYear),
        "panel" => Ok(WeightScope::Panel),
        other => anyhow::bail!("unknown scope: {other} (expected per-year or panel)"),
    }
}

fn parse_zero_variance(s: &str) -> Result<ZeroVariance> {
    if s == "reject" {
        return Ok(ZeroVariance::Reject);
    }
    let c: f64 = s
        .parse()
        .with_context(|| format!("zero-variance must be \"reject\" or a number, got {s}"))?;
    Ok(ZeroVariance::Constant(c))
}

fn parse_degenerate(s: &str) -> Result<DegenerateFallback> {
    match s {
        "reject" => Ok(DegenerateFallback::Reject),
        "equal" => Ok(DegenerateFallback::EqualWeights),
        other => anyhow::bail!("unknown degenerate fallback: {other} (expected reject or equal)"),
    }
}

fn parse_icvi_rule(s: &str) -> Result<IcviRule> {
    match s {
        "equal" => Ok(IcviRule::EqualWeights),
        "entropy" => Ok(IcviRule::Entropy),
        other => anyhow::bail!("unknown ICVI rule: {other} (expected equal or entropy)"),
    }
}

fn read_panel(input: &InputArgs) -> Result<IndicatorTable> {
    IndicatorReader::new(&input.data)
        .with_year_range(input.first_year, input.last_year)
        .with_strict_provinces(input.strict_provinces)
        .read()
        .context("failed to read indicator CSV")
}

fn build_engine(input: &InputArgs, args: &EngineArgs) -> Result<Engine> {
    let config = EngineConfig::new()
        .with_weight_scope(parse_scope(&args.scope)?)
        .with_zero_variance(parse_zero_variance(&args.zero_variance)?)
        .with_degenerate_fallback(parse_degenerate(&args.degenerate)?)
        .with_icvi_rule(parse_icvi_rule(&args.icvi_rule)?);
    let table = read_panel(input)?;
    config.build(table).context("failed to build index")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Compute {
            input,
            year,
            run,
            output_dir,
            engine,
        } => {
            let run_name = RunName::new(run.clone())?;
            let engine = build_engine(&input, &engine)?;
            let years: Vec<Year> = match year {
                Some(y) => vec![y],
                None => engine.table().years().to_vec(),
            };

            let mut scores = Vec::new();
            for &y in &years {
                scores.extend(
                    engine
                        .year_scores(y)
                        .with_context(|| format!("failed to score year {y}"))?,
                );
            }

            let writer = ResultWriter::new(&output_dir, run_name)?;
            let scores_path = writer.write_scores(&scores)?;
            let weights_path = writer.write_weights(&engine)?;

            let latest = years.iter().copied().max().unwrap_or(engine.latest_year());
            let mut top_regions: Vec<RankedRegion> = scores
                .iter()
                .filter(|s| s.year == latest)
                .filter_map(|s| {
                    s.icvi.map(|icvi| RankedRegion {
                        region: s.region.as_str().to_string(),
                        year: s.year,
                        icvi,
                    })
                })
                .collect();
            top_regions.sort_by(|a, b| b.icvi.total_cmp(&a.icvi));
            top_regions.truncate(5);

            let output = ComputeOutput {
                run,
                n_regions: engine.table().regions().len(),
                n_indicators: engine.table().indicators().len(),
                years,
                n_unresolved: scores.iter().filter(|s| s.icvi.is_none()).count(),
                scores_path,
                weights_path,
                top_regions,
            };
            print_json(&output)?;
        }

        Command::Weights {
            input,
            year,
            category,
            engine,
        } => {
            let engine = build_engine(&input, &engine)?;
            let year = year.unwrap_or(engine.latest_year());
            let categories: Vec<Category> = match category {
                Some(c) => vec![c.parse().context("invalid --category")?],
                None => Category::ALL.to_vec(),
            };

            let sets = categories
                .into_iter()
                .map(|c| engine.weights(c, year))
                .collect::<Result<Vec<_>, _>>()
                .context("weights lookup failed")?;
            let group = engine.group_weights(year)?;

            let output = WeightsOutput {
                year,
                unit: engine.config().weight_scope().unit_for(year).to_string(),
                categories: sets,
                icvi: group.to_map(),
            };
            print_json(&output)?;
        }

        Command::Composite {
            input,
            region,
            group,
            year,
            average,
            engine,
        } => {
            let engine = build_engine(&input, &engine)?;
            let group: Group = group.parse().context("invalid --group")?;
            let key = normalize_name(&region);

            let (year, score) = if average {
                let score = engine
                    .period_average(&key, group)
                    .with_context(|| format!("no period average for {region}"))?;
                (None, score)
            } else {
                let y = year.unwrap_or(engine.latest_year());
                let score = engine
                    .composite(&key, y, group)
                    .with_context(|| format!("no {group} score for {region} in {y}"))?;
                (Some(y), score)
            };

            let output = CompositeOutput {
                region: key,
                group: group.to_string(),
                year,
                score,
            };
            print_json(&output)?;
        }

        Command::Drilldown {
            input,
            region,
            selector,
            year,
            run,
            output_dir,
            engine,
        } => {
            let engine = build_engine(&input, &engine)?;
            let selector: Selector = selector.parse().context("invalid --selector")?;
            let key = normalize_name(&region);
            let year = year.unwrap_or(engine.latest_year());

            let drilldown: Drilldown = engine
                .drilldown(&key, year, selector)
                .with_context(|| format!("drill-down failed for {region} in {year}"))?;

            if let Some(run) = run {
                let writer = ResultWriter::new(&output_dir, RunName::new(run)?)?;
                writer.write_drilldowns(std::slice::from_ref(&drilldown))?;
            }
            print_json(&drilldown)?;
        }

        Command::Decompose {
            input,
            region,
            year,
            engine,
        } => {
            let engine = build_engine(&input, &engine)?;
            let key = normalize_name(&region);
            let year = year.unwrap_or(engine.latest_year());

            let icvi = engine
                .composite(&key, year, Group::Icvi)
                .with_context(|| format!("no ICVI for {region} in {year}"))?;
            let classes = engine.dpsir_decomposition(&key, year)?;

            let output = DecomposeOutput {
                region: key,
                year,
                icvi,
                classes,
            };
            print_json(&output)?;
        }

        Command::MatchBoundaries {
            input,
            boundaries,
            name_property,
        } => {
            let table = read_panel(&input)?;
            let names = BoundaryReader::new(&boundaries)
                .with_name_property(name_property)
                .read()
                .context("failed to read boundary GeoJSON")?;

            let result = match_regions(table.regions(), &names);
            let output = MatchOutput {
                n_regions: table.regions().len(),
                n_boundaries: names.len(),
                complete: result.is_complete(),
                result,
            };
            print_json(&output)?;
        }
    }

    Ok(())
}
