//! End-to-end integration tests: CSV -> engine -> CSV/JSON -> read back.

use std::fs;
use std::path::{Path, PathBuf};

use icvi_index::{Category, EngineConfig, Group, Selector, WeightScope};
use icvi_io::{BoundaryReader, IndicatorReader, ResultWriter, RunName, match_regions};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn fixture_panel_loads_with_harmonized_names() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .with_strict_provinces(true)
        .read()
        .expect("fixture should parse");

    let names: Vec<&str> = table.regions().iter().map(|r| r.as_str()).collect();
    assert_eq!(
        names,
        vec!["aceh", "bali", "jakarta", "kepulauan riau", "papua", "yogyakarta"]
    );
    assert_eq!(table.years(), &[2022, 2023]);
    assert_eq!(table.indicators().len(), 6);
    assert_eq!(table.n_missing(), 1);
    assert_eq!(table.latest_year(), 2023);
}

#[test]
fn scores_round_trip() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .read()
        .unwrap();
    let engine = EngineConfig::new().build(table).unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), RunName::new("scores_rt".into()).unwrap()).unwrap();
    let mut scores = engine.year_scores(2022).unwrap();
    scores.extend(engine.year_scores(2023).unwrap());
    let path = writer.write_scores(&scores).unwrap();
    assert_eq!(path, dir.path().join("scores_rt_scores.csv"));

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        header,
        ["province", "year", "exposure", "sensitivity", "adaptive_capacity", "ICVI"]
    );

    let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 12);
    for row in &rows {
        let icvi = &row[5];
        if &row[0] == "papua" && &row[1] == "2022" {
            // adaptive capacity is missing one indicator
            assert_eq!(&row[4], "");
            assert_eq!(icvi, "");
            assert!(!row[2].is_empty());
        } else {
            let v: f64 = icvi.parse().unwrap();
            assert!((0.0..=1.0).contains(&v), "ICVI {v} out of range");
        }
    }

    let jakarta = engine.composite("jakarta", 2023, Group::Icvi).unwrap();
    let written = rows
        .iter()
        .find(|r| &r[0] == "jakarta" && &r[1] == "2023")
        .unwrap();
    let parsed: f64 = written[5].parse().unwrap();
    assert!((parsed - jakarta).abs() < 1e-6);
}

#[test]
fn weights_json_per_year() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .read()
        .unwrap();
    let engine = EngineConfig::new().build(table).unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), RunName::new("w".into()).unwrap()).unwrap();
    let path = writer.write_weights(&engine).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["run"], "w");
    assert_eq!(content["scope"], "per_year");
    assert_eq!(content["icvi_rule"], "equal");

    let units = content["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0]["unit"], "year 2022");
    for unit in units {
        for category in ["exposure", "sensitivity", "adaptive_capacity"] {
            let indicators = unit["categories"][category]["indicators"].as_array().unwrap();
            assert_eq!(indicators.len(), 2);
            let total: f64 = indicators
                .iter()
                .map(|e| e["weight"].as_f64().unwrap())
                .sum();
            assert!((total - 1.0).abs() < 1e-9, "{category} weights sum to {total}");
        }
        let icvi = unit["icvi"].as_object().unwrap();
        assert_eq!(icvi.len(), 3);
        for w in icvi.values() {
            assert!((w.as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-12);
        }
    }
}

#[test]
fn weights_json_records_failed_slice() {
    let fixture = fs::read_to_string(fixture_path("panel_6x2.csv")).unwrap();
    let csv: String = fixture
        .lines()
        .map(|line| {
            let mut cells: Vec<&str> = line.split(',').collect();
            if cells[1] == "2022" && cells[2] == "heat_days" {
                cells[3] = "NA";
            }
            cells.join(",") + "\n"
        })
        .collect();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sparse.csv");
    fs::write(&input, csv).unwrap();

    let table = IndicatorReader::new(&input).read().unwrap();
    let engine = EngineConfig::new().build(table).unwrap();
    let writer = ResultWriter::new(dir.path(), RunName::new("sparse".into()).unwrap()).unwrap();
    let path = writer.write_weights(&engine).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let units = content["units"].as_array().unwrap();
    assert_eq!(units.len(), 2);

    let exposure = &units[0]["categories"]["exposure"];
    assert!(exposure["indicators"].as_array().unwrap().is_empty());
    let message = exposure["error"].as_str().unwrap();
    assert!(message.contains("heat_days"), "{message}");
    assert!(units[0]["categories"]["sensitivity"].get("error").is_none());

    let later = &units[1]["categories"]["exposure"];
    assert!(later.get("error").is_none());
    assert_eq!(later["indicators"].as_array().unwrap().len(), 2);

    let scores = engine.year_scores(2022).unwrap();
    assert!(scores.iter().all(|s| s.exposure.is_none() && s.icvi.is_none()));
    assert!(scores.iter().any(|s| s.sensitivity.is_some()));
}

#[test]
fn weights_json_panel_scope() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .read()
        .unwrap();
    let engine = EngineConfig::new()
        .with_weight_scope(WeightScope::Panel)
        .build(table)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), RunName::new("panel".into()).unwrap()).unwrap();
    let path = writer.write_weights(&engine).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["scope"], "panel");
    let units = content["units"].as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["unit"], "panel");
}

#[test]
fn drilldown_json() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .read()
        .unwrap();
    let engine = EngineConfig::new().build(table).unwrap();
    let drilldowns = vec![
        engine
            .drilldown("bali", 2023, Selector::Category(Category::Exposure))
            .unwrap(),
        engine
            .drilldown("bali", 2023, "response".parse().unwrap())
            .unwrap(),
    ];

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), RunName::new("dd".into()).unwrap()).unwrap();
    let path = writer.write_drilldowns(&drilldowns).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let written = content["drilldowns"].as_array().unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(written[0]["region"], "bali");
    assert_eq!(written[0]["selector"], "exposure");
    assert_eq!(written[1]["selector"], "response");

    let records = written[0]["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    let first = records[0]["contribution"].as_f64().unwrap();
    let second = records[1]["contribution"].as_f64().unwrap();
    assert!(first >= second);

    let exposure = engine
        .composite("bali", 2023, Group::Category(Category::Exposure))
        .unwrap();
    assert!((written[0]["total"].as_f64().unwrap() - exposure).abs() < 1e-12);
}

#[test]
fn boundaries_match_panel() {
    let table = IndicatorReader::new(&fixture_path("panel_6x2.csv"))
        .read()
        .unwrap();
    let names = BoundaryReader::new(&fixture_path("boundaries_adm1.geojson"))
        .read()
        .unwrap();
    assert_eq!(names.len(), 7);

    let m = match_regions(table.regions(), &names);
    assert_eq!(m.matched.len(), 6);
    assert_eq!(m.unmatched_boundaries, vec!["West Papua".to_string()]);
    assert!(m.unmatched_regions.is_empty());
}

#[test]
fn invalid_run_name_rejected() {
    assert!(RunName::new("bad name".into()).is_err());
}
