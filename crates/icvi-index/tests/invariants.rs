//! Invariant regression tests for icvi-index.
//!
//! These tests build engines over deterministic random panels and check the
//! range, normalization and idempotence guarantees of every output.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use icvi_index::{
    Category, DataError, Dpsir, EngineConfig, Group, IcviRule, IndexError, IndicatorId, IndicatorMeta,
    IndicatorTable, Polarity, Region, Selector, WeightScope, ZeroVariance, entropy_weights,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic panel
// ---------------------------------------------------------------------------

/// 34 provinces × 10 years × 9 indicators (3 per category).
///
/// Values are uniform in [0, 100); a fraction `missing` of cells is left out.
fn make_panel(seed: u64, missing: f64) -> IndicatorTable {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut b = IndicatorTable::builder();
    let mut ids = Vec::new();
    for (c, category) in Category::ALL.into_iter().enumerate() {
        for k in 0..3 {
            let id = format!("{}_{k}", category.as_str());
            let polarity = if rng.r#gen::<bool>() {
                Polarity::Positive
            } else {
                Polarity::Negative
            };
            let dpsir = Dpsir::ALL[(c + k) % Dpsir::ALL.len()];
            b.register(IndicatorMeta::new(id.clone(), category, dpsir, polarity))
                .unwrap();
            ids.push(id);
        }
    }
    for p in 0..34 {
        let region = Region::new(format!("province_{p:02}"));
        for year in 2014..=2023 {
            for id in &ids {
                let value = if rng.r#gen::<f64>() < missing {
                    None
                } else {
                    Some(rng.r#gen::<f64>() * 100.0)
                };
                b.insert(region.clone(), year, id, value).unwrap();
            }
        }
    }
    b.build().unwrap()
}

const GROUPS: [Group; 4] = [
    Group::Category(Category::Exposure),
    Group::Category(Category::Sensitivity),
    Group::Category(Category::AdaptiveCapacity),
    Group::Icvi,
];

// ---------------------------------------------------------------------------
// a) normalized values lie in [0, 1]
// ---------------------------------------------------------------------------

#[test]
fn normalized_values_in_unit_interval() {
    for scope in [WeightScope::PerYear, WeightScope::Panel] {
        let engine = EngineConfig::new()
            .with_weight_scope(scope)
            .build(make_panel(42, 0.0))
            .unwrap();
        assert_eq!(engine.normalized().iter_present().count(), 34 * 10 * 9);
        for v in engine.normalized().iter_present() {
            assert!((0.0..=1.0).contains(&v), "{scope:?}: normalized value {v}");
        }
    }
}

// ---------------------------------------------------------------------------
// b) weights are non-negative and sum to 1
// ---------------------------------------------------------------------------

#[test]
fn weights_sum_to_one() {
    for rule in [IcviRule::EqualWeights, IcviRule::Entropy] {
        let engine = EngineConfig::new()
            .with_icvi_rule(rule)
            .build(make_panel(7, 0.0))
            .unwrap();
        for &year in engine.table().years() {
            for category in Category::ALL {
                let ws = engine.weights(category, year).unwrap();
                assert!((ws.total() - 1.0).abs() < 1e-9, "{category} {year}: {}", ws.total());
                assert!(ws.entries().iter().all(|e| e.weight >= 0.0));
            }
            let gw = engine.group_weights(year).unwrap();
            assert!((gw.total() - 1.0).abs() < 1e-9);
        }
    }
}

// ---------------------------------------------------------------------------
// c) composites lie in [0, 1] and are bit-identical across snapshots
// ---------------------------------------------------------------------------

#[test]
fn composites_in_range_and_idempotent() {
    let config = EngineConfig::new().with_icvi_rule(IcviRule::Entropy);
    let first = config.build(make_panel(99, 0.0)).unwrap();
    let second = config.build(make_panel(99, 0.0)).unwrap();
    for region in first.table().regions() {
        for &year in first.table().years() {
            for group in GROUPS {
                let a = first.composite(region.as_str(), year, group).unwrap();
                let b = second.composite(region.as_str(), year, group).unwrap();
                assert!((0.0..=1.0).contains(&a), "{region} {year} {group}: {a}");
                assert_eq!(a.to_bits(), b.to_bits(), "{region} {year} {group}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// d) missing data never yields partial composites
// ---------------------------------------------------------------------------

#[test]
fn missing_cells_fail_only_their_groups() {
    let engine = EngineConfig::new().build(make_panel(3, 0.05)).unwrap();
    let year = engine.latest_year();
    let mut n_failed = 0;
    for scores in engine.year_scores(year).unwrap() {
        let region = scores.region.as_str();
        for category in Category::ALL {
            let direct = engine.composite(region, year, category.into());
            let all_present = engine
                .table()
                .indicators()
                .iter()
                .filter(|m| m.category == category)
                .all(|m| engine.table().value(region, year, m.id.as_str()).unwrap().is_some());
            assert_eq!(direct.is_ok(), all_present, "{region} {category}");
            if let Err(err) = direct {
                n_failed += 1;
                assert!(matches!(err, IndexError::Data(DataError::MissingValue { .. })));
            }
        }
        let icvi_ok = scores.exposure.is_some()
            && scores.sensitivity.is_some()
            && scores.adaptive_capacity.is_some();
        assert_eq!(scores.icvi.is_some(), icvi_ok);
    }
    assert!(n_failed > 0, "fixture should contain missing cells");
}

// ---------------------------------------------------------------------------
// e) drill-down ordering and totals
// ---------------------------------------------------------------------------

#[test]
fn drilldown_sorted_and_consistent() {
    let engine = EngineConfig::new().build(make_panel(11, 0.0)).unwrap();
    for category in Category::ALL {
        let d = engine
            .drilldown("province_05", 2019, Selector::Category(category))
            .unwrap();
        assert_eq!(d.records.len(), 3);
        for pair in d.records.windows(2) {
            assert!(pair[0].contribution >= pair[1].contribution);
        }
        for rec in &d.records {
            assert!((rec.contribution - rec.weight * rec.normalized).abs() < 1e-15);
            assert!(rec.raw.is_finite());
        }
        let composite = engine.composite("province_05", 2019, category.into()).unwrap();
        assert_eq!(d.total, composite);
    }
    let shares = engine.dpsir_decomposition("province_05", 2019).unwrap();
    let icvi = engine.composite("province_05", 2019, Group::Icvi).unwrap();
    let total: f64 = shares.iter().map(|s| s.contribution).sum();
    assert!((total - icvi).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// f) entropy examples
// ---------------------------------------------------------------------------

#[test]
fn uniform_indicator_gets_zero_weight() {
    let columns = vec![
        ("A".to_string(), vec![0.2, 0.5, 0.9]),
        ("B".to_string(), vec![0.5, 0.5, 0.5]),
    ];
    let ws = entropy_weights("exposure", &columns).unwrap();
    assert_eq!(ws.get(&"A".to_string()), Some(1.0));
    assert_eq!(ws.get(&"B".to_string()), Some(0.0));
}

#[test]
fn constant_indicator_with_fallback_gets_zero_weight() {
    // every province reports the same value for "flat" in 2020
    let mut b = IndicatorTable::builder();
    for (id, category) in [
        ("flat", Category::Exposure),
        ("rain", Category::Exposure),
        ("poverty", Category::Sensitivity),
        ("clinics", Category::AdaptiveCapacity),
    ] {
        b.register(IndicatorMeta::new(id, category, Dpsir::State, Polarity::Positive))
            .unwrap();
        for (p, value) in [1.0, 4.0, 2.0, 8.0].into_iter().enumerate() {
            let v = if id == "flat" { 3.0 } else { value };
            b.insert(Region::new(format!("p{p}")), 2020, id, Some(v)).unwrap();
        }
    }
    let table = b.build().unwrap();

    // strict mode confines the failure to exposure in 2020
    let strict = EngineConfig::new().build(table.clone()).unwrap();
    match strict.composite("p0", 2020, Category::Exposure.into()) {
        Err(IndexError::Slice { source, .. }) => assert!(matches!(
            *source,
            IndexError::Data(DataError::ZeroVariance { .. })
        )),
        other => panic!("expected zero-variance slice error, got {other:?}"),
    }
    assert!(strict.composite("p0", 2020, Category::Sensitivity.into()).is_ok());

    let engine = EngineConfig::new()
        .with_zero_variance(ZeroVariance::Constant(0.0))
        .build(table)
        .unwrap();
    let ws = engine.weights(Category::Exposure, 2020).unwrap();
    assert_eq!(ws.get(&IndicatorId::new("flat")), Some(0.0));
    assert_eq!(ws.get(&IndicatorId::new("rain")), Some(1.0));
}

// ---------------------------------------------------------------------------
// g) worked drill-down example: weights 0.3 / 0.7, values 0.4 / 0.6
// ---------------------------------------------------------------------------

#[test]
fn two_indicator_drilldown_example() {
    // raw values already span [0, 1], so normalized == raw; the fifth
    // "hazard" value tunes its diversification to exactly 3/7 of "floods"
    let columns: [(&str, Category, [f64; 5]); 4] = [
        ("hazard", Category::Exposure, [0.4, 0.0, 1.0, 0.5, 0.148_125_425_555_390_2]),
        ("floods", Category::Exposure, [0.6, 0.0, 1.0, 0.0, 0.0]),
        ("poverty", Category::Sensitivity, [0.2, 0.9, 0.4, 0.1, 0.7]),
        ("clinics", Category::AdaptiveCapacity, [0.5, 0.3, 0.8, 0.6, 0.1]),
    ];
    let regions = ["aceh", "bali", "jambi", "papua", "riau"];
    let mut b = IndicatorTable::builder();
    for (id, category, values) in columns {
        b.register(IndicatorMeta::new(id, category, Dpsir::Impact, Polarity::Positive))
            .unwrap();
        for (region, value) in regions.iter().zip(values) {
            b.insert(Region::new(*region), 2023, id, Some(value)).unwrap();
        }
    }
    let engine = EngineConfig::new().build(b.build().unwrap()).unwrap();

    let ws = engine.weights(Category::Exposure, 2023).unwrap();
    assert!((ws.get(&IndicatorId::new("hazard")).unwrap() - 0.3).abs() < 1e-9);
    assert!((ws.get(&IndicatorId::new("floods")).unwrap() - 0.7).abs() < 1e-9);

    let d = engine
        .drilldown("aceh", 2023, Selector::Category(Category::Exposure))
        .unwrap();
    assert!((d.total - 0.54).abs() < 1e-9, "total {}", d.total);
    assert_eq!(d.records.len(), 2);
    assert_eq!(d.records[0].indicator.as_str(), "floods");
    assert!((d.records[0].contribution - 0.42).abs() < 1e-9);
    assert_eq!(d.records[1].indicator.as_str(), "hazard");
    assert!((d.records[1].contribution - 0.12).abs() < 1e-9);
    assert_eq!(d.records[0].normalized, 0.6);
    assert_eq!(d.records[1].normalized, 0.4);
}
