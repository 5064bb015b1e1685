//! End-to-end runs of the tick loop through the public Strategy API.

mod common;

use common::*;
use quantkit::adapters::json_config_adapter::JsonConfigAdapter;
use quantkit::domain::algos::{self, rebalance::Rebalance};
use quantkit::domain::commission::QuantityCommission;
use quantkit::domain::config::AlgoSpec;
use quantkit::domain::frame::Frame;
use quantkit::domain::target::{AccountingSettings, DataSet, Target};
use quantkit::domain::universe::UniverseSource;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

fn spec(name: &str, params: Value) -> AlgoSpec {
    AlgoSpec {
        name: name.to_string(),
        params,
    }
}

mod empty_universe {
    use super::*;

    #[test]
    fn every_tick_runs_with_cash_only() {
        let prices = Frame::new(calendar(&[1, 2, 3]), vec![], vec![vec![], vec![], vec![]]).unwrap();
        let pipeline = vec![
            algos::build(&spec("SelectAll", Value::Null)).unwrap(),
            algos::build(&spec("WeighEqually", Value::Null)).unwrap(),
            algos::build(&spec("Rebalance", Value::Null)).unwrap(),
        ];
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0));

        let history = strategy.run(&calendar(&[1, 2, 3])).unwrap();
        assert_eq!(history.len(), 3);
        for row in history.rows() {
            assert!((row.value - 1_000.0).abs() < f64::EPSILON);
            assert!((row.cash - 1_000.0).abs() < f64::EPSILON);
            assert!(row.weights.is_empty());
        }
        assert!(strategy.target().positions().is_empty());
        assert!(strategy.target().fills().is_empty());
    }
}

mod buy_and_hold {
    use super::*;

    #[test]
    fn single_buy_is_held_and_marked() {
        let prices = wide_frame(&["A"], &[&[100.0], &[110.0], &[90.0]]);
        let pipeline = vec![
            weigh_on(d(1), weights(&[("A", 1.0)])),
            Box::new(Rebalance) as _,
        ];
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0));

        let history = strategy.run(&calendar(&[1, 2, 3])).unwrap();
        assert_eq!(history.values(), vec![1_000.0, 1_100.0, 900.0]);

        let target = strategy.target();
        assert!((target.quantity("A") - 10.0).abs() < 1e-12);
        assert!(target.cash().abs() < 1e-9);
        assert_eq!(target.fills().len(), 1);
        assert_eq!(target.fills()[0].date, d(1));
    }

    #[test]
    fn configured_pipeline_matches_closure_pipeline() {
        let prices = wide_frame(&["A"], &[&[100.0], &[110.0], &[90.0]]);
        let pipeline = algos::build_all(&[
            spec("RunOnce", Value::Null),
            spec("WeighSpecified", json!({"weights": {"A": 1.0}})),
            spec("Rebalance", Value::Null),
        ])
        .unwrap();
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0));

        let history = strategy.run(&calendar(&[1, 2, 3])).unwrap();
        assert_eq!(history.values(), vec![1_000.0, 1_100.0, 900.0]);
        assert_eq!(history.rows()[1].aborted_by.as_deref(), Some("RunOnce"));
    }
}

mod quantity_commission {
    use super::*;

    #[test]
    fn floor_fee_is_charged_per_leg() {
        let prices = wide_frame(&["A", "B"], &[&[50.0, 50.0]]);
        let target = make_target(DataSet::new(prices), 1_000.0)
            .with_commission(Box::new(QuantityCommission));
        let pipeline = vec![
            weigh_on(d(1), weights(&[("A", 0.5), ("B", 0.5)])),
            Box::new(Rebalance) as _,
        ];
        let mut strategy = make_strategy(pipeline, target);

        let history = strategy.run(&calendar(&[1])).unwrap();
        let row = &history.rows()[0];
        assert!((row.commissions - 200.0).abs() < 1e-9);
        assert!((row.cash - (-200.0)).abs() < 1e-9);
        assert!((row.value - 800.0).abs() < 1e-9);

        let target = strategy.target();
        assert!((target.quantity("A") - 10.0).abs() < 1e-12);
        assert!((target.quantity("B") - 10.0).abs() < 1e-12);
        assert!(target.fills().iter().all(|f| (f.commission - 100.0).abs() < 1e-12));
    }
}

mod abort {
    use super::*;

    #[test]
    fn aborted_pipeline_never_trades() {
        let prices = wide_frame(&["A", "B"], &[&[100.0, 50.0], &[110.0, 40.0], &[90.0, 60.0]]);
        let pipeline = algos::build_all(&[
            spec("SelectAll", Value::Null),
            spec("Abort", Value::Null),
            spec("WeighEqually", Value::Null),
            spec("Rebalance", Value::Null),
        ])
        .unwrap();
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0));

        let history = strategy.run(&calendar(&[1, 2, 3])).unwrap();
        assert_eq!(history.values(), vec![1_000.0; 3]);
        assert_eq!(history.aborted_ticks(), 3);
        assert!(
            history
                .rows()
                .iter()
                .all(|r| r.aborted_by.as_deref() == Some("Abort"))
        );
        assert!(strategy.target().positions().is_empty());
        assert!(strategy.target().fills().is_empty());
    }
}

mod stat_propagation {
    use super::*;

    #[test]
    fn weigher_sees_the_current_yield_row() {
        let prices = wide_frame(&["A", "B"], &[&[10.0, 20.0], &[11.0, 19.0], &[12.0, 18.0]]);
        let yields = wide_frame(&["A", "B"], &[&[2.0, 1.0], &[1.0, 3.0], &[4.0, 4.0]]);
        let expected: Vec<BTreeMap<String, f64>> =
            (1..=3).map(|day| yields.row(d(day))).collect();
        let data = DataSet::new(prices).with_series("yield", yields);

        let at_start = Rc::new(RefCell::new(Vec::new()));
        let before_weigh = Rc::new(RefCell::new(Vec::new()));
        let pipeline = vec![
            recorder("AtStart", at_start.clone(), |t| t.temp().is_empty()),
            algos::build(&spec("SetStat", json!({"series": "yield"}))).unwrap(),
            recorder("BeforeWeigh", before_weigh.clone(), |t| t.temp().stat.clone()),
            algos::build(&spec("WeighByStat", Value::Null)).unwrap(),
            algos::build(&spec("Rebalance", Value::Null)).unwrap(),
        ];
        let mut strategy = make_strategy(pipeline, make_target(data, 1_000.0));
        strategy.run(&calendar(&[1, 2, 3])).unwrap();

        assert_eq!(*at_start.borrow(), vec![true, true, true]);
        let seen: Vec<BTreeMap<String, f64>> = before_weigh
            .borrow()
            .iter()
            .map(|stat| stat.clone().unwrap())
            .collect();
        assert_eq!(seen, expected);

        // Equal yields on the last tick give equal weights.
        let last = strategy.history().last().unwrap();
        assert!((last.weights["A"] - 0.5).abs() < 1e-9);
        assert!((last.weights["B"] - 0.5).abs() < 1e-9);
    }
}

mod config_override {
    use super::*;

    #[test]
    fn local_file_is_deep_merged_over_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(dir.path(), "base.json", r#"{"a": 1, "b": {"c": 2, "d": 3}}"#);
        let local = write_file(dir.path(), "local.json", r#"{"b": {"c": 9}}"#);

        let merged = JsonConfigAdapter::layered(&base, Some(&local))
            .unwrap()
            .into_value();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 9, "d": 3}}));
    }

    #[test]
    fn base_alone_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_file(dir.path(), "base.json", r#"{"a": 1, "b": {"c": 2, "d": 3}}"#);

        let merged = JsonConfigAdapter::layered(&base, None).unwrap().into_value();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 2, "d": 3}}));
    }
}

mod universe_membership {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positions_stay_within_universe_or_prior_holdings() {
        let prices = wide_frame(&["A", "X"], &[&[10.0, 20.0], &[11.0, 21.0], &[12.0, 22.0]]);
        let universe_log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = vec![
            recorder("Universe", universe_log.clone(), |t| t.universe().clone()),
            algos::build(&spec("WeighSpecified", json!({"weights": {"A": 0.5, "X": 0.5}}))).unwrap(),
            algos::build(&spec("Rebalance", Value::Null)).unwrap(),
        ];
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0))
            .with_universe(UniverseSource::Static(ids(&["A"])));

        strategy.run(&calendar(&[1, 2, 3])).unwrap();

        assert_eq!(*universe_log.borrow(), vec![ids(&["A"]); 3]);
        assert!(strategy.target().position("X").is_none());
        assert!(strategy.target().fills().iter().all(|f| f.id == "A"));
        let held: BTreeSet<String> = strategy.target().positions().keys().cloned().collect();
        assert!(held.is_subset(&ids(&["A"])));
    }

    #[test]
    fn select_these_respects_schedule() {
        let prices = wide_frame(&["A", "B"], &[&[10.0, 20.0], &[10.0, 20.0]]);
        let schedule = BTreeMap::from([(d(1), ids(&["A"])), (d(2), ids(&["A", "B"]))]);
        let pipeline = algos::build_all(&[
            spec("SelectThese", json!({"ids": ["A", "B"]})),
            spec("WeighEqually", Value::Null),
            spec("Rebalance", Value::Null),
        ])
        .unwrap();
        let mut strategy = make_strategy(pipeline, make_target(DataSet::new(prices), 1_000.0))
            .with_universe(UniverseSource::Schedule(schedule));

        let history = strategy.run(&calendar(&[1, 2])).unwrap();
        assert_eq!(history.rows()[0].weights.keys().collect::<Vec<_>>(), vec!["A"]);
        assert!((history.rows()[1].weights["B"] - 0.5).abs() < 1e-9);
    }
}

mod missing_prices {
    use super::*;

    fn liquidating_target(prices: Frame) -> Target {
        let settings = AccountingSettings {
            starting_cash: 1_000.0,
            liquidate_delisted: true,
            ..Default::default()
        };
        Target::new(DataSet::new(prices), settings)
    }

    #[test]
    fn one_day_gap_keeps_position_when_liquidating_delisted() {
        let prices = wide_frame(&["A"], &[&[100.0], &[f64::NAN], &[120.0]]);
        let pipeline = vec![
            weigh_on(d(1), weights(&[("A", 1.0)])),
            Box::new(Rebalance) as _,
        ];
        let mut strategy = make_strategy(pipeline, liquidating_target(prices));

        let history = strategy.run(&calendar(&[1, 2, 3])).unwrap();
        let values = history.values();
        assert!((values[1] - 1_000.0).abs() < 1e-9);
        assert!((values[2] - 1_200.0).abs() < 1e-9);

        let target = strategy.target();
        assert_eq!(target.fills().len(), 1);
        assert!((target.quantity("A") - 10.0).abs() < 1e-12);
    }

    #[test]
    fn unpriced_id_is_not_traded_on_the_gap_day() {
        let prices = wide_frame(&["A", "B"], &[&[100.0, 50.0], &[f64::NAN, 50.0], &[100.0, 50.0]]);
        let pipeline = vec![
            weigh_on(d(1), weights(&[("A", 0.5), ("B", 0.5)])),
            weigh_on(d(2), weights(&[("B", 1.0)])),
            Box::new(Rebalance) as _,
        ];
        let mut strategy = make_strategy(pipeline, liquidating_target(prices));
        strategy.run(&calendar(&[1, 2])).unwrap();

        let target = strategy.target();
        assert!((target.quantity("A") - 5.0).abs() < 1e-12);
        assert!(target.fills().iter().all(|f| f.date == d(1) || f.id == "B"));
    }
}
