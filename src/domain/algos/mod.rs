//! Built-in Algo families and the name → Algo factory.

pub mod diagnostics;
pub mod flow;
pub mod rebalance;
pub mod select;
pub mod stat;
pub mod weigh;

use crate::domain::algo::Algo;
use crate::domain::config::AlgoSpec;
use crate::domain::error::QuantkitError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Every name [`build`] accepts.
pub const ALGO_NAMES: [&str; 20] = [
    "RunOnce",
    "RunEveryNPeriods",
    "RunOnDate",
    "RunMonthly",
    "RunAfterDate",
    "Abort",
    "SelectAll",
    "SelectThese",
    "SelectWhere",
    "SelectN",
    "SetStat",
    "StatTotalReturn",
    "StatEwmaReturn",
    "WeighEqually",
    "WeighSpecified",
    "WeighByStat",
    "WeighInvVol",
    "WeighHrp",
    "Rebalance",
    "Debug",
];

pub fn is_known(name: &str) -> bool {
    ALGO_NAMES.contains(&name)
}

fn params<T: DeserializeOwned>(spec: &AlgoSpec) -> Result<T, QuantkitError> {
    let value = match &spec.params {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| QuantkitError::ConfigInvalid {
        section: "strategy".to_string(),
        key: spec.name.clone(),
        reason: e.to_string(),
    })
}

/// Longest trailing window an Algo accepts, in periods.
pub const MAX_LOOKBACK: usize = 100_000;

/// Check `lookback` lies in `min..=MAX_LOOKBACK`.
pub(crate) fn check_lookback(algo: &str, lookback: usize, min: usize) -> Result<usize, QuantkitError> {
    if !(min..=MAX_LOOKBACK).contains(&lookback) {
        return Err(QuantkitError::ConfigInvalid {
            section: "strategy".into(),
            key: format!("{algo}.lookback"),
            reason: format!("lookback must be between {min} and {MAX_LOOKBACK}"),
        });
    }
    Ok(lookback)
}

/// Instantiate the Algo named by `spec` with its parameters.
pub fn build(spec: &AlgoSpec) -> Result<Box<dyn Algo>, QuantkitError> {
    let algo: Box<dyn Algo> = match spec.name.as_str() {
        "RunOnce" => Box::new(flow::RunOnce::default()),
        "RunEveryNPeriods" => Box::new(flow::RunEveryNPeriods::new(params(spec)?)?),
        "RunOnDate" => Box::new(flow::RunOnDate::new(params(spec)?)),
        "RunMonthly" => Box::new(flow::RunMonthly::default()),
        "RunAfterDate" => Box::new(flow::RunAfterDate::new(params(spec)?)),
        "Abort" => Box::new(flow::Abort),
        "SelectAll" => Box::new(select::SelectAll),
        "SelectThese" => Box::new(select::SelectThese::new(params(spec)?)),
        "SelectWhere" => Box::new(select::SelectWhere::new(params(spec)?)),
        "SelectN" => Box::new(select::SelectN::new(params(spec)?)),
        "SetStat" => Box::new(stat::SetStat::new(params(spec)?)),
        "StatTotalReturn" => Box::new(stat::StatTotalReturn::new(params(spec)?)?),
        "StatEwmaReturn" => Box::new(stat::StatEwmaReturn::new(params(spec)?)?),
        "WeighEqually" => Box::new(weigh::WeighEqually),
        "WeighSpecified" => Box::new(weigh::WeighSpecified::new(params(spec)?)),
        "WeighByStat" => Box::new(weigh::WeighByStat),
        "WeighInvVol" => Box::new(weigh::WeighInvVol::new(params(spec)?)?),
        "WeighHrp" => Box::new(weigh::WeighHrp::new(params(spec)?)?),
        "Rebalance" => Box::new(rebalance::Rebalance),
        "Debug" => Box::new(diagnostics::DebugSnapshot::new(params(spec)?)),
        other => {
            return Err(QuantkitError::UnknownAlgo {
                name: other.to_string(),
            });
        }
    };
    Ok(algo)
}

pub fn build_all(specs: &[AlgoSpec]) -> Result<Vec<Box<dyn Algo>>, QuantkitError> {
    specs.iter().map(build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, params: Value) -> AlgoSpec {
        AlgoSpec {
            name: name.to_string(),
            params,
        }
    }

    #[test]
    fn every_listed_name_is_buildable() {
        let with_params = |name: &str| match name {
            "RunEveryNPeriods" => json!({"n": 2}),
            "RunOnDate" => json!({"dates": ["2024-01-02"]}),
            "RunAfterDate" => json!({"date": "2024-01-02"}),
            "SelectThese" => json!({"ids": ["A"]}),
            "SelectWhere" | "SetStat" => json!({"series": "yield"}),
            "SelectN" => json!({"n": 3}),
            "StatTotalReturn" | "WeighInvVol" | "WeighHrp" => json!({"lookback": 5}),
            "StatEwmaReturn" => json!({"span": 10.0}),
            "WeighSpecified" => json!({"weights": {"A": 1.0}}),
            _ => Value::Null,
        };
        for name in ALGO_NAMES {
            let algo = build(&spec(name, with_params(name))).unwrap();
            assert_eq!(algo.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = build(&spec("Nope", Value::Null)).unwrap_err();
        assert!(matches!(err, QuantkitError::UnknownAlgo { name } if name == "Nope"));
        assert!(!is_known("Nope"));
    }

    #[test]
    fn bad_params_are_config_errors() {
        let err = build(&spec("SelectN", json!({"n": "three"}))).unwrap_err();
        assert!(matches!(err, QuantkitError::ConfigInvalid { key, .. } if key == "SelectN"));

        let err = build(&spec("SetStat", Value::Null)).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn oversized_lookback_is_a_config_error() {
        let err = build(&spec("StatTotalReturn", json!({"lookback": usize::MAX}))).unwrap_err();
        assert!(matches!(err, QuantkitError::ConfigInvalid { ref key, .. } if key == "StatTotalReturn.lookback"));
    }
}
