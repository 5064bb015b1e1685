//! Typed run configuration and the base/override merge.
//!
//! A run is described by one JSON document with the sections `universe`,
//! `data`, `strategy`, `commission` and `accounting`. Documents are merged
//! with [`deep_merge`] before being decoded into [`QuantkitConfig`].

use crate::domain::error::QuantkitError;
use crate::domain::target::AccountingSettings;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Merge `overlay` into `base`: objects recurse, anything else is replaced.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

/// One long-format observation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub date: NaiveDate,
    pub identifier: String,
    pub value: f64,
}

/// Where a frame comes from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceSpec {
    /// Adapter name: `csv`, `json` or `blank`.
    pub source: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub records: Option<Vec<Record>>,
    /// Columns of a `blank` source.
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub mandatory: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UniverseConfig {
    #[serde(flatten)]
    pub prices: SourceSpec,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub frequency: Frequency,
    /// Fixed membership; defaults to every priced column.
    #[serde(default)]
    pub members: Option<Vec<String>>,
    /// Membership changes, each in effect from its date onwards.
    #[serde(default)]
    pub schedule: Option<BTreeMap<NaiveDate, Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AlgoSpec {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StrategyConfig {
    #[serde(default = "default_strategy_name")]
    pub name: String,
    pub algos: Vec<AlgoSpec>,
}

fn default_strategy_name() -> String {
    "strategy".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CommissionConfig {
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default)]
    pub rate: Option<f64>,
}

fn default_policy() -> String {
    "zero".to_string()
}

impl Default for CommissionConfig {
    fn default() -> Self {
        CommissionConfig {
            policy: default_policy(),
            rate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuantkitConfig {
    pub universe: UniverseConfig,
    #[serde(default)]
    pub data: BTreeMap<String, SourceSpec>,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub commission: CommissionConfig,
    #[serde(default)]
    pub accounting: AccountingSettings,
}

impl QuantkitConfig {
    /// Decode the merged document held by `port`.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, QuantkitError> {
        Self::from_value(port.document().clone())
    }

    pub fn from_value(value: Value) -> Result<Self, QuantkitError> {
        for section in ["universe", "strategy"] {
            if value.get(section).is_none() {
                return Err(QuantkitError::ConfigMissing {
                    section: section.to_string(),
                    key: "*".to_string(),
                });
            }
        }
        serde_json::from_value(value).map_err(|e| QuantkitError::ConfigParse {
            file: "<merged>".to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_recurses_into_objects() {
        let mut base = json!({"a": 1, "b": {"c": 2, "d": 3}});
        deep_merge(&mut base, json!({"b": {"c": 9}}));
        assert_eq!(base, json!({"a": 1, "b": {"c": 9, "d": 3}}));
    }

    #[test]
    fn deep_merge_replaces_lists_and_scalars() {
        let mut base = json!({"l": [1, 2, 3], "s": "x", "o": {"k": 1}});
        deep_merge(&mut base, json!({"l": [4], "s": {"now": "object"}, "o": 5}));
        assert_eq!(base, json!({"l": [4], "s": {"now": "object"}, "o": 5}));
    }

    #[test]
    fn deep_merge_adds_new_keys() {
        let mut base = json!({"a": 1});
        deep_merge(&mut base, json!({"b": {"c": 2}}));
        assert_eq!(base, json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn decodes_full_document() {
        let doc = json!({
            "universe": {
                "source": "csv",
                "path": "prices.csv",
                "start": "2024-01-01",
                "frequency": "monthly",
                "schedule": {"2024-02-01": ["A", "B"]}
            },
            "data": {"yield": {"source": "blank", "columns": ["A"]}},
            "strategy": {"name": "carry", "algos": [{"name": "SelectAll"}]},
            "commission": {"policy": "quantity"},
            "accounting": {"starting_cash": 1000.0, "integer_shares": true}
        });
        let cfg = QuantkitConfig::from_value(doc).unwrap();
        assert_eq!(cfg.universe.frequency, Frequency::Monthly);
        assert_eq!(cfg.universe.prices.source, "csv");
        assert_eq!(cfg.universe.schedule.unwrap().len(), 1);
        assert_eq!(cfg.strategy.algos[0].params, Value::Null);
        assert_eq!(cfg.commission.policy, "quantity");
        assert!(cfg.accounting.integer_shares);
        assert!((cfg.accounting.starting_cash - 1000.0).abs() < f64::EPSILON);
        assert_eq!(cfg.accounting.base_currency, "USD");
    }

    #[test]
    fn missing_strategy_section_is_reported() {
        let err = QuantkitConfig::from_value(json!({"universe": {"source": "blank"}})).unwrap_err();
        assert!(matches!(err, QuantkitError::ConfigMissing { ref section, .. } if section == "strategy"));
    }

    #[test]
    fn unknown_accounting_key_is_a_parse_error() {
        let doc = json!({
            "universe": {"source": "blank"},
            "strategy": {"algos": []},
            "accounting": {"startng_cash": 5}
        });
        assert!(matches!(
            QuantkitConfig::from_value(doc),
            Err(QuantkitError::ConfigParse { .. })
        ));
    }
}
