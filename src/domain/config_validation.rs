//! Configuration validation.
//!
//! Validates the merged document before any data is loaded, so that every
//! configuration error surfaces ahead of the tick loop.

use crate::domain::algos;
use crate::domain::error::QuantkitError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use serde_json::Value;

const SOURCES: [&str; 3] = ["csv", "json", "blank"];
const FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];
const POLICIES: [&str; 6] = ["zero", "default", "none", "quantity", "bps", ""];

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    validate_universe(config)?;
    validate_data(config)?;
    validate_strategy(config)?;
    validate_commission(config)?;
    validate_accounting(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantkitError {
    QuantkitError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> QuantkitError {
    QuantkitError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    let Some(universe) = config.section("universe") else {
        return Err(missing("universe", "source"));
    };
    validate_source("universe", universe)?;

    let start = parse_date(config.get_string("universe", "start").as_deref(), "start")?;
    let end = parse_date(config.get_string("universe", "end").as_deref(), "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid("universe", "start", "start must not be after end"));
        }
    }

    if let Some(freq) = universe.get("frequency") {
        match freq.as_str() {
            Some(f) if FREQUENCIES.contains(&f) => {}
            _ => {
                return Err(invalid(
                    "universe",
                    "frequency",
                    "frequency must be one of daily, weekly, monthly",
                ));
            }
        }
    }
    Ok(())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, QuantkitError> {
    match value {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid("universe", field, format!("invalid {field} format, expected YYYY-MM-DD"))),
    }
}

fn validate_source(section: &str, spec: &Value) -> Result<(), QuantkitError> {
    let Some(source) = spec.get("source").and_then(Value::as_str) else {
        return Err(missing(section, "source"));
    };
    if !SOURCES.contains(&source) {
        return Err(invalid(section, "source", format!("unknown data source '{source}'")));
    }
    let has_path = spec.get("path").is_some_and(|p| p.is_string());
    let has_records = spec.get("records").is_some_and(|r| r.is_array());
    match source {
        "csv" if !has_path => Err(missing(section, "path")),
        "json" if !has_path && !has_records => Err(missing(section, "path")),
        _ => Ok(()),
    }
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    let Some(data) = config.section("data") else {
        return Ok(());
    };
    let Some(entries) = data.as_object() else {
        return Err(invalid("data", "*", "data must map series names to sources"));
    };
    for (name, spec) in entries {
        validate_source(&format!("data.{name}"), spec)?;
    }
    Ok(())
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    let Some(algos) = config.get("strategy", "algos") else {
        return Err(missing("strategy", "algos"));
    };
    let Some(algos) = algos.as_array() else {
        return Err(invalid("strategy", "algos", "algos must be a list"));
    };
    if algos.is_empty() {
        return Err(invalid("strategy", "algos", "at least one algo is required"));
    }
    for spec in algos {
        let Some(name) = spec.get("name").and_then(Value::as_str) else {
            return Err(missing("strategy", "algos[].name"));
        };
        if !algos::is_known(name) {
            return Err(QuantkitError::UnknownAlgo {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    let policy = config
        .get_string("commission", "policy")
        .unwrap_or_default()
        .to_lowercase();
    if !POLICIES.contains(&policy.as_str()) {
        return Err(invalid(
            "commission",
            "policy",
            format!("unknown commission policy '{policy}'"),
        ));
    }
    let rate = config.get_double("commission", "rate", 0.0);
    if rate < 0.0 {
        return Err(invalid("commission", "rate", "rate must be non-negative"));
    }
    if policy == "bps" && config.get("commission", "rate").is_none() {
        return Err(missing("commission", "rate"));
    }
    Ok(())
}

fn validate_accounting(config: &dyn ConfigPort) -> Result<(), QuantkitError> {
    let cash = config.get_double("accounting", "starting_cash", 1.0);
    if cash <= 0.0 {
        return Err(invalid(
            "accounting",
            "starting_cash",
            "starting_cash must be positive",
        ));
    }
    let tolerance = config.get_double("accounting", "tolerance", 1e-9);
    if tolerance <= 0.0 {
        return Err(invalid("accounting", "tolerance", "tolerance must be positive"));
    }
    let zero = config.get_double("accounting", "zero_tolerance", 0.0);
    if zero < 0.0 {
        return Err(invalid(
            "accounting",
            "zero_tolerance",
            "zero_tolerance must be non-negative",
        ));
    }
    Ok(())
}
