//! Top-level orchestration: configuration → data → strategy → results.

use crate::adapters::build_source;
use crate::adapters::json_config_adapter::JsonConfigAdapter;
use crate::domain::algos;
use crate::domain::commission;
use crate::domain::config::{Frequency, QuantkitConfig};
use crate::domain::config_validation::validate_config;
use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use crate::domain::history::History;
use crate::domain::metrics::{self, Metrics};
use crate::domain::position::{Fill, Position};
use crate::domain::strategy::Strategy;
use crate::domain::target::{DataSet, Target};
use crate::domain::universe::UniverseSource;
use crate::logging::working_on;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::LoadOptions;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunResult {
    pub strategy: String,
    pub history: History,
    pub fills: Vec<Fill>,
    pub positions: BTreeMap<String, Position>,
    pub metrics: Metrics,
}

#[derive(Debug)]
pub struct Runner {
    config: QuantkitConfig,
    base_dir: PathBuf,
}

impl Runner {
    /// Load `base_path`, deep-merge `local_path` over it and validate.
    ///
    /// Relative data paths resolve against the directory of the local file
    /// when there is one, otherwise against the base file's directory.
    pub fn init(base_path: &Path, local_path: Option<&Path>) -> Result<Self, QuantkitError> {
        working_on("loading configuration");
        let adapter = JsonConfigAdapter::layered(base_path, local_path)?;
        let anchor = local_path.unwrap_or(base_path);
        let base_dir = anchor
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_port(&adapter, base_dir)
    }

    /// Build from an in-memory document.
    pub fn from_value(document: Value, base_dir: impl Into<PathBuf>) -> Result<Self, QuantkitError> {
        Self::from_port(&JsonConfigAdapter::from_value(document), base_dir.into())
    }

    fn from_port(port: &dyn ConfigPort, base_dir: PathBuf) -> Result<Self, QuantkitError> {
        validate_config(port)?;
        let config = QuantkitConfig::from_port(port)?;
        Ok(Self { config, base_dir })
    }

    pub fn config(&self) -> &QuantkitConfig {
        &self.config
    }

    /// Build every collaborator and drive the strategy to completion.
    pub fn run(&self) -> Result<RunResult, QuantkitError> {
        let cfg = &self.config;

        // Configuration errors must surface before any data is read.
        let algos = algos::build_all(&cfg.strategy.algos)?;
        let commission = commission::from_name(&cfg.commission.policy, cfg.commission.rate)?;
        let universe = UniverseSource::from_config(
            cfg.universe.members.as_deref(),
            cfg.universe.schedule.as_ref(),
        )?;

        working_on("loading data");
        let data = self.load_data()?;
        let calendar = build_calendar(data.prices().dates(), cfg.universe.frequency);
        if calendar.is_empty() {
            warn!("calendar is empty; no ticks will run");
        }

        let target = Target::new(data, cfg.accounting.clone()).with_commission(commission);
        let mut strategy = Strategy::new(&cfg.strategy.name, algos, target).with_universe(universe);

        working_on(&format!("running {} over {} ticks", strategy.name(), calendar.len()));
        strategy.run(&calendar)?;

        let target = strategy.target();
        let metrics = Metrics::compute(
            target.stats(),
            target.fills(),
            cfg.accounting.starting_cash,
            metrics::periods_per_year(cfg.universe.frequency),
        );
        info!(
            strategy = %strategy.name(),
            final_value = metrics.final_value,
            total_return = metrics.total_return,
            "run finished"
        );

        Ok(RunResult {
            strategy: strategy.name().to_string(),
            history: target.stats().clone(),
            fills: target.fills().to_vec(),
            positions: target.positions().clone(),
            metrics,
        })
    }

    fn load_data(&self) -> Result<DataSet, QuantkitError> {
        let cfg = &self.config;
        let options = LoadOptions {
            start: cfg.universe.start,
            end: cfg.universe.end,
        };

        let mut prices = build_source("prices", &cfg.universe.prices, &self.base_dir)?;
        prices.load(&options)?;
        info!(rows = prices.df().len(), columns = prices.df().columns().len(), "prices loaded");
        let mut data = DataSet::new(prices.df().clone());

        for (name, spec) in &cfg.data {
            let mut source = build_source(name, spec, &self.base_dir)?;
            match source.load(&options) {
                Ok(()) => data.insert_series(name, source.df().clone()),
                Err(e) if spec.mandatory => return Err(e),
                Err(e) => {
                    warn!(series = %name, error = %e, "optional series failed to load; treating as missing");
                    data.insert_series(name, Frame::default());
                }
            }
        }
        Ok(data)
    }
}

/// Tick dates drawn from the price dates: every date, or the last date of
/// each ISO week or calendar month.
pub fn build_calendar(dates: &[NaiveDate], frequency: Frequency) -> Vec<NaiveDate> {
    let period = |d: &NaiveDate| -> (i32, u32) {
        match frequency {
            Frequency::Daily => (d.year(), d.ordinal()),
            Frequency::Weekly => (d.iso_week().year(), d.iso_week().week()),
            Frequency::Monthly => (d.year(), d.month()),
        }
    };
    let mut calendar: Vec<NaiveDate> = Vec::new();
    for &date in dates {
        match calendar.last() {
            Some(last) if period(last) == period(&date) => {
                let end = calendar.len() - 1;
                calendar[end] = date;
            }
            _ => calendar.push(date),
        }
    }
    calendar
}
