//! Simulation state at a single point in time.
//!
//! `now` and `universe` are written only by the engine; Algos read them
//! through accessors and act on positions and cash through
//! [`crate::domain::accounting`].

use crate::domain::commission::{CommissionPolicy, ZeroCommission};
use crate::domain::frame::Frame;
use crate::domain::history::History;
use crate::domain::numeric::ZERO_TOLERANCE;
use crate::domain::position::{Fill, Position};
use crate::domain::scratch::Scratch;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Read-only market data for a run: prices plus named auxiliary series.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    prices: Frame,
    series: HashMap<String, Frame>,
}

impl DataSet {
    pub fn new(prices: Frame) -> Self {
        Self {
            prices,
            series: HashMap::new(),
        }
    }

    pub fn with_series(mut self, name: &str, frame: Frame) -> Self {
        self.series.insert(name.to_string(), frame);
        self
    }

    pub fn insert_series(&mut self, name: &str, frame: Frame) {
        self.series.insert(name.to_string(), frame);
    }

    pub fn prices(&self) -> &Frame {
        &self.prices
    }

    pub fn series(&self, name: &str) -> Option<&Frame> {
        self.series.get(name)
    }

    pub fn series_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountingSettings {
    pub starting_cash: f64,
    pub base_currency: String,
    pub integer_shares: bool,
    pub allow_leverage: bool,
    pub liquidate_delisted: bool,
    /// Relative tolerance for the per-tick accounting check.
    pub tolerance: f64,
    pub zero_tolerance: f64,
}

impl Default for AccountingSettings {
    fn default() -> Self {
        AccountingSettings {
            starting_cash: 1_000_000.0,
            base_currency: "USD".to_string(),
            integer_shares: false,
            allow_leverage: false,
            liquidate_delisted: false,
            tolerance: 1e-9,
            zero_tolerance: ZERO_TOLERANCE,
        }
    }
}

/// Cash movements booked during the current tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickLedger {
    /// Σ Δq × p over all fills.
    pub trade_cash: f64,
    /// Σ |Δq × p| over all fills.
    pub traded_notional: f64,
    pub commissions: f64,
    /// Cash added or removed outside of trading.
    pub adjustments: f64,
}

pub struct Target {
    pub(crate) now: NaiveDate,
    pub(crate) universe: BTreeSet<String>,
    pub(crate) positions: BTreeMap<String, Position>,
    pub(crate) cash: f64,
    pub(crate) value: f64,
    pub(crate) temp: Scratch,
    pub(crate) perm: Scratch,
    pub(crate) stats: History,
    pub(crate) data: DataSet,
    pub(crate) commission: Box<dyn CommissionPolicy>,
    pub(crate) settings: AccountingSettings,
    pub(crate) ledger: TickLedger,
    pub(crate) fills: Vec<Fill>,
}

impl Target {
    pub fn new(data: DataSet, settings: AccountingSettings) -> Self {
        let cash = settings.starting_cash;
        Target {
            now: NaiveDate::MIN,
            universe: BTreeSet::new(),
            positions: BTreeMap::new(),
            cash,
            value: cash,
            temp: Scratch::default(),
            perm: Scratch::default(),
            stats: History::default(),
            data,
            commission: Box::new(ZeroCommission),
            settings,
            ledger: TickLedger::default(),
            fills: Vec::new(),
        }
    }

    pub fn with_commission(mut self, commission: Box<dyn CommissionPolicy>) -> Self {
        self.commission = commission;
        self
    }

    pub fn now(&self) -> NaiveDate {
        self.now
    }

    pub fn universe(&self) -> &BTreeSet<String> {
        &self.universe
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn quantity(&self, id: &str) -> f64 {
        self.positions.get(id).map_or(0.0, |p| p.quantity)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn temp(&self) -> &Scratch {
        &self.temp
    }

    pub fn temp_mut(&mut self) -> &mut Scratch {
        &mut self.temp
    }

    pub fn perm(&self) -> &Scratch {
        &self.perm
    }

    pub fn perm_mut(&mut self) -> &mut Scratch {
        &mut self.perm
    }

    pub fn stats(&self) -> &History {
        &self.stats
    }

    pub fn data(&self) -> &DataSet {
        &self.data
    }

    pub fn settings(&self) -> &AccountingSettings {
        &self.settings
    }

    pub fn commission(&self) -> &dyn CommissionPolicy {
        self.commission.as_ref()
    }

    pub fn ledger(&self) -> &TickLedger {
        &self.ledger
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Price of `id` at `now`, if defined.
    pub fn price(&self, id: &str) -> Option<f64> {
        self.data.prices().get(self.now, id)
    }

    /// Value of the named auxiliary series for `id` at `now`.
    pub fn series_value(&self, series: &str, id: &str) -> Option<f64> {
        self.data.series(series)?.get(self.now, id)
    }

    /// Add (or, when negative, withdraw) cash outside of trading.
    pub fn adjust_cash(&mut self, amount: f64, reason: &str) {
        debug!(date = %self.now, amount, reason, "cash adjustment");
        self.cash += amount;
        self.value += amount;
        self.ledger.adjustments += amount;
    }

    /// Current weights `q × mark / value` of every held position.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        if self.value == 0.0 {
            return self.positions.keys().map(|id| (id.clone(), 0.0)).collect();
        }
        self.positions
            .iter()
            .map(|(id, p)| (id.clone(), p.market_value() / self.value))
            .collect()
    }

    /// `cash + Σ q × last_mark`.
    pub fn marked_value(&self) -> f64 {
        self.cash + self.positions.values().map(Position::market_value).sum::<f64>()
    }

    pub(crate) fn begin_tick(&mut self, now: NaiveDate, universe: BTreeSet<String>) {
        self.now = now;
        self.universe = universe;
        self.temp.clear();
        self.ledger = TickLedger::default();
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("now", &self.now)
            .field("universe", &self.universe)
            .field("positions", &self.positions)
            .field("cash", &self.cash)
            .field("value", &self.value)
            .field("temp", &self.temp)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
