//! Strategy: an ordered Algo pipeline driving a [`Target`] through a calendar.

use crate::domain::accounting::{self, TickOpening};
use crate::domain::algo::Algo;
use crate::domain::error::QuantkitError;
use crate::domain::history::{History, HistoryRow};
use crate::domain::target::Target;
use crate::domain::universe::UniverseSource;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, info};

pub struct Strategy {
    name: String,
    algos: Vec<Box<dyn Algo>>,
    universe: UniverseSource,
    target: Target,
    finished: bool,
}

impl Strategy {
    pub fn new(name: &str, algos: Vec<Box<dyn Algo>>, target: Target) -> Self {
        Strategy {
            name: name.to_string(),
            algos,
            universe: UniverseSource::Priced,
            target,
            finished: false,
        }
    }

    pub fn with_universe(mut self, universe: UniverseSource) -> Self {
        self.universe = universe;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algo_names(&self) -> Vec<&str> {
        self.algos.iter().map(|a| a.name()).collect()
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn history(&self) -> &History {
        self.target.stats()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Run every tick of `calendar` in order.
    ///
    /// The calendar must be strictly ascending. A strategy runs once; after
    /// this returns (successfully or not) it is finished.
    pub fn run(&mut self, calendar: &[NaiveDate]) -> Result<&History, QuantkitError> {
        if self.finished {
            return Err(QuantkitError::StrategyFinished {
                name: self.name.clone(),
            });
        }
        if let Some(pair) = calendar.windows(2).find(|w| w[0] >= w[1]) {
            return Err(QuantkitError::invalid_input(format!(
                "calendar is not strictly ascending at {} -> {}",
                pair[0], pair[1]
            )));
        }

        self.finished = true;
        info!(strategy = %self.name, ticks = calendar.len(), "starting run");
        for &date in calendar {
            self.tick(date)?;
        }
        info!(
            strategy = %self.name,
            value = self.target.value(),
            "run complete"
        );
        Ok(self.target.stats())
    }

    fn tick(&mut self, date: NaiveDate) -> Result<(), QuantkitError> {
        let universe = self.universe.members_at(date, self.target.data().prices());
        self.target.begin_tick(date, universe);
        accounting::mark_to_market(&mut self.target);
        let opening = TickOpening::of(&self.target);

        if self.target.settings().liquidate_delisted {
            self.liquidate_delisted();
        }

        let mut aborted_by = None;
        for algo in self.algos.iter_mut() {
            let proceed = algo.run(&mut self.target)?;
            if self.target.now() != date {
                return Err(QuantkitError::invalid_input(format!(
                    "{} moved the clock from {date} to {}",
                    algo.name(),
                    self.target.now()
                )));
            }
            if !proceed {
                debug!(date = %date, algo = algo.name(), "pipeline stopped");
                aborted_by = Some(algo.name().to_string());
                break;
            }
        }

        accounting::check_invariants(&self.target, &opening)?;
        self.target.value = self.target.marked_value();

        let ledger = self.target.ledger();
        let turnover = if opening.value != 0.0 {
            ledger.traded_notional / opening.value.abs()
        } else {
            0.0
        };
        let row = HistoryRow {
            date,
            value: self.target.value(),
            cash: self.target.cash(),
            turnover,
            commissions: ledger.commissions,
            weights: self.target.weights(),
            aborted_by,
        };
        self.target.stats.push(row);
        Ok(())
    }

    fn liquidate_delisted(&mut self) {
        let delisted: BTreeSet<String> = self
            .target
            .positions()
            .keys()
            .filter(|id| !self.target.universe().contains(*id))
            .cloned()
            .collect();
        for id in delisted {
            // A gap in the price series is not a delisting; wait for a
            // priced tick or the end of the series.
            let date = self.target.now();
            if self.target.price(&id).is_none()
                && self.target.data().prices().has_value_from(&id, date)
            {
                debug!(date = %date, id = %id, "held id unpriced and out of universe; liquidation deferred");
                continue;
            }
            if let Some(fill) = accounting::liquidate(&mut self.target, &id) {
                info!(date = %fill.date, id = %id, quantity = fill.quantity, "liquidated delisted position");
            }
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("algos", &self.algo_names())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
