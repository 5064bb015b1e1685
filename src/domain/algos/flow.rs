//! Flow-control Algos: decide whether the rest of the pipeline runs this tick.

use crate::domain::algo::Algo;
use crate::domain::error::QuantkitError;
use crate::domain::target::Target;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Passes on the first tick it sees and never again.
#[derive(Debug, Default)]
pub struct RunOnce {
    has_run: bool,
}

impl Algo for RunOnce {
    fn name(&self) -> &str {
        "RunOnce"
    }

    fn run(&mut self, _target: &mut Target) -> Result<bool, QuantkitError> {
        if self.has_run {
            return Ok(false);
        }
        self.has_run = true;
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunEveryNPeriodsParams {
    pub n: usize,
    #[serde(default)]
    pub offset: usize,
}

/// Passes on call `offset`, then on every `n`th call after it.
#[derive(Debug)]
pub struct RunEveryNPeriods {
    n: usize,
    offset: usize,
    calls: usize,
}

impl RunEveryNPeriods {
    pub fn new(params: RunEveryNPeriodsParams) -> Result<Self, QuantkitError> {
        if params.n == 0 {
            return Err(QuantkitError::ConfigInvalid {
                section: "strategy".into(),
                key: "RunEveryNPeriods.n".into(),
                reason: "n must be at least 1".into(),
            });
        }
        Ok(Self {
            n: params.n,
            offset: params.offset,
            calls: 0,
        })
    }
}

impl Algo for RunEveryNPeriods {
    fn name(&self) -> &str {
        "RunEveryNPeriods"
    }

    fn run(&mut self, _target: &mut Target) -> Result<bool, QuantkitError> {
        let call = self.calls;
        self.calls += 1;
        Ok(call >= self.offset && (call - self.offset) % self.n == 0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunOnDateParams {
    pub dates: BTreeSet<NaiveDate>,
}

#[derive(Debug)]
pub struct RunOnDate {
    dates: BTreeSet<NaiveDate>,
}

impl RunOnDate {
    pub fn new(params: RunOnDateParams) -> Self {
        Self {
            dates: params.dates,
        }
    }
}

impl Algo for RunOnDate {
    fn name(&self) -> &str {
        "RunOnDate"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        Ok(self.dates.contains(&target.now()))
    }
}

/// Passes on the first tick of each calendar month.
#[derive(Debug, Default)]
pub struct RunMonthly {
    last: Option<NaiveDate>,
}

impl Algo for RunMonthly {
    fn name(&self) -> &str {
        "RunMonthly"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let now = target.now();
        let new_month = self
            .last
            .is_none_or(|last| (last.year(), last.month()) != (now.year(), now.month()));
        self.last = Some(now);
        Ok(new_month)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunAfterDateParams {
    pub date: NaiveDate,
}

/// Passes strictly after `date`.
#[derive(Debug)]
pub struct RunAfterDate {
    date: NaiveDate,
}

impl RunAfterDate {
    pub fn new(params: RunAfterDateParams) -> Self {
        Self { date: params.date }
    }
}

impl Algo for RunAfterDate {
    fn name(&self) -> &str {
        "RunAfterDate"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        Ok(target.now() > self.date)
    }
}

/// Always stops the pipeline.
#[derive(Debug, Default)]
pub struct Abort;

impl Algo for Abort {
    fn name(&self) -> &str {
        "Abort"
    }

    fn run(&mut self, _target: &mut Target) -> Result<bool, QuantkitError> {
        Ok(false)
    }
}
