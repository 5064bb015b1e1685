//! Stat setters: write a per-identifier number to `temp.stat`.

use crate::domain::algo::Algo;
use crate::domain::algos::check_lookback;
use crate::domain::algos::select::priced_universe;
use crate::domain::error::QuantkitError;
use crate::domain::scratch::ScratchValue;
use crate::domain::stream::{Ewma, StreamingStat};
use crate::domain::target::Target;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// `temp.selected` if a selector ran this tick, otherwise the priced universe.
pub(crate) fn candidates(target: &Target) -> BTreeSet<String> {
    match &target.temp().selected {
        Some(selected) => selected.clone(),
        None => priced_universe(target),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatParams {
    pub series: String,
}

/// Copies the named auxiliary series at `now`.
///
/// Without a prior selector this is the full row; a missing series yields an
/// empty stat.
#[derive(Debug)]
pub struct SetStat {
    series: String,
}

impl SetStat {
    pub fn new(params: SetStatParams) -> Self {
        Self {
            series: params.series,
        }
    }
}

impl Algo for SetStat {
    fn name(&self) -> &str {
        "SetStat"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let row = target
            .data()
            .series(&self.series)
            .map(|frame| frame.row(target.now()))
            .unwrap_or_default();
        let stat = match &target.temp().selected {
            Some(selected) => row
                .into_iter()
                .filter(|(id, _)| selected.contains(id))
                .collect(),
            None => row,
        };
        target.temp_mut().stat = Some(stat);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatTotalReturnParams {
    pub lookback: usize,
}

/// Price return over the last `lookback` periods.
#[derive(Debug)]
pub struct StatTotalReturn {
    lookback: usize,
}

impl StatTotalReturn {
    pub fn new(params: StatTotalReturnParams) -> Result<Self, QuantkitError> {
        Ok(Self {
            lookback: check_lookback("StatTotalReturn", params.lookback, 1)?,
        })
    }
}

impl Algo for StatTotalReturn {
    fn name(&self) -> &str {
        "StatTotalReturn"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let ids: Vec<String> = candidates(target).into_iter().collect();
        let window = target
            .data()
            .prices()
            .window(&ids, target.now(), self.lookback + 1);

        let mut stat = BTreeMap::new();
        if window.len() == self.lookback + 1 {
            if let (Some(first), Some(last)) = (window.first(), window.last()) {
                for (i, id) in ids.iter().enumerate() {
                    let (p0, p1) = (first[i], last[i]);
                    if p0.is_finite() && p1.is_finite() && p0 > 0.0 {
                        stat.insert(id.clone(), p1 / p0 - 1.0);
                    }
                }
            }
        }
        target.temp_mut().stat = Some(stat);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatEwmaReturnParams {
    pub span: f64,
}

/// Exponentially weighted one-period return per identifier.
///
/// One accumulator per identifier lives on the instance; the current levels
/// are mirrored to `perm` under `("StatEwmaReturn", "level")` for later
/// Algos.
#[derive(Debug)]
pub struct StatEwmaReturn {
    span: f64,
    levels: BTreeMap<String, Ewma>,
}

impl StatEwmaReturn {
    pub fn new(params: StatEwmaReturnParams) -> Result<Self, QuantkitError> {
        if !(params.span >= 1.0) {
            return Err(QuantkitError::ConfigInvalid {
                section: "strategy".into(),
                key: "StatEwmaReturn.span".into(),
                reason: "span must be at least 1".into(),
            });
        }
        Ok(Self {
            span: params.span,
            levels: BTreeMap::new(),
        })
    }
}

impl Algo for StatEwmaReturn {
    fn name(&self) -> &str {
        "StatEwmaReturn"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let ids: Vec<String> = candidates(target).into_iter().collect();
        let window = target.data().prices().window(&ids, target.now(), 2);

        if let [prev, curr] = window.as_slice() {
            for (i, id) in ids.iter().enumerate() {
                let (p0, p1) = (prev[i], curr[i]);
                if p0.is_finite() && p1.is_finite() && p0 > 0.0 {
                    self.levels
                        .entry(id.clone())
                        .or_insert_with(|| Ewma::with_span(1, self.span))
                        .add_value(&[p1 / p0 - 1.0])?;
                }
            }
        }

        let levels: BTreeMap<String, f64> = self
            .levels
            .iter()
            .filter_map(|(id, ewma)| ewma.level().first().map(|v| (id.clone(), *v)))
            .collect();
        let stat = levels
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, v)| (id.clone(), *v))
            .collect();

        target
            .perm_mut()
            .insert(self.name(), "level", ScratchValue::Series(levels));
        target.temp_mut().stat = Some(stat);
        Ok(true)
    }
}
