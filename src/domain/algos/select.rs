//! Selectors: write the tick's candidate identifiers to `temp.selected`.

use crate::domain::algo::Algo;
use crate::domain::error::QuantkitError;
use crate::domain::target::Target;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Universe members with a price at `now`.
pub(crate) fn priced_universe(target: &Target) -> BTreeSet<String> {
    target
        .universe()
        .iter()
        .filter(|id| target.price(id).is_some())
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct SelectAll;

impl Algo for SelectAll {
    fn name(&self) -> &str {
        "SelectAll"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let selected = priced_universe(target);
        target.temp_mut().selected = Some(selected);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectTheseParams {
    pub ids: Vec<String>,
}

/// A fixed list, restricted to universe members priced at `now`.
#[derive(Debug)]
pub struct SelectThese {
    ids: Vec<String>,
}

impl SelectThese {
    pub fn new(params: SelectTheseParams) -> Self {
        Self { ids: params.ids }
    }
}

impl Algo for SelectThese {
    fn name(&self) -> &str {
        "SelectThese"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let selected = self
            .ids
            .iter()
            .filter(|id| target.universe().contains(*id) && target.price(id).is_some())
            .cloned()
            .collect();
        target.temp_mut().selected = Some(selected);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectWhereParams {
    pub series: String,
}

/// Priced universe members whose auxiliary flag is non-zero at `now`.
#[derive(Debug)]
pub struct SelectWhere {
    series: String,
}

impl SelectWhere {
    pub fn new(params: SelectWhereParams) -> Self {
        Self {
            series: params.series,
        }
    }
}

impl Algo for SelectWhere {
    fn name(&self) -> &str {
        "SelectWhere"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let selected = priced_universe(target)
            .into_iter()
            .filter(|id| {
                target
                    .series_value(&self.series, id)
                    .is_some_and(|v| v != 0.0)
            })
            .collect();
        target.temp_mut().selected = Some(selected);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectNParams {
    pub n: usize,
    #[serde(default)]
    pub ascending: bool,
}

/// Keeps the `n` identifiers with the largest (or smallest) `temp.stat`.
#[derive(Debug)]
pub struct SelectN {
    n: usize,
    ascending: bool,
}

impl SelectN {
    pub fn new(params: SelectNParams) -> Self {
        Self {
            n: params.n,
            ascending: params.ascending,
        }
    }
}

impl Algo for SelectN {
    fn name(&self) -> &str {
        "SelectN"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let temp = target.temp();
        let Some(stat) = temp.stat.as_ref() else {
            warn!(date = %target.now(), "SelectN found no stat; selecting nothing");
            target.temp_mut().selected = Some(BTreeSet::new());
            return Ok(true);
        };

        let mut ranked: Vec<(&String, f64)> = stat
            .iter()
            .filter(|(id, v)| {
                v.is_finite() && temp.selected.as_ref().is_none_or(|s| s.contains(*id))
            })
            .map(|(id, v)| (id, *v))
            .collect();
        if self.ascending {
            ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        } else {
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        }

        let selected: BTreeSet<String> = ranked
            .into_iter()
            .take(self.n)
            .map(|(id, _)| id.clone())
            .collect();
        target.temp_mut().selected = Some(selected);
        Ok(true)
    }
}
