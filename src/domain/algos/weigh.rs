//! Weighers: write target weights to `temp.weights`.
//!
//! Risk-based weighers estimate from price returns over a trailing window of
//! `lookback` periods. Identifiers without enough history in the window are
//! left out of the estimate. When no identifier has two usable returns they
//! stop the pipeline for the tick instead of emitting weights, so that a
//! following `Rebalance` leaves the book untouched.

use crate::domain::algo::Algo;
use crate::domain::algos::check_lookback;
use crate::domain::algos::stat::candidates;
use crate::domain::error::QuantkitError;
use crate::domain::frame::window_returns;
use crate::domain::numeric::{self, Matrix};
use crate::domain::stream::{RunningCovariance, RunningMoments, StreamingStat};
use crate::domain::target::Target;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct WeighEqually;

impl Algo for WeighEqually {
    fn name(&self) -> &str {
        "WeighEqually"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let ids = candidates(target);
        let w = if ids.is_empty() {
            0.0
        } else {
            1.0 / ids.len() as f64
        };
        target.temp_mut().weights = Some(ids.into_iter().map(|id| (id, w)).collect());
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeighSpecifiedParams {
    pub weights: BTreeMap<String, f64>,
}

#[derive(Debug)]
pub struct WeighSpecified {
    weights: BTreeMap<String, f64>,
}

impl WeighSpecified {
    pub fn new(params: WeighSpecifiedParams) -> Self {
        Self {
            weights: params.weights,
        }
    }
}

impl Algo for WeighSpecified {
    fn name(&self) -> &str {
        "WeighSpecified"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        target.temp_mut().weights = Some(self.weights.clone());
        Ok(true)
    }
}

/// `w_i = stat_i / Σ|stat|` over the selected identifiers.
#[derive(Debug, Default)]
pub struct WeighByStat;

impl Algo for WeighByStat {
    fn name(&self) -> &str {
        "WeighByStat"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let temp = target.temp();
        let stat: BTreeMap<String, f64> = temp
            .stat
            .iter()
            .flatten()
            .filter(|(id, v)| {
                v.is_finite() && temp.selected.as_ref().is_none_or(|s| s.contains(*id))
            })
            .map(|(id, v)| (id.clone(), *v))
            .collect();

        let gross: f64 = stat.values().map(|v| v.abs()).sum();
        let weights = if gross > 0.0 {
            stat.into_iter().map(|(id, v)| (id, v / gross)).collect()
        } else {
            BTreeMap::new()
        };
        target.temp_mut().weights = Some(weights);
        Ok(true)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookbackParams {
    pub lookback: usize,
}

/// Trailing returns for the ids with enough history, one row per period.
///
/// Ids with fewer than two usable returns in the window are dropped. If the
/// rest still share fewer than two complete periods, only ids observed over
/// the whole window are kept.
fn trailing_returns(target: &Target, ids: &[String], lookback: usize) -> (Vec<String>, Vec<Vec<f64>>) {
    let window = target
        .data()
        .prices()
        .window(ids, target.now(), lookback + 1);
    let steps = window.len().saturating_sub(1);
    let usable: Vec<usize> = (0..ids.len())
        .map(|j| {
            window
                .windows(2)
                .filter(|pair| pair[0][j] > 0.0 && !pair[1][j].is_nan())
                .count()
        })
        .collect();

    let mut keep: Vec<usize> = (0..ids.len()).filter(|&j| usable[j] >= 2).collect();
    let mut returns = window_returns(&select_columns(&window, &keep));
    if returns.len() < 2 {
        keep.retain(|&j| usable[j] == steps);
        returns = window_returns(&select_columns(&window, &keep));
    }
    if keep.len() < ids.len() {
        debug!(
            date = %target.now(),
            dropped = ids.len() - keep.len(),
            "ids without enough return history left out"
        );
    }
    (keep.iter().map(|&j| ids[j].clone()).collect(), returns)
}

fn select_columns(window: &[Vec<f64>], keep: &[usize]) -> Vec<Vec<f64>> {
    window
        .iter()
        .map(|row| keep.iter().map(|&j| row[j]).collect())
        .collect()
}

/// `w_i ∝ 1 / σ_i` of trailing returns.
#[derive(Debug)]
pub struct WeighInvVol {
    lookback: usize,
}

impl WeighInvVol {
    pub fn new(params: LookbackParams) -> Result<Self, QuantkitError> {
        Ok(Self {
            lookback: check_lookback("WeighInvVol", params.lookback, 2)?,
        })
    }
}

impl Algo for WeighInvVol {
    fn name(&self) -> &str {
        "WeighInvVol"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let pool: Vec<String> = candidates(target).into_iter().collect();
        let (ids, returns) = trailing_returns(target, &pool, self.lookback);
        if ids.is_empty() || returns.len() < 2 {
            debug!(date = %target.now(), "not enough history for inverse volatility");
            return Ok(false);
        }

        let mut moments = RunningMoments::new(ids.len());
        for row in &returns {
            moments.add_value(row)?;
        }
        let inv: Vec<f64> = moments
            .variance()
            .iter()
            .map(|v| if *v > 0.0 { 1.0 / v.sqrt() } else { 0.0 })
            .collect();
        let total: f64 = inv.iter().sum();

        let weights = if total > 0.0 {
            ids.into_iter()
                .zip(inv)
                .filter(|(_, w)| *w > 0.0)
                .map(|(id, w)| (id, w / total))
                .collect()
        } else {
            BTreeMap::new()
        };
        target.temp_mut().weights = Some(weights);
        Ok(true)
    }
}

/// Hierarchical risk parity over trailing returns.
#[derive(Debug)]
pub struct WeighHrp {
    lookback: usize,
}

impl WeighHrp {
    pub fn new(params: LookbackParams) -> Result<Self, QuantkitError> {
        Ok(Self {
            lookback: check_lookback("WeighHrp", params.lookback, 2)?,
        })
    }
}

impl Algo for WeighHrp {
    fn name(&self) -> &str {
        "WeighHrp"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let pool: Vec<String> = candidates(target).into_iter().collect();
        let (ids, returns) = trailing_returns(target, &pool, self.lookback);
        if ids.is_empty() || returns.len() < 2 {
            debug!(date = %target.now(), "not enough history for risk parity");
            return Ok(false);
        }

        let mut estimator = RunningCovariance::new(ids.len());
        for row in &returns {
            estimator.add_value(row)?;
        }
        let cov = estimator.covariance_matrix();

        // Constant series carry no risk information and break the inverse
        // variance split.
        let live: Vec<usize> = (0..ids.len()).filter(|&i| cov[i][i] > 0.0).collect();
        let weights = if live.is_empty() {
            BTreeMap::new()
        } else {
            let sub_cov = submatrix(&cov, &live);
            let sub_corr = submatrix(&estimator.correlation_matrix(), &live);
            let w = hrp_weights(&sub_cov, &sub_corr)?;
            live.iter().zip(w).map(|(&i, w)| (ids[i].clone(), w)).collect()
        };
        target.temp_mut().weights = Some(weights);
        Ok(true)
    }
}

fn submatrix(m: &[Vec<f64>], indices: &[usize]) -> Matrix {
    indices
        .iter()
        .map(|&i| indices.iter().map(|&j| m[i][j]).collect())
        .collect()
}

/// Recursive bisection of the quasi-diagonal order.
pub fn hrp_weights(cov: &[Vec<f64>], corr: &[Vec<f64>]) -> Result<Vec<f64>, QuantkitError> {
    let n = cov.len();
    if n == 1 {
        return Ok(vec![1.0]);
    }
    let distance = numeric::distance_matrix(corr)?;
    let linkage = numeric::linkage_matrix(&numeric::condensed(&distance)?)?;
    let order = numeric::get_quasi_diag(&linkage);

    let mut weights = vec![1.0; n];
    let mut clusters = vec![order];
    while let Some(cluster) = clusters.pop() {
        if cluster.len() < 2 {
            continue;
        }
        let (left, right) = cluster.split_at(cluster.len() / 2);
        let v_left = numeric::sliced_inverse_variance(cov, left)?;
        let v_right = numeric::sliced_inverse_variance(cov, right)?;
        let alpha = if v_left + v_right > 0.0 {
            1.0 - v_left / (v_left + v_right)
        } else {
            0.5
        };
        for &i in left {
            weights[i] *= alpha;
        }
        for &i in right {
            weights[i] *= 1.0 - alpha;
        }
        clusters.push(left.to_vec());
        clusters.push(right.to_vec());
    }
    Ok(weights)
}
