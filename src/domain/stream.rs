//! Streaming (online) statistics.
//!
//! Every accumulator receives one observation at a time through
//! [`StreamingStat::add_value`] and refreshes its `results` view before
//! returning, so a reader never sees results lagging the observations.

use crate::domain::error::QuantkitError;
use crate::domain::numeric::{self, Matrix};
use std::collections::BTreeMap;

pub trait StreamingStat {
    fn num_ind_variables(&self) -> usize;

    /// Append one observation and update `results`.
    fn add_value(&mut self, x: &[f64]) -> Result<(), QuantkitError>;

    fn values(&self) -> &[Vec<f64>];

    fn total_iterations(&self) -> usize {
        self.values().len()
    }

    fn results(&self) -> &BTreeMap<String, f64>;
}

/// Observation log shared by the concrete accumulators.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    width: usize,
    values: Vec<Vec<f64>>,
    results: BTreeMap<String, f64>,
}

impl Observations {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    fn push(&mut self, x: &[f64]) -> Result<(), QuantkitError> {
        if x.len() != self.width {
            return Err(QuantkitError::invalid_input(format!(
                "observation has {} values, expected {}",
                x.len(),
                self.width
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(QuantkitError::invalid_input("observation is not finite"));
        }
        self.values.push(x.to_vec());
        Ok(())
    }

    fn count(&self) -> usize {
        self.values.len()
    }
}

/// Mean and population variance per variable (Welford).
#[derive(Debug, Clone)]
pub struct RunningMoments {
    obs: Observations,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl RunningMoments {
    pub fn new(num_ind_variables: usize) -> Self {
        Self {
            obs: Observations::new(num_ind_variables),
            mean: vec![0.0; num_ind_variables],
            m2: vec![0.0; num_ind_variables],
        }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn variance(&self) -> Vec<f64> {
        let n = self.obs.count();
        if n == 0 {
            return vec![0.0; self.mean.len()];
        }
        self.m2.iter().map(|m| m / n as f64).collect()
    }
}

impl StreamingStat for RunningMoments {
    fn num_ind_variables(&self) -> usize {
        self.obs.width
    }

    fn add_value(&mut self, x: &[f64]) -> Result<(), QuantkitError> {
        self.obs.push(x)?;
        let n = self.obs.count() as f64;
        for (i, &xi) in x.iter().enumerate() {
            let delta = xi - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (xi - self.mean[i]);
        }

        let variance = self.variance();
        for (i, var) in variance.iter().enumerate() {
            self.obs.results.insert(format!("mean_{i}"), self.mean[i]);
            self.obs.results.insert(format!("var_{i}"), *var);
            self.obs.results.insert(format!("std_{i}"), var.sqrt());
        }
        Ok(())
    }

    fn values(&self) -> &[Vec<f64>] {
        &self.obs.values
    }

    fn results(&self) -> &BTreeMap<String, f64> {
        &self.obs.results
    }
}

/// Pairwise population covariance, updated with the co-moment recursion.
#[derive(Debug, Clone)]
pub struct RunningCovariance {
    obs: Observations,
    mean: Vec<f64>,
    comoment: Matrix,
}

impl RunningCovariance {
    pub fn new(num_ind_variables: usize) -> Self {
        Self {
            obs: Observations::new(num_ind_variables),
            mean: vec![0.0; num_ind_variables],
            comoment: vec![vec![0.0; num_ind_variables]; num_ind_variables],
        }
    }

    pub fn covariance_matrix(&self) -> Matrix {
        let n = self.obs.count().max(1) as f64;
        self.comoment
            .iter()
            .map(|row| row.iter().map(|c| c / n).collect())
            .collect()
    }

    /// Correlation matrix; a variable with zero variance correlates 0 with
    /// everything except itself.
    pub fn correlation_matrix(&self) -> Matrix {
        let cov = self.covariance_matrix();
        let std: Vec<f64> = (0..cov.len()).map(|i| cov[i][i].sqrt()).collect();
        cov.iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, c)| {
                        if i == j {
                            1.0
                        } else if std[i] > 0.0 && std[j] > 0.0 {
                            c / (std[i] * std[j])
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

impl StreamingStat for RunningCovariance {
    fn num_ind_variables(&self) -> usize {
        self.obs.width
    }

    fn add_value(&mut self, x: &[f64]) -> Result<(), QuantkitError> {
        self.obs.push(x)?;
        let n = self.obs.count() as f64;
        let k = x.len();

        let delta_old: Vec<f64> = (0..k).map(|i| x[i] - self.mean[i]).collect();
        for i in 0..k {
            self.mean[i] += delta_old[i] / n;
        }
        for i in 0..k {
            for j in 0..k {
                self.comoment[i][j] += delta_old[i] * (x[j] - self.mean[j]);
            }
        }

        let cov = self.covariance_matrix();
        for (i, row) in cov.iter().enumerate() {
            for (j, c) in row.iter().enumerate().skip(i) {
                self.obs.results.insert(format!("cov_{i}_{j}"), *c);
            }
        }
        Ok(())
    }

    fn values(&self) -> &[Vec<f64>] {
        &self.obs.values
    }

    fn results(&self) -> &BTreeMap<String, f64> {
        &self.obs.results
    }
}

/// Ordinary least squares with intercept, fitted from running normal
/// equations.
///
/// Each observation is `[x_1, .., x_k, y]` with `k = num_ind_variables`.
/// Results hold `intercept`, `beta_1..beta_k` and `r_squared` once the
/// system is solvable.
#[derive(Debug, Clone)]
pub struct RecursiveRegression {
    obs: Observations,
    k: usize,
    xtx: Matrix,
    xty: Vec<f64>,
    sum_y: f64,
    sum_y2: f64,
}

impl RecursiveRegression {
    pub fn new(num_ind_variables: usize) -> Self {
        let p = num_ind_variables + 1;
        Self {
            obs: Observations::new(num_ind_variables + 1),
            k: num_ind_variables,
            xtx: vec![vec![0.0; p]; p],
            xty: vec![0.0; p],
            sum_y: 0.0,
            sum_y2: 0.0,
        }
    }

    /// Fitted coefficients `[intercept, beta_1, .., beta_k]`, if solvable.
    pub fn coefficients(&self) -> Option<Vec<f64>> {
        numeric::solve_linear_system(&self.xtx, &self.xty)
    }

    fn refresh(&mut self) {
        let Some(beta) = self.coefficients() else {
            return;
        };
        let n = self.obs.count() as f64;
        let sst = self.sum_y2 - self.sum_y * self.sum_y / n;
        let explained: f64 = beta.iter().zip(&self.xty).map(|(b, xy)| b * xy).sum();
        let sse = self.sum_y2 - explained;
        let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

        self.obs.results.insert("intercept".into(), beta[0]);
        for (i, b) in beta.iter().enumerate().skip(1) {
            self.obs.results.insert(format!("beta_{i}"), *b);
        }
        self.obs.results.insert("r_squared".into(), r_squared);
    }
}

impl StreamingStat for RecursiveRegression {
    fn num_ind_variables(&self) -> usize {
        self.k
    }

    fn add_value(&mut self, x: &[f64]) -> Result<(), QuantkitError> {
        self.obs.push(x)?;
        let y = x[self.k];
        let row: Vec<f64> = std::iter::once(1.0).chain(x[..self.k].iter().copied()).collect();

        for i in 0..row.len() {
            for j in 0..row.len() {
                self.xtx[i][j] += row[i] * row[j];
            }
            self.xty[i] += row[i] * y;
        }
        self.sum_y += y;
        self.sum_y2 += y * y;

        self.refresh();
        Ok(())
    }

    fn values(&self) -> &[Vec<f64>] {
        &self.obs.values
    }

    fn results(&self) -> &BTreeMap<String, f64> {
        &self.obs.results
    }
}

/// Exponentially weighted mean per variable, seeded with the first
/// observation.
#[derive(Debug, Clone)]
pub struct Ewma {
    obs: Observations,
    alpha: f64,
    level: Vec<f64>,
}

impl Ewma {
    pub fn with_span(num_ind_variables: usize, span: f64) -> Self {
        Self {
            obs: Observations::new(num_ind_variables),
            alpha: numeric::decay_span(span),
            level: vec![0.0; num_ind_variables],
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn level(&self) -> &[f64] {
        &self.level
    }
}

impl StreamingStat for Ewma {
    fn num_ind_variables(&self) -> usize {
        self.obs.width
    }

    fn add_value(&mut self, x: &[f64]) -> Result<(), QuantkitError> {
        self.obs.push(x)?;
        if self.obs.count() == 1 {
            self.level.copy_from_slice(x);
        } else {
            for (level, xi) in self.level.iter_mut().zip(x) {
                *level = self.alpha * xi + (1.0 - self.alpha) * *level;
            }
        }
        for (i, level) in self.level.iter().enumerate() {
            self.obs.results.insert(format!("ewma_{i}"), *level);
        }
        Ok(())
    }

    fn values(&self) -> &[Vec<f64>] {
        &self.obs.values
    }

    fn results(&self) -> &BTreeMap<String, f64> {
        &self.obs.results
    }
}
