//! Performance metrics over a strategy's history.

use crate::domain::config::Frequency;
use crate::domain::history::History;
use crate::domain::position::Fill;
use serde::Serialize;

pub fn periods_per_year(frequency: Frequency) -> f64 {
    match frequency {
        Frequency::Daily => 252.0,
        Frequency::Weekly => 52.0,
        Frequency::Monthly => 12.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub starting_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub total_commissions: f64,
    pub avg_turnover: f64,
    pub total_fills: usize,
    pub realised_pnl: f64,
    pub winning_closes: usize,
    pub losing_closes: usize,
    pub aborted_ticks: usize,
}

impl Metrics {
    /// `starting_value` is the cash the run began with, so the first tick's
    /// commissions count against the return.
    pub fn compute(
        history: &History,
        fills: &[Fill],
        starting_value: f64,
        periods_per_year: f64,
    ) -> Self {
        let rows = history.rows();
        let final_value = history.last().map(|r| r.value).unwrap_or(starting_value);

        let total_return = if starting_value > 0.0 {
            (final_value - starting_value) / starting_value
        } else {
            0.0
        };

        let years = rows.len() as f64 / periods_per_year;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let mut curve = Vec::with_capacity(rows.len() + 1);
        curve.push(starting_value);
        curve.extend(history.values());

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&curve);
        let returns = period_returns(&curve);
        let (volatility, sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, periods_per_year);

        let avg_turnover = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.turnover).sum::<f64>() / rows.len() as f64
        };

        let realised_pnl = fills.iter().map(|f| f.realised_pnl).sum();
        let winning_closes = fills.iter().filter(|f| f.realised_pnl > 0.0).count();
        let losing_closes = fills.iter().filter(|f| f.realised_pnl < 0.0).count();

        Metrics {
            starting_value,
            final_value,
            total_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_commissions: history.total_commissions(),
            avg_turnover,
            total_fills: fills.len(),
            realised_pnl,
            winning_closes,
            losing_closes,
            aborted_ticks: history.aborted_ticks(),
        }
    }
}

fn period_returns(curve: &[f64]) -> Vec<f64> {
    curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn compute_drawdown(curve: &[f64]) -> (f64, usize) {
    let Some(&first) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0usize;
    let mut duration = 0usize;

    for &value in curve {
        if value >= peak {
            peak = value;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

/// Annualised volatility, Sharpe and Sortino (zero risk-free rate).
fn compute_risk_adjusted(returns: &[f64], periods_per_year: f64) -> (f64, f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let scale = periods_per_year.sqrt();

    let sharpe = if stddev > 0.0 {
        mean / stddev * scale
    } else {
        0.0
    };

    let downside = (returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n)
        .sqrt();
    let sortino = if downside > 0.0 {
        mean / downside * scale
    } else {
        0.0
    };

    (stddev * scale, sharpe, sortino)
}
