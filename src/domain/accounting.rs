//! Position and cash accounting: marking, order application and the
//! per-tick invariant check.
//!
//! Every fill goes through [`execute`], which books the cash movement and
//! commission in the tick ledger so the engine can verify conservation at
//! the end of the tick.

use crate::domain::error::QuantkitError;
use crate::domain::numeric::is_zero;
use crate::domain::position::{Fill, Position};
use crate::domain::target::Target;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Relative size below which a rebalance leg is treated as already done.
const SUB_PRECISION_TRADE: f64 = 1e-12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebalanceReport {
    pub fills: Vec<Fill>,
    /// Identifiers with no usable price at `now`, or outside the universe
    /// and not already held.
    pub skipped: Vec<String>,
    pub commissions: f64,
    /// Traded notional as a fraction of pre-trade value.
    pub turnover: f64,
}

/// Cash and value at the start of a tick, after marking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOpening {
    pub cash: f64,
    pub value: f64,
}

impl TickOpening {
    pub fn of(target: &Target) -> Self {
        TickOpening {
            cash: target.cash,
            value: target.value,
        }
    }
}

/// Mark every held position at `now` and recompute value.
///
/// Positions without a price keep their previous mark; their identifiers are
/// returned.
pub fn mark_to_market(target: &mut Target) -> Vec<String> {
    let now = target.now;
    let mut missing = Vec::new();

    for (id, position) in target.positions.iter_mut() {
        match target.data.prices().get(now, id) {
            Some(price) => position.last_mark = price,
            None => missing.push(id.clone()),
        }
    }

    for id in &missing {
        warn!(date = %now, id = %id, "no price at tick; keeping last mark");
    }
    target.value = target.marked_value();
    missing
}

/// Apply a signed trade of `delta` units of `id` at `price`.
pub fn execute(target: &mut Target, id: &str, delta: f64, price: f64) -> Fill {
    let now = target.now;
    let commission = if delta == 0.0 {
        0.0
    } else {
        target.commission.fee(delta, price)
    };

    let position = target
        .positions
        .entry(id.to_string())
        .or_insert_with(|| Position::open(id, 0.0, price, now));
    let realised_pnl = position.apply_fill(delta, price, now);
    if is_zero(position.quantity, target.settings.zero_tolerance) {
        target.positions.remove(id);
    }

    let notional = delta * price;
    target.cash -= notional + commission;
    target.ledger.trade_cash += notional;
    target.ledger.traded_notional += notional.abs();
    target.ledger.commissions += commission;

    let fill = Fill {
        date: now,
        id: id.to_string(),
        quantity: delta,
        price,
        commission,
        realised_pnl,
    };
    debug!(date = %now, id, quantity = delta, price, commission, "fill");
    target.fills.push(fill.clone());
    fill
}

/// Trade `delta` units of `id` at the current price, if there is one.
pub fn trade(target: &mut Target, id: &str, delta: f64) -> Option<Fill> {
    let Some(price) = target.price(id) else {
        warn!(date = %target.now, id, "no price at tick; trade skipped");
        return None;
    };
    let fill = execute(target, id, delta, price);
    target.value = target.marked_value();
    Some(fill)
}

/// Close the whole position in `id` at the current price, or at the last
/// mark when there is no price today.
pub fn liquidate(target: &mut Target, id: &str) -> Option<Fill> {
    let position = target.positions.get(id)?;
    let price = target.price(id).unwrap_or(position.last_mark);
    let delta = -position.quantity;
    let fill = execute(target, id, delta, price);
    target.value = target.marked_value();
    Some(fill)
}

/// Move the portfolio to the requested weights of the pre-trade value.
///
/// Held identifiers missing from `weights` are closed. Identifiers that are
/// neither in the universe nor held are never opened. Gross exposure above
/// one is scaled back unless leverage is allowed.
pub fn rebalance(
    target: &mut Target,
    weights: &BTreeMap<String, f64>,
) -> Result<RebalanceReport, QuantkitError> {
    if let Some((id, w)) = weights.iter().find(|(_, w)| !w.is_finite()) {
        return Err(QuantkitError::invalid_input(format!(
            "weight for {id} is not finite ({w})"
        )));
    }

    let gross: f64 = weights.values().map(|w| w.abs()).sum();
    let scale = if gross > 1.0 + SUB_PRECISION_TRADE && !target.settings.allow_leverage {
        warn!(
            date = %target.now,
            gross,
            "gross weight above 1 without leverage; scaling down"
        );
        1.0 / gross
    } else {
        1.0
    };

    let mut legs: BTreeMap<String, f64> = weights
        .iter()
        .map(|(id, w)| (id.clone(), w * scale))
        .collect();
    for id in target.positions.keys() {
        legs.entry(id.clone()).or_insert(0.0);
    }

    let value = target.value;
    let mut report = RebalanceReport::default();

    for (id, weight) in legs {
        if !target.universe.contains(&id) && !target.positions.contains_key(&id) {
            warn!(date = %target.now, id = %id, "not in universe; leg skipped");
            report.skipped.push(id);
            continue;
        }
        let price = match target.price(&id) {
            Some(p) if p > 0.0 => p,
            _ => {
                warn!(date = %target.now, id = %id, "no usable price at tick; leg skipped");
                report.skipped.push(id);
                continue;
            }
        };

        let mut desired = weight * value / price;
        if target.settings.integer_shares {
            desired = desired.trunc();
        }
        let current = target.quantity(&id);
        let delta = desired - current;
        let scale = desired.abs().max(current.abs());
        if delta == 0.0 || delta.abs() <= SUB_PRECISION_TRADE * scale {
            continue;
        }

        let fill = execute(target, &id, delta, price);
        report.commissions += fill.commission;
        report.turnover += fill.notional().abs();
        report.fills.push(fill);
    }

    if value != 0.0 {
        report.turnover /= value.abs();
    }
    target.value = target.marked_value();
    Ok(report)
}

/// Verify cash and value conservation for the current tick.
pub fn check_invariants(target: &Target, opening: &TickOpening) -> Result<(), QuantkitError> {
    let tolerance = target.settings.tolerance * opening.value.abs().max(1.0);
    let ledger = &target.ledger;
    let violation = |reason: String| QuantkitError::AccountingViolation {
        date: target.now,
        reason,
    };

    let expected_cash =
        opening.cash + ledger.adjustments - ledger.trade_cash - ledger.commissions;
    if (target.cash - expected_cash).abs() > tolerance {
        return Err(violation(format!(
            "cash {} differs from expected {expected_cash}",
            target.cash
        )));
    }

    let marked = target.marked_value();
    let expected_value = opening.value + ledger.adjustments - ledger.commissions;
    if (marked - expected_value).abs() > tolerance {
        return Err(violation(format!(
            "marked value {marked} differs from expected {expected_value}"
        )));
    }
    if (target.value - marked).abs() > tolerance {
        return Err(violation(format!(
            "recorded value {} differs from marked value {marked}",
            target.value
        )));
    }

    if let Some(p) = target
        .positions
        .values()
        .find(|p| is_zero(p.quantity, target.settings.zero_tolerance))
    {
        return Err(violation(format!("zero-quantity position {} retained", p.id)));
    }
    Ok(())
}
