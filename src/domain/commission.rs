//! Commission policies: `(trade quantity, price) -> fee`.

use crate::domain::error::QuantkitError;

pub trait CommissionPolicy {
    fn fee(&self, quantity: f64, price: f64) -> f64;
}

impl<F> CommissionPolicy for F
where
    F: Fn(f64, f64) -> f64,
{
    fn fee(&self, quantity: f64, price: f64) -> f64 {
        self(quantity, price)
    }
}

/// No commission on any trade.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCommission;

impl CommissionPolicy for ZeroCommission {
    fn fee(&self, _quantity: f64, _price: f64) -> f64 {
        0.0
    }
}

pub const QUANTITY_COMMISSION_FLOOR: f64 = 100.0;
pub const QUANTITY_COMMISSION_RATE: f64 = 0.0021;

/// `max(100, |q| × 0.0021)`; the floor dominates for typical trade sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityCommission;

impl CommissionPolicy for QuantityCommission {
    fn fee(&self, quantity: f64, _price: f64) -> f64 {
        QUANTITY_COMMISSION_FLOOR.max(quantity.abs() * QUANTITY_COMMISSION_RATE)
    }
}

/// Fee proportional to traded notional, in basis points.
#[derive(Debug, Clone, Copy)]
pub struct BasisPointCommission {
    pub bps: f64,
}

impl CommissionPolicy for BasisPointCommission {
    fn fee(&self, quantity: f64, price: f64) -> f64 {
        (quantity * price).abs() * self.bps / 10_000.0
    }
}

/// Resolve a configured policy name.
pub fn from_name(name: &str, rate: Option<f64>) -> Result<Box<dyn CommissionPolicy>, QuantkitError> {
    match name.to_lowercase().as_str() {
        "zero" | "default" | "none" => Ok(Box::new(ZeroCommission)),
        "quantity" => Ok(Box::new(QuantityCommission)),
        "bps" => {
            let bps = rate.ok_or_else(|| QuantkitError::ConfigMissing {
                section: "commission".into(),
                key: "rate".into(),
            })?;
            if bps < 0.0 {
                return Err(QuantkitError::ConfigInvalid {
                    section: "commission".into(),
                    key: "rate".into(),
                    reason: "rate must be non-negative".into(),
                });
            }
            Ok(Box::new(BasisPointCommission { bps }))
        }
        other => Err(QuantkitError::ConfigInvalid {
            section: "commission".into(),
            key: "policy".into(),
            reason: format!("unknown commission policy '{other}'"),
        }),
    }
}
