//! Position tracking and trade fills.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: String,
    pub quantity: f64,
    pub last_mark: f64,
    pub avg_cost: f64,
    pub realised_pnl: f64,
    pub entry_date: NaiveDate,
}

impl Position {
    pub fn open(id: &str, quantity: f64, price: f64, date: NaiveDate) -> Self {
        Position {
            id: id.to_string(),
            quantity,
            last_mark: price,
            avg_cost: price,
            realised_pnl: 0.0,
            entry_date: date,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    /// Signed marked value `q × last_mark`.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.last_mark
    }

    pub fn unrealised_pnl(&self) -> f64 {
        self.quantity * (self.last_mark - self.avg_cost)
    }

    /// Apply a signed fill of `delta` at `price`, returning the PnL it
    /// realised.
    ///
    /// Fills in the direction of the position move the average cost. Fills
    /// against it realise `(price − avg_cost)` on the closed part; anything
    /// past zero opens a fresh position at `price`.
    pub fn apply_fill(&mut self, delta: f64, price: f64, date: NaiveDate) -> f64 {
        let before = self.quantity;
        let after = before + delta;
        self.last_mark = price;

        if before == 0.0 || before.signum() == delta.signum() {
            if after != 0.0 {
                self.avg_cost = (before * self.avg_cost + delta * price) / after;
            }
            if before == 0.0 {
                self.entry_date = date;
            }
            self.quantity = after;
            return 0.0;
        }

        let closed = delta.abs().min(before.abs()) * before.signum();
        let realised = closed * (price - self.avg_cost);
        self.realised_pnl += realised;

        if after != 0.0 && after.signum() != before.signum() {
            self.avg_cost = price;
            self.entry_date = date;
        }
        self.quantity = after;
        realised
    }
}

/// One executed trade leg.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub date: NaiveDate,
    pub id: String,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub realised_pnl: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn sample_long_position() -> Position {
        Position::open("US0378331005", 100.0, 50.0, date())
    }

    #[test]
    fn open_position_fields() {
        let pos = sample_long_position();
        assert!(pos.is_long());
        assert!(!pos.is_short());
        assert!((pos.avg_cost - 50.0).abs() < f64::EPSILON);
        assert!((pos.market_value() - 5000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn short_market_value_is_negative() {
        let pos = Position::open("X", -10.0, 20.0, date());
        assert!(pos.is_short());
        assert!((pos.market_value() - (-200.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn unrealised_pnl_follows_mark() {
        let mut pos = sample_long_position();
        pos.last_mark = 55.0;
        assert!((pos.unrealised_pnl() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn adding_moves_average_cost() {
        let mut pos = sample_long_position();
        let realised = pos.apply_fill(100.0, 60.0, date());
        assert_eq!(realised, 0.0);
        assert!((pos.quantity - 200.0).abs() < f64::EPSILON);
        assert!((pos.avg_cost - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reducing_realises_pnl() {
        let mut pos = sample_long_position();
        let realised = pos.apply_fill(-40.0, 60.0, date());
        assert!((realised - 400.0).abs() < f64::EPSILON);
        assert!((pos.realised_pnl - 400.0).abs() < f64::EPSILON);
        assert!((pos.quantity - 60.0).abs() < f64::EPSILON);
        assert!((pos.avg_cost - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn flipping_resets_cost_basis() {
        let mut pos = sample_long_position();
        let later = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let realised = pos.apply_fill(-150.0, 40.0, later);
        assert!((realised - (-1000.0)).abs() < f64::EPSILON);
        assert!(pos.is_short());
        assert!((pos.quantity - (-50.0)).abs() < f64::EPSILON);
        assert!((pos.avg_cost - 40.0).abs() < f64::EPSILON);
        assert_eq!(pos.entry_date, later);
    }

    #[test]
    fn fill_notional() {
        let fill = Fill {
            date: date(),
            id: "A".into(),
            quantity: -3.0,
            price: 10.0,
            commission: 0.0,
            realised_pnl: 0.0,
        };
        assert!((fill.notional() - (-30.0)).abs() < f64::EPSILON);
    }
}
