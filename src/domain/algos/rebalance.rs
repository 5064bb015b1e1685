use crate::domain::accounting;
use crate::domain::algo::Algo;
use crate::domain::error::QuantkitError;
use crate::domain::scratch::ScratchValue;
use crate::domain::target::Target;
use tracing::debug;

/// Trades the book to `temp.weights`.
///
/// A tick where no weigher produced weights leaves positions untouched. The
/// rebalance turnover is left in `temp` under `("Rebalance", "turnover")`.
#[derive(Debug, Default)]
pub struct Rebalance;

impl Algo for Rebalance {
    fn name(&self) -> &str {
        "Rebalance"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        let Some(weights) = target.temp_mut().weights.take() else {
            debug!(date = %target.now(), "no weights this tick; nothing to rebalance");
            return Ok(true);
        };

        let report = accounting::rebalance(target, &weights)?;
        debug!(
            date = %target.now(),
            fills = report.fills.len(),
            skipped = report.skipped.len(),
            turnover = report.turnover,
            "rebalanced"
        );

        let temp = target.temp_mut();
        temp.weights = Some(weights);
        temp.insert(self.name(), "turnover", ScratchValue::Number(report.turnover));
        Ok(true)
    }
}
