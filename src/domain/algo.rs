//! The unit of work applied to a [`Target`] once per tick.

use crate::domain::error::QuantkitError;
use crate::domain::target::Target;

/// A stateful step in a strategy pipeline.
///
/// `Ok(true)` lets the pipeline continue, `Ok(false)` stops the remainder of
/// the current tick without undoing earlier effects, and `Err` aborts the run.
/// One instance lives for the whole run, so per-run state may sit on `self`.
pub trait Algo {
    fn name(&self) -> &str;

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError>;
}

impl std::fmt::Debug for dyn Algo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Algo({})", self.name())
    }
}

/// Wraps a closure as an Algo; used to compose ad-hoc pipeline steps.
pub struct FnAlgo<F> {
    name: String,
    f: F,
}

impl<F> FnAlgo<F>
where
    F: FnMut(&mut Target) -> Result<bool, QuantkitError>,
{
    pub fn new(name: &str, f: F) -> Self {
        FnAlgo {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> Algo for FnAlgo<F>
where
    F: FnMut(&mut Target) -> Result<bool, QuantkitError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        (self.f)(target)
    }
}
