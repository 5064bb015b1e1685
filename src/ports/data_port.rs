//! Data access port trait.

use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use chrono::NaiveDate;

/// Inclusive date bounds applied while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// A named source of (date × identifier) data.
///
/// `load` populates the frame returned by `df`; before a successful load the
/// frame is empty.
pub trait DataSource {
    fn name(&self) -> &str;

    fn load(&mut self, options: &LoadOptions) -> Result<(), QuantkitError>;

    fn df(&self) -> &Frame;
}
