//! Null data source: an empty frame with the expected columns.

use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use crate::ports::data_port::{DataSource, LoadOptions};

pub struct BlankSource {
    name: String,
    frame: Frame,
}

impl BlankSource {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            frame: Frame::empty(columns),
        }
    }
}

impl DataSource for BlankSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, _options: &LoadOptions) -> Result<(), QuantkitError> {
        Ok(())
    }

    fn df(&self) -> &Frame {
        &self.frame
    }
}
