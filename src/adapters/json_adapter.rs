//! JSON record data adapter: `[{"date", "identifier", "value"}, ..]` read
//! from a file or supplied inline in the configuration.

use crate::domain::config::Record;
use crate::domain::error::QuantkitError;
use crate::domain::frame::Frame;
use crate::ports::data_port::{DataSource, LoadOptions};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub enum JsonInput {
    File(PathBuf),
    Inline(Vec<Record>),
}

pub struct JsonSource {
    name: String,
    input: JsonInput,
    frame: Frame,
}

impl JsonSource {
    pub fn new(name: &str, input: JsonInput) -> Self {
        Self {
            name: name.to_string(),
            input,
            frame: Frame::default(),
        }
    }

    fn read_records(&self) -> Result<Vec<Record>, QuantkitError> {
        match &self.input {
            JsonInput::Inline(records) => Ok(records.clone()),
            JsonInput::File(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| QuantkitError::DataLoad {
                        source_name: self.name.clone(),
                        reason: format!("{}: {e}", path.display()),
                    })?;
                serde_json::from_str(&content).map_err(|e| QuantkitError::Schema {
                    source_name: self.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl DataSource for JsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, options: &LoadOptions) -> Result<(), QuantkitError> {
        let records: Vec<_> = self
            .read_records()?
            .into_iter()
            .map(|r| (r.date, r.identifier, r.value))
            .collect();
        let frame = Frame::from_records(&records).map_err(|e| QuantkitError::Schema {
            source_name: self.name.clone(),
            reason: e.to_string(),
        })?;
        self.frame = frame.slice(options.start, options.end);
        debug!(source = %self.name, rows = self.frame.len(), "loaded json");
        Ok(())
    }

    fn df(&self) -> &Frame {
        &self.frame
    }
}
