//! Concrete adapter implementations for ports.

pub mod blank_adapter;
pub mod csv_adapter;
pub mod json_adapter;
pub mod json_config_adapter;

use crate::domain::config::SourceSpec;
use crate::domain::error::QuantkitError;
use crate::ports::data_port::DataSource;
use blank_adapter::BlankSource;
use csv_adapter::CsvSource;
use json_adapter::{JsonInput, JsonSource};

/// Build the data source described by `spec`; relative paths resolve against
/// `base_dir`.
pub fn build_source(
    name: &str,
    spec: &SourceSpec,
    base_dir: &std::path::Path,
) -> Result<Box<dyn DataSource>, QuantkitError> {
    let missing_path = || QuantkitError::ConfigMissing {
        section: name.to_string(),
        key: "path".to_string(),
    };
    let source: Box<dyn DataSource> = match spec.source.as_str() {
        "csv" => {
            let path = spec.path.as_ref().ok_or_else(missing_path)?;
            Box::new(CsvSource::new(name, base_dir.join(path)))
        }
        "json" => {
            let input = match (&spec.records, &spec.path) {
                (Some(records), _) => JsonInput::Inline(records.clone()),
                (None, Some(path)) => JsonInput::File(base_dir.join(path)),
                (None, None) => return Err(missing_path()),
            };
            Box::new(JsonSource::new(name, input))
        }
        "blank" => Box::new(BlankSource::new(
            name,
            spec.columns.clone().unwrap_or_default(),
        )),
        other => {
            return Err(QuantkitError::ConfigInvalid {
                section: name.to_string(),
                key: "source".to_string(),
                reason: format!("unknown data source '{other}'"),
            });
        }
    };
    Ok(source)
}
