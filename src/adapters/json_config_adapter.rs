//! JSON file configuration adapter with base/local layering.

use crate::domain::config::deep_merge;
use crate::domain::error::QuantkitError;
use crate::ports::config_port::ConfigPort;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub struct JsonConfigAdapter {
    document: Value,
}

impl JsonConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuantkitError> {
        Ok(Self {
            document: load_json(path.as_ref())?,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, QuantkitError> {
        let document = serde_json::from_str(content).map_err(|e| QuantkitError::ConfigParse {
            file: "<string>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { document })
    }

    pub fn from_value(document: Value) -> Self {
        Self { document }
    }

    /// Load `base` and, when given, deep-merge `local` over it.
    pub fn layered<P: AsRef<Path>>(base: P, local: Option<P>) -> Result<Self, QuantkitError> {
        let mut adapter = Self::from_file(base)?;
        if let Some(local) = local {
            let overlay = load_json(local.as_ref())?;
            adapter.merge(overlay);
        }
        Ok(adapter)
    }

    pub fn merge(&mut self, overlay: Value) {
        deep_merge(&mut self.document, overlay);
    }

    pub fn into_value(self) -> Value {
        self.document
    }
}

impl ConfigPort for JsonConfigAdapter {
    fn document(&self) -> &Value {
        &self.document
    }
}

fn load_json(path: &Path) -> Result<Value, QuantkitError> {
    debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&content).map_err(|e| QuantkitError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if !document.is_object() {
        return Err(QuantkitError::ConfigParse {
            file: path.display().to_string(),
            reason: "top level must be an object".to_string(),
        });
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let adapter = JsonConfigAdapter::from_string(
            r#"{"strategy": {"name": "carry"}, "accounting": {"starting_cash": 1000.5}}"#,
        )
        .unwrap();
        assert_eq!(adapter.get_string("strategy", "name"), Some("carry".to_string()));
        assert_eq!(adapter.get_double("accounting", "starting_cash", 0.0), 1000.5);
    }

    #[test]
    fn getters_fall_back_to_defaults() {
        let adapter = JsonConfigAdapter::from_string(r#"{"accounting": {"tolerance": "x"}}"#).unwrap();
        assert_eq!(adapter.get_string("accounting", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_double("accounting", "tolerance", 1e-9), 1e-9);
        assert_eq!(adapter.get_int("accounting", "n", 42), 42);
        assert!(adapter.get_bool("accounting", "integer_shares", true));
    }

    #[test]
    fn layered_files_merge_local_over_base() {
        let base = create_temp_config(r#"{"a": 1, "b": {"c": 2, "d": 3}}"#);
        let local = create_temp_config(r#"{"b": {"c": 9}}"#);
        let adapter = JsonConfigAdapter::layered(base.path(), Some(local.path())).unwrap();
        assert_eq!(adapter.document(), &json!({"a": 1, "b": {"c": 9, "d": 3}}));
    }

    #[test]
    fn malformed_override_is_a_parse_error() {
        let base = create_temp_config(r#"{"a": 1}"#);
        let local = create_temp_config("{not json");
        let result = JsonConfigAdapter::layered(base.path(), Some(local.path()));
        assert!(matches!(result, Err(QuantkitError::ConfigParse { .. })));
    }

    #[test]
    fn non_object_document_rejected() {
        let file = create_temp_config("[1, 2]");
        assert!(matches!(
            JsonConfigAdapter::from_file(file.path()),
            Err(QuantkitError::ConfigParse { .. })
        ));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = JsonConfigAdapter::from_file("/nonexistent/path/config.json");
        assert!(matches!(result, Err(QuantkitError::Io(_))));
    }
}
