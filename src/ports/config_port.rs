//! Configuration access port trait.

use serde_json::Value;

/// Read access to a merged configuration document.
pub trait ConfigPort {
    fn document(&self) -> &Value;

    fn section(&self, section: &str) -> Option<&Value> {
        self.document().get(section)
    }

    fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.section(section)?.get(key)
    }

    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.get(section, key)?.as_str().map(str::to_string)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get(section, key)
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get(section, key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get(section, key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }
}
