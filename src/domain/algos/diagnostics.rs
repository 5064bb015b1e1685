use crate::domain::algo::Algo;
use crate::domain::error::QuantkitError;
use crate::domain::target::Target;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugParams {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for DebugParams {
    fn default() -> Self {
        DebugParams { enabled: true }
    }
}

/// Logs a snapshot of the target at debug level; never stops the pipeline.
#[derive(Debug)]
pub struct DebugSnapshot {
    enabled: bool,
}

impl DebugSnapshot {
    pub fn new(params: DebugParams) -> Self {
        Self {
            enabled: params.enabled,
        }
    }
}

impl Algo for DebugSnapshot {
    fn name(&self) -> &str {
        "Debug"
    }

    fn run(&mut self, target: &mut Target) -> Result<bool, QuantkitError> {
        if self.enabled {
            debug!(date = %target.now(), snapshot = ?target, "target snapshot");
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::Frame;
    use crate::domain::target::{AccountingSettings, DataSet};

    #[test]
    fn debug_always_continues() {
        let mut t = Target::new(DataSet::new(Frame::default()), AccountingSettings::default());
        assert!(DebugSnapshot::new(DebugParams::default()).run(&mut t).unwrap());
        assert!(DebugSnapshot::new(DebugParams { enabled: false }).run(&mut t).unwrap());
    }
}
