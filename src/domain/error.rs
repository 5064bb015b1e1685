//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for quantkit.
#[derive(Debug, thiserror::Error)]
pub enum QuantkitError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown algo: {name}")]
    UnknownAlgo { name: String },

    #[error("failed to load data source {source_name}: {reason}")]
    DataLoad { source_name: String, reason: String },

    #[error("schema mismatch in {source_name}: {reason}")]
    Schema { source_name: String, reason: String },

    #[error("accounting violation on {date}: {reason}")]
    AccountingViolation { date: NaiveDate, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("strategy {name} has already run")]
    StrategyFinished { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantkitError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        QuantkitError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            QuantkitError::ConfigParse { .. }
                | QuantkitError::ConfigMissing { .. }
                | QuantkitError::ConfigInvalid { .. }
                | QuantkitError::UnknownAlgo { .. }
        )
    }
}

impl From<&QuantkitError> for std::process::ExitCode {
    fn from(err: &QuantkitError) -> Self {
        let code: u8 = match err {
            QuantkitError::Io(_) => 1,
            QuantkitError::ConfigParse { .. }
            | QuantkitError::ConfigMissing { .. }
            | QuantkitError::ConfigInvalid { .. }
            | QuantkitError::UnknownAlgo { .. } => 2,
            QuantkitError::DataLoad { .. } | QuantkitError::Schema { .. } => 3,
            QuantkitError::AccountingViolation { .. } => 4,
            QuantkitError::InvalidInput { .. } | QuantkitError::StrategyFinished { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_classified() {
        let err = QuantkitError::UnknownAlgo {
            name: "Nope".into(),
        };
        assert!(err.is_config_error());
        assert_eq!(err.to_string(), "unknown algo: Nope");

        let err = QuantkitError::DataLoad {
            source_name: "prices".into(),
            reason: "missing file".into(),
        };
        assert!(!err.is_config_error());
    }

    #[test]
    fn accounting_violation_names_the_tick() {
        let err = QuantkitError::AccountingViolation {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reason: "cash drift 5.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "accounting violation on 2024-03-01: cash drift 5.0"
        );
    }
}
