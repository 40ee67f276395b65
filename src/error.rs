//! Error taxonomy for rule loading, input canonicalisation and export

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-level faults. Fatal: detected once, before any scoring.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rules file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rules document is empty")]
    Empty,

    #[error("invalid rules YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("weight for '{component}' must be non-negative, got {weight}")]
    NegativeWeight { component: String, weight: f64 },

    #[error("weight '{0}' has no band table and the zero-contribution fallback is not enabled")]
    MissingBands(String),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("condition references unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid condition '{expr}': {reason}")]
    Condition { expr: String, reason: String },

    #[error("band {index} of '{component}': {reason}")]
    InvalidBand {
        component: String,
        index: usize,
        reason: String,
    },
}

/// Per-field rejection raised while canonicalising raw input.
/// Non-fatal: the field becomes `None` and the rejection is reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{0}: missing")]
    Missing(String),

    #[error("{field}: cannot parse '{raw}' as a number")]
    Unparsable { field: String, raw: String },

    #[error("{field}: negative value {value}")]
    Negative { field: String, value: f64 },
}

impl InputError {
    pub fn field(&self) -> &str {
        match self {
            InputError::Missing(field) => field,
            InputError::Unparsable { field, .. } => field,
            InputError::Negative { field, .. } => field,
        }
    }

    /// Validation-issue tag recorded on the score record
    pub fn issue_tag(&self) -> String {
        match self {
            InputError::Missing(field) => format!("missing_{field}"),
            InputError::Unparsable { field, .. } | InputError::Negative { field, .. } => {
                format!("invalid_{field}")
            }
        }
    }
}

/// Failure writing a single entity's artifacts. Logged, never aborts a batch.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {entity}: {source}")]
    Serialize {
        entity: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of an input collaborator to produce a scoring input.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no input for entity '{0}'")]
    NotFound(String),

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_tags() {
        assert_eq!(
            InputError::Missing("annual_income".into()).issue_tag(),
            "missing_annual_income"
        );
        let neg = InputError::Negative {
            field: "premium".into(),
            value: -5.0,
        };
        assert_eq!(neg.issue_tag(), "invalid_premium");
        assert_eq!(neg.field(), "premium");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingBands("tsar_income_ratio".into());
        assert!(err.to_string().contains("tsar_income_ratio"));
    }
}
