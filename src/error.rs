use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the pipeline stages. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Input table does not have the expected shape
    #[error("{source_name}: malformed source: {message}")]
    SourceFormat {
        source_name: String,
        message: String,
    },

    /// Index provider answered with a non-success status
    #[error("index provider returned HTTP {status}: {body}")]
    RemoteFetch { status: u16, body: String },

    /// Index provider could not be reached or its body could not be read
    #[error("index provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{stage}: cannot parse numeric value {value:?}")]
    NumericParse { stage: &'static str, value: String },

    #[error("reference date {date} not present in the aligned series")]
    ReferenceDateNotFound { date: NaiveDate },

    #[error("failed to persist {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    pub fn source_format(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFormat {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn persistence(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = EtlError::NumericParse {
            stage: "stage1_align",
            value: "12,3,4".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "stage1_align: cannot parse numeric value \"12,3,4\""
        );

        let err = EtlError::RemoteFetch {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "index provider returned HTTP 503: unavailable"
        );
    }
}
