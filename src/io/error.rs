use super::Format;
use crate::model::error::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        format: Format,
        line: usize,
        details: String,
    },

    #[error("the '{0}' format is not supported for this read operation")]
    UnsupportedReadFormat(Format),

    #[error("parsed {format} data violates structure invariants: {source}")]
    Schema {
        format: Format,
        #[source]
        source: SchemaError,
    },

    #[error("failed to serialize structure as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }

    pub fn schema(format: Format, source: SchemaError) -> Self {
        Self::Schema { format, source }
    }
}
