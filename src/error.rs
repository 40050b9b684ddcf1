//! Error types for the DSMR P1 pipeline.

use thiserror::Error;

use crate::types::Unit;

/// Result type alias for DSMR operations.
pub type Result<T> = std::result::Result<T, DsmrError>;

/// Fatal pipeline error types.
///
/// These abort the pipeline. Per-line extraction failures are a separate,
/// non-fatal concern — see [`FieldError`].
#[derive(Debug, Error)]
pub enum DsmrError {
    /// I/O error on the byte source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Extraction failure for a single data line.
///
/// Collected into a list by the parser; a bad line never aborts the
/// surrounding telegram, the affected field is just left at zero.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The line matched a known OBIS code but carried no value with the
    /// expected unit suffix
    #[error("no *{unit} value in data line {line:?}")]
    ValueNotFound {
        /// The offending line, lossily decoded
        line: String,
        /// Unit suffix that was expected
        unit: Unit,
    },

    /// The extracted value is not a parseable decimal number
    #[error("invalid number {value:?} in data line {line:?}: {reason}")]
    InvalidNumber {
        /// The offending line, lossily decoded
        line: String,
        /// The extracted value text
        value: String,
        /// Underlying parse failure
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DsmrError::ChannelClosed;
        assert_eq!(err.to_string(), "Channel closed");

        let err = DsmrError::Internal("scan task died".into());
        assert_eq!(err.to_string(), "Internal error: scan task died");
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::ValueNotFound {
            line: "1.8.1(banana)".into(),
            unit: Unit::KilowattHour,
        };
        assert_eq!(err.to_string(), "no *kWh value in data line \"1.8.1(banana)\"");

        let err = FieldError::InvalidNumber {
            line: "1.7.0(*kW)".into(),
            value: String::new(),
            reason: "cannot parse float from empty string".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid number \"\" in data line \"1.7.0(*kW)\": cannot parse float from empty string"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "port gone");
        let err = DsmrError::from(io);
        assert!(matches!(err, DsmrError::Io(_)));
    }
}
