//! Error types shared by the taxi loader crates

use thiserror::Error;

/// Result type alias for configuration and startup operations
pub type Result<T> = std::result::Result<T, TaxiError>;

/// Errors raised before a batch starts: bad configuration, unusable
/// environment, unreachable infrastructure.
#[derive(Error, Debug)]
pub enum TaxiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Invalid period: {year}-{month}")]
    InvalidPeriod { year: u16, month: u8 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl TaxiError {
    /// Shorthand for an environment variable or flag that failed to parse
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        TaxiError::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TaxiError::invalid_value("TAXI_CHUNK_SIZE", "abc");
        assert_eq!(err.to_string(), "Invalid value for TAXI_CHUNK_SIZE: abc");

        let err = TaxiError::InvalidPeriod { year: 2019, month: 13 };
        assert_eq!(err.to_string(), "Invalid period: 2019-13");
    }
}
