// crates/core/src/error.rs
use thiserror::Error;

/// Errors raised while interpreting report periods and bucket keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid {period} bucket key: {key}")]
    InvalidBucketKey { period: String, key: String },

    #[error("Period '{0}' has no calendar bucket")]
    UnbucketedPeriod(String),
}

impl CoreError {
    pub fn invalid_key(period: impl ToString, key: impl Into<String>) -> Self {
        Self::InvalidBucketKey {
            period: period.to_string(),
            key: key.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_message() {
        let err = CoreError::invalid_key("monthly", "2020-13");
        assert_eq!(err.to_string(), "Invalid monthly bucket key: 2020-13");
    }

    #[test]
    fn test_unbucketed_period_message() {
        let err = CoreError::UnbucketedPeriod("all".into());
        assert!(err.to_string().contains("'all'"));
    }
}
