use thiserror::Error;

/// Substrings providers use when they throttle a caller.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "too many requests",
    "rate limit",
    "http 429",
    "status 429",
    "status code 429",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// A single provider call failed. The cascade logs it and moves on.
    #[error("Provider call {call} failed: {message}")]
    ProviderCallFailed { call: String, message: String },

    /// A date or number could not be read; the field is treated as absent.
    #[error("Parse failed: {0}")]
    ParseFailed(String),

    /// No provider call populated a single field.
    #[error("Failed to retrieve any data for {symbol}")]
    RetrievalFailed {
        symbol: String,
        /// Outcome of the last-resort existence check, if it ran and answered.
        symbol_exists: Option<bool>,
        /// At least one swallowed failure was a provider throttle.
        rate_limited: bool,
    },

    #[error("Rate limited: {0}")]
    RateLimited(String),
}

impl SnapshotError {
    /// Classify a raw provider error message. Throttling is recognised by
    /// message content so adapters don't need to know the status code.
    pub fn from_provider_message(call: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
            SnapshotError::RateLimited(message)
        } else {
            SnapshotError::ProviderCallFailed {
                call: call.to_string(),
                message,
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SnapshotError::RateLimited(_))
    }

    /// Whether a boundary should answer with a retry-later signal instead of
    /// a generic failure.
    pub fn is_retry_later(&self) -> bool {
        match self {
            SnapshotError::RateLimited(_) => true,
            SnapshotError::RetrievalFailed { rate_limited, .. } => *rate_limited,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_messages_are_classified() {
        let err = SnapshotError::from_provider_message("quote", "Too Many Requests");
        assert!(err.is_rate_limited());
        assert!(err.is_retry_later());

        let err = SnapshotError::from_provider_message("quote", "HTTP 429: slow down");
        assert!(err.is_rate_limited());

        let err = SnapshotError::from_provider_message("quote", "Exceeded rate limit for key");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_other_messages_are_call_failures() {
        let err = SnapshotError::from_provider_message("quoteSummary", "Quote not found for ticker symbol: ZZZZ");
        assert_eq!(
            err,
            SnapshotError::ProviderCallFailed {
                call: "quoteSummary".to_string(),
                message: "Quote not found for ticker symbol: ZZZZ".to_string(),
            }
        );
        assert!(!err.is_retry_later());
    }

    #[test]
    fn test_bare_digits_are_not_throttling() {
        let err = SnapshotError::from_provider_message("quote", "No data for filing 4290-A");
        assert!(!err.is_rate_limited());

        let err = SnapshotError::from_provider_message("quote", "Request failed with status code 429");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_retrieval_failed_retry_hint() {
        let throttled = SnapshotError::RetrievalFailed {
            symbol: "ABC".to_string(),
            symbol_exists: None,
            rate_limited: true,
        };
        assert!(throttled.is_retry_later());

        let missing = SnapshotError::RetrievalFailed {
            symbol: "ABC".to_string(),
            symbol_exists: Some(false),
            rate_limited: false,
        };
        assert!(!missing.is_retry_later());
        assert_eq!(missing.to_string(), "Failed to retrieve any data for ABC");
    }
}
