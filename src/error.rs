use thiserror::Error;

/// Errors raised by the quality-check pipeline.
///
/// The taxonomy matters for recovery: `Validation` is handled locally by
/// substituting a sentinel record, `Api` is retried at the completion-port
/// boundary and then surfaced as a row-level failure, `Processing` is always
/// a row-level failure, and `Store` aborts the whole run.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Input was empty or otherwise unusable before any provider call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The completion or transcription provider failed.
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Network, timeout, rate-limit and 5xx failures are transient and
        /// eligible for retry; everything else is permanent.
        transient: bool,
    },

    /// The model responded, but the response could not be turned into a
    /// schema-conformant record.
    #[error("processing error: {message}")]
    Processing {
        message: String,
        /// Raw model output, kept for diagnostics.
        raw_response: String,
    },

    /// The spreadsheet store is unreachable or rejected a request.
    #[error("store error: {0}")]
    Store(String),
}

impl CheckError {
    pub fn api(message: impl Into<String>, transient: bool) -> Self {
        Self::Api {
            message: message.into(),
            transient,
        }
    }

    pub fn processing(message: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
            raw_response: raw_response.into(),
        }
    }

    /// Whether a retry at the completion-port boundary may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api { transient: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CheckError::api("rate limited", true).is_transient());
        assert!(!CheckError::api("bad request", false).is_transient());
        assert!(!CheckError::Validation("empty".to_string()).is_transient());
        assert!(!CheckError::processing("bad json", "{").is_transient());
    }
}
