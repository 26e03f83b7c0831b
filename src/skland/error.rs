//! Error types for the remote service client

use thiserror::Error;

/// Errors that can occur while talking to the game service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Token grant or cred sign-in failed
    #[error("authorization failed: {0}")]
    Auth(String),

    /// Character binding enumeration failed
    #[error("failed to enumerate character bindings: {0}")]
    BindingFetch(String),

    /// The service explicitly rejected an attendance submission
    #[error("attendance rejected: {message} (code {code})")]
    Rejected { code: i64, message: String },

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected HTTP status from the service
    #[error("unexpected response status {status}")]
    Status { status: u16 },
}

impl ServiceError {
    /// Whether this error is the service's same-day duplicate-submission
    /// signal (an HTTP 403), which callers treat as "already attended"
    /// rather than a hard failure.
    pub fn is_duplicate_signal(&self) -> bool {
        match self {
            Self::Status { status } => *status == 403,
            Self::Http(e) => e.status().map(|s| s.as_u16()) == Some(403),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_is_duplicate_signal() {
        assert!(ServiceError::Status { status: 403 }.is_duplicate_signal());
        assert!(!ServiceError::Status { status: 500 }.is_duplicate_signal());
    }

    #[test]
    fn test_rejection_is_not_duplicate_signal() {
        let err = ServiceError::Rejected {
            code: 10001,
            message: "请勿重复签到".to_string(),
        };
        assert!(!err.is_duplicate_signal());
    }
}
