//! Unified error handling for the qiandao crate
//!
//! Domain-specific errors live next to their modules (`ServiceError`,
//! `StoreError`, `ChannelError`, `SmtpError`); this module provides the
//! unified [`Error`] enum that wraps them for use across module boundaries,
//! plus an [`ErrorCategory`] classification for handling strategies.

use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::notify::{ChannelError, SmtpError};
pub use crate::skland::ServiceError;
pub use crate::store::StoreError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, remote service)
    Network,
    /// Storage errors
    Storage,
    /// Notification delivery errors
    Delivery,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the qiandao crate
#[derive(Error, Debug)]
pub enum Error {
    /// Remote game service errors
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Durable storage errors
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Notification channel errors
    #[error("notification error: {0}")]
    Channel(#[from] ChannelError),

    /// Mail transport errors
    #[error("mail transport error: {0}")]
    Smtp(#[from] SmtpError),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Service(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Channel(_) | Self::Smtp(_) => ErrorCategory::Delivery,
            Self::Io(_) => ErrorCategory::Other,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Check if this error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            // an explicit rejection will not change on retry
            Self::Service(ServiceError::Rejected { .. }) => false,
            Self::Service(_) | Self::Http(_) => true,
            Self::Store(_) => true,
            Self::Channel(_) | Self::Smtp(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
