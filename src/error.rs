//! Unified error handling for the stopover library.
//!
//! This module provides a consistent error type for all stopover operations,
//! replacing mixed error handling patterns (Option, panic, silent failures).

use std::fmt;

/// Unified error type for stopover operations.
#[derive(Debug, Clone)]
pub enum StopoverError {
    /// Configuration error (rejected at construction, never mid-pipeline)
    ConfigError { message: String },
    /// Interval has no points
    EmptyInterval,
    /// The POI service answered with a rate-limit response (HTTP 429)
    RateLimited,
    /// HTTP/API error
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// The POI service returned a body we could not decode
    MalformedResponse { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for StopoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopoverError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            StopoverError::EmptyInterval => {
                write!(f, "Interval contains no points")
            }
            StopoverError::RateLimited => {
                write!(f, "POI service rate limit (429)")
            }
            StopoverError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            StopoverError::MalformedResponse { message } => {
                write!(f, "Malformed POI response: {}", message)
            }
            StopoverError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for StopoverError {}

/// Result type alias for stopover operations.
pub type Result<T> = std::result::Result<T, StopoverError>;
