use serde::Serialize;
use std::io::Error as IoError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationFailure {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out")]
    Timeout,
    #[error("geolocation unsupported")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum ProximityError {
    #[error("Location unavailable: {0}")]
    LocationUnavailable(LocationFailure),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Malformed Data: {0}")]
    MalformedData(String),
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("File IO Error: {0}")]
    FileIO(#[from] IoError),
    #[error("Session with ID {0} not found")]
    SessionNotFound(i32),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl From<reqwest::Error> for ProximityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProximityError::Network(format!("request timed out: {}", e))
        } else {
            ProximityError::Network(e.to_string())
        }
    }
}

impl LocationFailure {
    /// Maps the W3C geolocation error codes (1, 2, 3).
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => LocationFailure::PermissionDenied,
            2 => LocationFailure::PositionUnavailable,
            3 => LocationFailure::Timeout,
            _ => LocationFailure::Unsupported,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProximityError>;
