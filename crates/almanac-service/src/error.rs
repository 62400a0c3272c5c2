use thiserror::Error;

/// Failures of the event import pipeline. The display text is shown to the
/// user who started the import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Request failed: {0}.")]
    FetchError(String),

    #[error("Couldn't find JSON URL for this event. Does the site support event importing?")]
    DiscoveryError(String),

    #[error("JSON request failed: {0}.")]
    PayloadFetchError(String),

    #[error("Failed to parse JSON data for event.")]
    PayloadParseError(String),

    #[error("Invalid date or time in event data: {0}")]
    ParseError(String),
}

impl ImportError {
    /// Underlying cause, for logs.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::FetchError(detail)
            | Self::DiscoveryError(detail)
            | Self::PayloadFetchError(detail)
            | Self::PayloadParseError(detail)
            | Self::ParseError(detail) => detail,
        }
    }
}

/// A request that produced no response: connection failure, timeout or an
/// unreadable body.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self(error.to_string())
    }
}

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] almanac_db::error::DbError),

    #[error(transparent)]
    InterchangeError(#[from] almanac_interchange::error::InterchangeError),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),

    #[error(transparent)]
    ImportError(#[from] ImportError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Diesel error: {0}")]
    DieselError(#[from] diesel::result::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
