use thiserror::Error;

/// Interchange parsing and conversion errors
#[derive(Error, Debug)]
pub enum InterchangeError {
    /// A date or time literal could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// The local time does not exist in the configured timezone (DST gap).
    #[error("Non-existent local time: {0}")]
    NonExistentTime(String),

    #[error("Payload parse error: {0}")]
    PayloadParseError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error(transparent)]
    CoreError(#[from] almanac_core::error::CoreError),
}

pub type InterchangeResult<T> = std::result::Result<T, InterchangeError>;
