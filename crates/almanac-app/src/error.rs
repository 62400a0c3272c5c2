use salvo::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use almanac_core::error::CoreError;
use almanac_db::error::DbError;
use almanac_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] DbError),

    #[error(transparent)]
    CoreError(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Requesting user unknown")]
    Unauthenticated,

    #[error("Service unavailable: {0}")]
    Unavailable(&'static str),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// ## Summary
    /// The status a handler answers with for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(
                ServiceError::NotFound(_) | ServiceError::CoreError(CoreError::NotFound(_)),
            )
            | Self::CoreError(CoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::ServiceError(
                ServiceError::ValidationError(_)
                | ServiceError::ImportError(_)
                | ServiceError::CoreError(CoreError::ValidationError(_) | CoreError::InvalidInput(_)),
            )
            | Self::CoreError(CoreError::ValidationError(_) | CoreError::InvalidInput(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ServiceError(ServiceError::DatabaseError(DbError::SlugConflict(_)))
            | Self::DatabaseError(DbError::SlugConflict(_)) => StatusCode::CONFLICT,
            Self::ServiceError(ServiceError::DatabaseError(DbError::PoolError(_)))
            | Self::DatabaseError(DbError::PoolError(_))
            | Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// ## Summary
    /// The message shown to the client. Server-side failures are not described.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }

    /// ## Summary
    /// Renders the error as a JSON body with its status.
    ///
    /// ## Side Effects
    /// Logs server-side failures at error level and the rest at debug.
    pub fn render(&self, res: &mut salvo::Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        res.status_code(status);
        res.render(salvo::writing::Json(ErrorResponse {
            error: self.public_message(),
        }));
    }
}
