use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Caller-facing error taxonomy. Store and cache internals never leak:
/// database failures map to a generic 500 body with details in the logs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Auth(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Endpoints like PUT and DELETE report a missing record as 400 rather
    /// than 404; the message stays the same so ownership is never revealed.
    pub fn absent_as_bad_request(self) -> Self {
        match self {
            Error::NotFound(msg) => Error::Validation(msg),
            other => other,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::InvalidState(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_invalid_state_map_to_400() {
        assert_eq!(
            Error::validation("Amount must be greater than 0").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::InvalidState("Cannot edit a paid debt".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn auth_maps_to_401_and_not_found_to_404() {
        assert_eq!(Error::Auth("Invalid credentials".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::not_found("Debt not found").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn absent_as_bad_request_downgrades_only_not_found() {
        let err = Error::not_found("Debt not found").absent_as_bad_request();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Debt not found");

        let err = Error::Auth("Invalid credentials".into()).absent_as_bad_request();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_errors_hide_details_from_the_body() {
        let response = Error::Internal(anyhow::anyhow!("pool exhausted")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
