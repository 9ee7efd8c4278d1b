use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A fresh initiation already exists for this identity. Self-clears
    /// within the staleness window.
    #[error("Authentication already in progress")]
    AlreadyInProgress,

    /// No valid session found.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Request carried a malformed personal number.
    #[error("Invalid personal number")]
    InvalidPersonalNumber,

    /// Provider call failed or timed out.
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::AlreadyInProgress => (
                StatusCode::CONFLICT,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            Self::InvalidPersonalNumber => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            Self::Provider(_) => {
                // Detail stays in the logs; the client gets a generic body.
                tracing::error!(error = %self, "provider failure surfaced to client");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Identity provider unavailable" })),
                )
                    .into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "auth internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        Self::Provider(e.to_string())
    }
}

impl From<crate::flow::StartError> for AuthError {
    fn from(e: crate::flow::StartError) -> Self {
        match e {
            crate::flow::StartError::AlreadyInProgress => Self::AlreadyInProgress,
            crate::flow::StartError::Provider(err) => Self::Provider(err.to_string()),
        }
    }
}
