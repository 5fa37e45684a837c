use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation failed: {message}")]
    Validation {
        code: &'static str,
        message: &'static str,
    },
    #[error("no live {kind} named '{identity}'")]
    NotFound { kind: &'static str, identity: String },
    #[error("persistence failure: {message}")]
    Persistence { message: String },
    #[error("live enumeration failed: {message}")]
    Collaborator { message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl RegistryError {
    pub fn validation(code: &'static str, message: &'static str) -> Self {
        Self::Validation { code, message }
    }

    pub fn not_found(kind: &'static str, identity: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            identity: identity.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Validation { code, message } => {
                (StatusCode::BAD_REQUEST, code, message.to_string())
            }
            Self::NotFound { kind, identity } => (
                StatusCode::NOT_FOUND,
                "resource_not_live",
                format!("no live {kind} named '{identity}'"),
            ),
            Self::Persistence { message } => {
                tracing::error!(error = %message, "watch list persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persistence_failure",
                    message,
                )
            }
            Self::Collaborator { message } => {
                tracing::error!(error = %message, "live enumeration failure");
                (StatusCode::BAD_GATEWAY, "enumeration_failure", message)
            }
        };

        (
            status,
            Json(ErrorResponse {
                code: code.to_string(),
                message,
                details: json!({}),
            }),
        )
            .into_response()
    }
}
