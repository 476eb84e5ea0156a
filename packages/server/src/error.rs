use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use journal_common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::polish::PolishError;

/// Seconds a client should wait before retrying a timed-out polish.
const POLISH_RETRY_AFTER_SECS: u64 = 30;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "raw_text must not be empty")]
    pub error: String,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `NOT_FOUND`, `CONFLICT`, `RATE_LIMITED`,
    /// `UPSTREAM_TIMEOUT`, `UPSTREAM_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    NotFound(String),
    Conflict(String),
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited {
        retry_after: u64,
    },
    /// The polishing service did not answer in time.
    UpstreamTimeout {
        retry_after: u64,
    },
    /// The polishing service failed. Detail is logged, not returned.
    Upstream(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    error: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    error: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    error: "Invalid or expired token".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    error: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    error: msg,
                },
            ),
            AppError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody {
                    code: "RATE_LIMITED",
                    error: format!("Rate limit exceeded. Try again in {} seconds", retry_after),
                },
            ),
            AppError::UpstreamTimeout { retry_after } => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody {
                    code: "UPSTREAM_TIMEOUT",
                    error: format!(
                        "Polishing service timed out. Try again in {} seconds",
                        retry_after
                    ),
                },
            ),
            AppError::Upstream(detail) => {
                tracing::error!("Upstream error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "UPSTREAM_ERROR",
                        error: "Polishing service failed".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        error: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::RateLimited { retry_after } | AppError::UpstreamTimeout { retry_after } => {
                Some(*retry_after)
            }
            _ => None,
        };

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::Validation(format!("Photo exceeds maximum size of {limit} bytes"))
            }
            StorageError::InvalidPath(msg) => AppError::Validation(msg),
            StorageError::AlreadyExists(path) => {
                AppError::Conflict(format!("Photo already exists at {path}"))
            }
            StorageError::Io(e) => AppError::Internal(format!("Photo storage failed: {e}")),
        }
    }
}

impl From<PolishError> for AppError {
    fn from(err: PolishError) -> Self {
        match err {
            PolishError::Timeout(after) => {
                tracing::warn!("Polish request timed out after {}s", after.as_secs());
                AppError::UpstreamTimeout {
                    retry_after: POLISH_RETRY_AFTER_SECS,
                }
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}
