//! HTTP error mapping.
//!
//! Every failure leaves the service as `{"error": <message>, "code": <CODE>}`.
//! Database constraint violations that a client can cause are translated by
//! constraint name; anything else is logged and reported as an opaque 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use millwright_core::error::CoreError;
use serde_json::json;

/// Error type returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed request that is not a domain validation failure.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Status, machine code, and message of an error response.
#[derive(Debug, PartialEq, Eq)]
struct Reply {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Reply {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

fn core_reply(err: &CoreError) -> Reply {
    match err {
        CoreError::NotFound { entity, id } => Reply::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::NotFoundByKey { entity, key } => Reply::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} '{key}' not found"),
        ),
        CoreError::Validation(msg) => Reply::validation(msg.clone()),
        CoreError::Conflict(msg) => Reply::conflict(msg.clone()),
        CoreError::Unauthorized(msg) => {
            Reply::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
        }
        CoreError::Forbidden(msg) => Reply::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            Reply::internal()
        }
    }
}

/// Translate a constraint violation the client can trigger.
///
/// Returns `None` for codes or constraints that indicate a server bug.
fn constraint_reply(sqlstate: &str, constraint: Option<&str>) -> Option<Reply> {
    let constraint = constraint?;
    match (sqlstate, constraint) {
        (UNIQUE_VIOLATION, "uq_production_feedback_production_id") => Some(Reply::conflict(
            "Feedback already exists for this production_id",
        )),
        (UNIQUE_VIOLATION, "uq_feedback_steps_feedback_index") => Some(Reply::validation(
            "Step index is already used by another step of this feedback",
        )),
        (UNIQUE_VIOLATION, "uq_production_feedback_uid" | "uq_notifications_uid") => Some(
            Reply::conflict("Generated identifier collided with an existing record; retry"),
        ),
        (UNIQUE_VIOLATION, other) if other.starts_with("uq_") => {
            Some(Reply::conflict(format!("Duplicate value violates {other}")))
        }
        (FOREIGN_KEY_VIOLATION, _) => Some(Reply::validation(
            "Referenced record does not exist or was removed",
        )),
        (CHECK_VIOLATION, other) if other.starts_with("ck_") => {
            Some(Reply::validation(format!("Value rejected by {other}")))
        }
        _ => None,
    }
}

fn sqlx_reply(err: &sqlx::Error) -> Reply {
    match err {
        sqlx::Error::RowNotFound => {
            Reply::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
        }
        sqlx::Error::Database(db_err) => {
            let translated = db_err
                .code()
                .and_then(|code| constraint_reply(&code, db_err.constraint()));
            translated.unwrap_or_else(|| {
                tracing::error!(error = %db_err, "Database error");
                Reply::internal()
            })
        }
        other => {
            tracing::error!(error = %other, "Database error");
            Reply::internal()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let reply = match &self {
            AppError::Core(core) => core_reply(core),
            AppError::Database(err) => sqlx_reply(err),
            AppError::BadRequest(msg) => {
                Reply::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
        };

        let body = json!({ "error": reply.message, "code": reply.code });
        (reply.status, axum::Json(body)).into_response()
    }
}
