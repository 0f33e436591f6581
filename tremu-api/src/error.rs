/// Error handling for the API server
///
/// All handlers return `ApiResult<T>`. Every failure is rendered with the
/// same envelope:
///
/// ```json
/// {
///   "message": "Validation failed",
///   "error": "only present for 500s: the underlying error text",
///   "details": [{ "field": "title", "message": "Title is required" }]
/// }
/// ```
///
/// Library errors convert with `?` through the `From` impls below.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tremu_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    models::ReorderError,
    ordering::OrderingError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Postgres SQLSTATE codes the API maps to client errors
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failures (400)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    /// Single-field failure
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,

    /// Underlying error text, for internal errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Field-level validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `"Board not found"` style 404
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", capitalize(what)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::ValidationError(details) => ErrorResponse {
                message: "Validation failed".to_string(),
                error: None,
                details: Some(details),
            },
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ErrorResponse {
                    message: "Internal server error".to_string(),
                    error: Some(msg),
                    details: None,
                }
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => ErrorResponse {
                message: msg,
                error: None,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => match db_err.constraint() {
                        Some("users_email_key") => {
                            ApiError::Conflict("Email already registered".to_string())
                        }
                        Some("board_members_pkey") => {
                            ApiError::Conflict("User is already a member of this board".to_string())
                        }
                        Some(constraint) => {
                            ApiError::Conflict(format!("Constraint violation: {}", constraint))
                        }
                        None => ApiError::Conflict("Duplicate record".to_string()),
                    },
                    Some(FOREIGN_KEY_VIOLATION) => {
                        ApiError::BadRequest("Referenced record does not exist".to_string())
                    }
                    Some(CHECK_VIOLATION) => {
                        ApiError::BadRequest(format!("Invalid value: {}", db_err.message()))
                    }
                    _ => ApiError::InternalError(format!("Database error: {}", db_err)),
                }
            }
            other => ApiError::InternalError(format!("Database error: {}", other)),
        }
    }
}

/// Convert ordering failures to API errors
impl From<ReorderError> for ApiError {
    fn from(err: ReorderError) -> Self {
        match err {
            ReorderError::NotFound(what) => ApiError::not_found(what),
            ReorderError::CrossBoard => {
                ApiError::BadRequest("Target column belongs to a different board".to_string())
            }
            ReorderError::Ordering(e) => e.into(),
            ReorderError::Contended => {
                ApiError::Conflict("Task is being moved concurrently, try again".to_string())
            }
            ReorderError::Database(e) => e.into(),
        }
    }
}

impl From<OrderingError> for ApiError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::OutOfRange { .. } => ApiError::BadRequest(capitalize(&err.to_string())),
            OrderingError::UnknownItem(_) | OrderingError::DuplicateItem(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

/// Convert request authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) => {
                ApiError::Forbidden("You are not a member of this board".to_string())
            }
            AuthzError::OwnerOnly(_) => ApiError::Forbidden(err.to_string()),
            AuthzError::DatabaseError(e) => e.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
///
/// Failing to sign is a server fault; every validation failure is a 401.
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

/// Convert `validator` derive failures to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid {}", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

/// Malformed or mistyped JSON bodies are client errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
