use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::response::ApiResponse;

/// Domain error codes rendered in the response envelope.
///
/// Ranges: 1xxxx request shape, 2xxxx auth, 3xxxx missing resources,
/// 4xxxx business rules, 5xxxx system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success,
    ParamError,
    ParamMissing,
    ParamFormatError,
    Unauthorized,
    TokenExpired,
    TokenInvalid,
    PermissionDenied,
    ResourceNotFound,
    AgentNotFound,
    UserNotFound,
    OperationFailed,
    DuplicateUsername,
    DuplicateEmail,
    InternalError,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Success => "0",
            ErrorCode::ParamError => "10001",
            ErrorCode::ParamMissing => "10002",
            ErrorCode::ParamFormatError => "10003",
            ErrorCode::Unauthorized => "20001",
            ErrorCode::TokenExpired => "20002",
            ErrorCode::TokenInvalid => "20003",
            ErrorCode::PermissionDenied => "20004",
            ErrorCode::ResourceNotFound => "30001",
            ErrorCode::AgentNotFound => "30002",
            ErrorCode::UserNotFound => "30003",
            ErrorCode::OperationFailed => "40004",
            ErrorCode::DuplicateUsername => "40005",
            ErrorCode::DuplicateEmail => "40006",
            ErrorCode::InternalError => "50001",
            ErrorCode::DatabaseError => "50002",
        }
    }
}

/// Application-level error for HTTP handlers and services.
///
/// Services produce the domain variants; the single translation into a
/// transport status plus envelope happens in [`IntoResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Param(String),

    #[error("{0}")]
    ParamFormat(String),

    #[error("{0}")]
    ParamMissing(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    TokenInvalid,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Agent not found")]
    AgentNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),

    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("{0}")]
    OperationFailed(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for service and handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<sqlx::Error> for ApiError {
    /// The storage unique constraints are the authoritative guard against
    /// the check-then-insert race, so unique violations come back as
    /// recoverable duplicate errors rather than a 500.
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => return ApiError::ResourceNotFound,
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique constraint violation
                if db_err.code().as_deref() == Some("23505") {
                    let constraint = db_err.constraint().unwrap_or_default();
                    if constraint.contains("username") {
                        return ApiError::DuplicateUsername("value".into());
                    }
                    if constraint.contains("email") {
                        return ApiError::DuplicateEmail("value".into());
                    }
                }
            }
            _ => {}
        }
        ApiError::Database(err)
    }
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Param(_) => ErrorCode::ParamError,
            ApiError::ParamFormat(_) => ErrorCode::ParamFormatError,
            ApiError::ParamMissing(_) => ErrorCode::ParamMissing,
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::TokenExpired => ErrorCode::TokenExpired,
            ApiError::TokenInvalid => ErrorCode::TokenInvalid,
            ApiError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            ApiError::ResourceNotFound => ErrorCode::ResourceNotFound,
            ApiError::AgentNotFound => ErrorCode::AgentNotFound,
            ApiError::UserNotFound => ErrorCode::UserNotFound,
            ApiError::DuplicateUsername(_) => ErrorCode::DuplicateUsername,
            ApiError::DuplicateEmail(_) => ErrorCode::DuplicateEmail,
            ApiError::OperationFailed(_) => ErrorCode::OperationFailed,
            ApiError::Database(_) => ErrorCode::DatabaseError,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Param(_)
            | ApiError::ParamFormat(_)
            | ApiError::ParamMissing(_)
            | ApiError::DuplicateUsername(_)
            | ApiError::DuplicateEmail(_)
            | ApiError::OperationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::TokenExpired | ApiError::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::ResourceNotFound | ApiError::AgentNotFound | ApiError::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // Raw storage/internal errors never reach the client.
        let message = match &self {
            ApiError::Database(err) => {
                tracing::error!(error = %err, "database error");
                "Database error".to_string()
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ApiResponse::<()>::error(code, message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(
            ApiError::Param("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::PermissionDenied("no".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::AgentNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::DuplicateUsername("john".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_follow_taxonomy() {
        assert_eq!(ApiError::AgentNotFound.code().as_str(), "30002");
        assert_eq!(ApiError::UserNotFound.code().as_str(), "30003");
        assert_eq!(
            ApiError::DuplicateUsername("john".into()).code().as_str(),
            "40005"
        );
        assert_eq!(
            ApiError::DuplicateEmail("a@b.c".into()).code().as_str(),
            "40006"
        );
        assert_eq!(
            ApiError::PermissionDenied("no".into()).code().as_str(),
            "20004"
        );
    }

    #[test]
    fn duplicate_messages_are_field_specific() {
        let err = ApiError::DuplicateUsername("john".into());
        assert!(err.to_string().contains("john"));
        let err = ApiError::DuplicateEmail("john@x.com".into());
        assert!(err.to_string().contains("john@x.com"));
    }

    #[test]
    fn row_not_found_maps_to_resource_not_found() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::ResourceNotFound));
        assert_eq!(err.code().as_str(), "30001");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pool_timeout_maps_to_database_error() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ApiError::Database(_)));
        assert_eq!(err.code().as_str(), "50002");
    }
}
