//! The closed error taxonomy (`AuditError`) and its mapping to HTTP status + wire body.
//!
//! Every other component returns `Result<_, AuditError>`; the HTTP edge never inspects
//! anything but the variant. Internal messages are logged but never placed verbatim
//! into the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("missing or malformed authorization")]
    Unauthorized,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("access denied")]
    Forbidden,

    #[error("session not found")]
    SessionNotFound,

    #[error("resource not found")]
    NotFound,

    #[error("invalid session id")]
    InvalidSessionId,

    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("upstream call timed out")]
    Timeout,

    #[error("backend unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AuditError::Unauthorized | AuditError::InvalidToken(_) | AuditError::TokenExpired => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AuditError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AuditError::SessionNotFound | AuditError::NotFound => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            AuditError::InvalidSessionId | AuditError::InvalidPagination(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            AuditError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AuditError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            AuditError::Backend { .. } | AuditError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error")
            }
        }
    }

    /// Translates a [`SessionNotFound`](AuditError::SessionNotFound) surfaced by the
    /// repository into the public `NotFound`, per the Audit Service's step 4.
    pub fn into_not_found_if_session_missing(self) -> AuditError {
        match self {
            AuditError::SessionNotFound => AuditError::NotFound,
            other => other,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        tracing::debug!(error = %self, %status, code, "request failed");

        let message = match &self {
            AuditError::Unauthorized => "authentication is required".to_string(),
            AuditError::InvalidToken(_) | AuditError::TokenExpired => {
                "the access token is invalid or expired".to_string()
            }
            AuditError::Forbidden => "you do not have access to this session".to_string(),
            AuditError::SessionNotFound | AuditError::NotFound => {
                "the requested resource was not found".to_string()
            }
            AuditError::InvalidSessionId => "sessionId must be a canonical UUID".to_string(),
            AuditError::InvalidPagination(reason) => reason.clone(),
            AuditError::Timeout => "the upstream request timed out".to_string(),
            AuditError::ServiceUnavailable(_) => {
                "the service is temporarily unavailable".to_string()
            }
            AuditError::Backend { .. } | AuditError::Internal(_) => {
                "an internal error occurred".to_string()
            }
        };

        (
            status,
            Json(ErrorBody {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_translates_to_not_found() {
        let translated = AuditError::SessionNotFound.into_not_found_if_session_missing();
        assert!(matches!(translated, AuditError::NotFound));
    }

    #[test]
    fn other_errors_pass_through_translation_unchanged() {
        let translated = AuditError::Forbidden.into_not_found_if_session_missing();
        assert!(matches!(translated, AuditError::Forbidden));
    }

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(AuditError::Unauthorized.parts().0, StatusCode::UNAUTHORIZED);
        assert_eq!(AuditError::Forbidden.parts().0, StatusCode::FORBIDDEN);
        assert_eq!(AuditError::NotFound.parts().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AuditError::InvalidSessionId.parts().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuditError::Timeout.parts().0, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AuditError::ServiceUnavailable(String::new()).parts().0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AuditError::Internal(String::new()).parts().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
