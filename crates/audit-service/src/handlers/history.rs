//! `GET /api/v1/sessions/{sessionId}/history` — the service's single public endpoint.
//!
//! Session id format and the credential have already been validated and resolved by
//! the time this runs (see `middleware::auth`); this handler only has to parse
//! pagination and hand off to the [`AuditService`](crate::service::AuditService).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use crate::errors::AuditError;
use crate::middleware::auth::AuthorizedSession;
use crate::models::{Credential, Pagination};
use crate::AppState;

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthorizedSession>,
    Extension(credential): Extension<Credential>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AuditError> {
    let limit = parse_non_negative_param(&params, "limit")?;
    let offset = parse_non_negative_param(&params, "offset")?;
    let pagination = Pagination::normalize(
        limit.unwrap_or(0),
        offset.unwrap_or(0),
        state.default_page_size,
        state.max_page_size,
    );

    let response = state
        .service
        .get_audit_logs(&session.session_id, &credential, pagination)
        .await?;

    Ok(Json(response))
}

/// Parses an optional pagination query param as a base-10 integer. Absence is not an
/// error (the caller supplies the default); a present value that doesn't parse as an
/// integer, or parses negative, is rejected outright -- normalization never sees it.
fn parse_non_negative_param(params: &HashMap<String, String>, name: &str) -> Result<Option<i64>, AuditError> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| AuditError::InvalidPagination(format!("{name} must be an integer, got '{raw}'")))?;
            if value < 0 {
                return Err(AuditError::InvalidPagination(format!("{name} must not be negative, got {value}")));
            }
            Ok(Some(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_param_yields_none() {
        let params = HashMap::new();
        assert_eq!(parse_non_negative_param(&params, "limit").unwrap(), None);
    }

    #[test]
    fn valid_integer_param_parses() {
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "25".to_string());
        assert_eq!(parse_non_negative_param(&params, "limit").unwrap(), Some(25));
    }

    #[test]
    fn non_integer_param_is_rejected() {
        let mut params = HashMap::new();
        params.insert("offset".to_string(), "abc".to_string());
        assert!(matches!(
            parse_non_negative_param(&params, "offset"),
            Err(AuditError::InvalidPagination(_))
        ));
    }

    #[test]
    fn negative_integer_param_is_rejected_at_the_edge() {
        let mut params = HashMap::new();
        params.insert("offset".to_string(), "-5".to_string());
        assert!(matches!(
            parse_non_negative_param(&params, "offset"),
            Err(AuditError::InvalidPagination(_))
        ));
    }

    #[test]
    fn oversized_limit_still_parses_and_is_clamped_downstream() {
        let mut params = HashMap::new();
        params.insert("limit".to_string(), "500".to_string());
        assert_eq!(parse_non_negative_param(&params, "limit").unwrap(), Some(500));
    }
}
