//! Axum wiring for the Authorizer: pulls the raw header/query/path values out of the
//! request, validates the session id shape, and stashes the resulting [`Credential`] in
//! request extensions for the handler to read.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::errors::AuditError;
use crate::AppState;

/// Extracted once per request and handed to the handler via `req.extensions()`.
#[derive(Debug, Clone)]
pub struct AuthorizedSession {
    pub session_id: String,
}

pub async fn authorize(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuditError> {
    // Route shape mismatch, or a present-but-empty segment, is treated as an absent
    // sessionId: 401, per the Authorizer's ordering. A non-empty, non-UUID segment is a
    // 400 instead -- it was supplied, just not validly.
    let session_id = session_id_from_path(req.uri().path()).ok_or(AuditError::Unauthorized)?;
    if session_id.is_empty() {
        return Err(AuditError::Unauthorized);
    }
    // `Uuid::parse_str` alone accepts simple (no-hyphen) and braced forms too; the wire
    // contract requires the canonical 36-character hyphenated form specifically.
    if session_id.len() != 36 || Uuid::parse_str(&session_id).is_err() {
        return Err(AuditError::InvalidSessionId);
    }

    let share_token = query_param(req.uri().query(), "share_token");
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let credential = state
        .authorizer
        .authorize(&session_id, share_token.as_deref(), auth_header.as_deref())
        .await?;

    req.extensions_mut().insert(credential);
    req.extensions_mut().insert(AuthorizedSession { session_id });

    Ok(next.run(req).await)
}

/// Pulls the `{sessionId}` segment out of `/api/v1/sessions/<id>/history`, tolerating
/// (but not validating) an empty segment. Returns `None` if the path doesn't have that
/// shape at all.
fn session_id_from_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["api", "v1", "sessions", session_id, "history"] => Some(session_id.to_string()),
        _ => None,
    }
}

/// Finds `name` in a raw (not percent-decoded) query string. Share tokens and session
/// ids are opaque alphanumeric/base64url identifiers that never need decoding in
/// practice; a byte-for-byte match keeps this free of an extra dependency.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        let key = parts.next()?;
        if key == name {
            Some(parts.next().unwrap_or("").to_string())
        } else {
            None
        }
    })
}
