//! Request-scoped data types shared by the authorizer, audit service, and HTTP edge.
//!
//! These mirror the backend's `audit_logs` / `sessions` / `session_shares` rows closely
//! enough to decode a PostgREST response, but are intentionally thin: the service reads
//! and re-serializes, it never interprets `details`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable record of a past action against a session, as stored by the backend.
/// Deserialized from the backend's snake_case rows; re-serialized to clients camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct AuditEntry {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    /// Opaque payload preserved byte-for-byte; never parsed by this service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Minimal session projection sufficient for ownership authorization.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
}

/// A validated identity assertion, produced per-request by the Authorizer and cached
/// positively by the Credential Cache. `Bearer::user_id` is set only inside the token
/// verifier's successful-return path -- there is no constructor that lets a caller
/// fabricate one with an arbitrary subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer {
        user_id: String,
    },
    Share {
        session_id: String,
    },
}

/// An entry in the credential cache. Only the minimal identity projection is stored;
/// the raw token that produced it never is.
#[derive(Debug, Clone)]
pub struct CachedCredential {
    pub credential: Credential,
    pub expires_at: DateTime<Utc>,
}

/// Normalized pagination parameters. Construct via [`Pagination::normalize`]; the
/// fields are only ever seen in their normalized form downstream of that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Normalizes raw, already-parsed limit/offset values per the service's pagination
    /// policy: non-positive `limit` becomes `default_limit`, `limit` above `max_limit`
    /// is clamped to it, and a negative `offset` becomes zero.
    ///
    /// This never rejects input -- rejection of malformed (non-integer, negative) input
    /// happens earlier, at the HTTP edge, before normalization ever sees it.
    pub fn normalize(limit: i64, offset: i64, default_limit: i64, max_limit: i64) -> Self {
        let limit = if limit <= 0 {
            default_limit
        } else if limit > max_limit {
            max_limit
        } else {
            limit
        };
        let offset = offset.max(0);
        Pagination { limit, offset }
    }
}

/// The wire response body for a successful history fetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub total_count: i64,
    pub items: Vec<AuditEntry>,
}
