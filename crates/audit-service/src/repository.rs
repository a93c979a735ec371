//! Typed queries over the Backend Gateway: the only component that knows the
//! PostgREST filter/order/limit/offset query surface.

use serde::Deserialize;

use crate::errors::AuditError;
use crate::gateway::BackendGateway;
use crate::models::{AuditEntry, Session};

#[derive(Deserialize)]
struct ShareGrantRow {
    #[allow(dead_code)]
    token: String,
    #[allow(dead_code)]
    session_id: String,
    #[allow(dead_code)]
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Clone)]
pub struct AuditRepository {
    gateway: BackendGateway,
}

impl AuditRepository {
    pub fn new(gateway: BackendGateway) -> Self {
        Self { gateway }
    }

    /// Lists audit entries for a session, newest first, with the backend-reported total.
    pub async fn find_by_session_id(
        &self,
        session_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AuditEntry>, i64), AuditError> {
        let query = vec![
            ("session_id", format!("eq.{session_id}")),
            ("order", "timestamp.desc".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("select", "*".to_string()),
        ];
        self.gateway.get::<Vec<AuditEntry>>("/audit_logs", &query).await
    }

    /// Fetches the minimal session projection used for ownership authorization.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, AuditError> {
        let query = vec![
            ("id", format!("eq.{session_id}")),
            ("select", "id,user_id".to_string()),
            ("limit", "1".to_string()),
        ];
        let (rows, _) = self.gateway.get::<Vec<Session>>("/sessions", &query).await?;
        rows.into_iter().next().ok_or(AuditError::SessionNotFound)
    }

    /// Checks whether `token` authorizes access to `session_id`. Any matching row is
    /// treated as a valid grant regardless of `expires_at` -- see the open question in
    /// the design notes about whether server-side expiration should be enforced.
    pub async fn validate_share_token(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<bool, AuditError> {
        let query = vec![
            ("token", format!("eq.{token}")),
            ("session_id", format!("eq.{session_id}")),
            ("select", "token,session_id,expires_at".to_string()),
            ("limit", "1".to_string()),
        ];
        let (rows, _) = self
            .gateway
            .get::<Vec<ShareGrantRow>>("/session_shares", &query)
            .await?;
        Ok(!rows.is_empty())
    }
}
