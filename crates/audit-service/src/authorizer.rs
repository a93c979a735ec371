//! Per-request credential verification and session-scoped authorization ordering.
//!
//! This is deliberately framework-agnostic: it takes the raw header/query values the
//! HTTP edge extracted and returns a [`Credential`] or an [`AuditError`]. The ownership
//! check itself lives in the Audit Service (§4.6), not here -- the share-path
//! short-circuit is expressed declaratively ("share -> skip ownership") by simply never
//! running that check on this path, rather than procedurally threading a flag through it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use crate::cache::CredentialCache;
use crate::errors::AuditError;
use crate::models::Credential;
use crate::repository::AuditRepository;
use crate::verifier::{expires_at_from_claims, TokenVerifier};

/// Upper bound for a single credential-verification backend round-trip, per §5.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Synthetic TTL used for the cached `expires_at` of a freshly validated share grant.
/// Not derived from the grant's own `expires_at` -- see the open question in the design
/// notes about whether that is intentional.
const SHARE_GRANT_SYNTHETIC_TTL: ChronoDuration = ChronoDuration::hours(24);

pub struct Authorizer {
    cache: Arc<CredentialCache>,
    verifier: Arc<TokenVerifier>,
    repository: AuditRepository,
}

impl Authorizer {
    pub fn new(cache: Arc<CredentialCache>, verifier: Arc<TokenVerifier>, repository: AuditRepository) -> Self {
        Self {
            cache,
            verifier,
            repository,
        }
    }

    /// Runs the full ordering: share-token short-circuit, else bearer verification.
    /// `session_id` must already be known to be present; format validation (canonical
    /// UUID) is the HTTP edge's job and happens before this is ever called.
    pub async fn authorize(
        &self,
        session_id: &str,
        share_token: Option<&str>,
        authorization_header: Option<&str>,
    ) -> Result<Credential, AuditError> {
        if let Some(token) = share_token.filter(|t| !t.is_empty()) {
            return self.authorize_share(token, session_id).await;
        }
        self.authorize_bearer(authorization_header).await
    }

    async fn authorize_share(&self, token: &str, session_id: &str) -> Result<Credential, AuditError> {
        if let Some(cached) = self.cache.get_share(token, session_id) {
            return Ok(cached.credential);
        }

        let valid = tokio::time::timeout(
            VERIFY_TIMEOUT,
            self.repository.validate_share_token(token, session_id),
        )
        .await
        .map_err(|_| AuditError::Forbidden)? // timeout -> ambiguity collapses to 403
        .map_err(|_| AuditError::Forbidden)?; // transport/decode error -> also 403

        if !valid {
            return Err(AuditError::Forbidden);
        }

        let credential = Credential::Share {
            session_id: session_id.to_string(),
        };
        self.cache.set_share(
            token,
            session_id,
            credential.clone(),
            Utc::now() + SHARE_GRANT_SYNTHETIC_TTL,
        );
        Ok(credential)
    }

    async fn authorize_bearer(&self, authorization_header: Option<&str>) -> Result<Credential, AuditError> {
        let token = extract_bearer_token(authorization_header).ok_or(AuditError::Unauthorized)?;

        if let Some(cached) = self.cache.get_bearer(token) {
            return Ok(cached.credential);
        }

        let claims = tokio::time::timeout(VERIFY_TIMEOUT, async { self.verifier.validate(token) })
            .await
            .map_err(|_| AuditError::Unauthorized)?
            .map_err(|_| AuditError::Unauthorized)?;

        let credential = Credential::Bearer {
            user_id: claims.sub.clone(),
        };
        self.cache
            .set_bearer(token, credential.clone(), expires_at_from_claims(&claims));
        Ok(credential)
    }
}

/// Parses `Authorization: bearer  <token>`: case-insensitive scheme, any amount of
/// whitespace between scheme and token, surrounding whitespace tolerated.
fn extract_bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let mut parts = header.splitn(2, char::is_whitespace);
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let rest = parts.next()?.trim_start();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
