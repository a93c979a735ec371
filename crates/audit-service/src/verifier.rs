//! Bearer token verification.
//!
//! Verification material is bound once at process init and is immutable thereafter:
//! the mode (RSA vs HMAC) and decoding key are resolved inside [`TokenVerifier::new`]
//! and materialized into the value itself, never left as mutable global state.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Rsa,
    Hmac,
}

/// The verified claims of a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token could not be parsed or its signature did not verify")]
    Parse,
    #[error("token algorithm does not match the configured verification mode")]
    UnexpectedAlgorithm,
    #[error("token has expired")]
    Expired,
    #[error("token was issued in the future")]
    UsedBeforeIssued,
    #[error("token subject is empty")]
    EmptySubject,
}

/// Verifies bearer tokens against a single configured verification material blob.
///
/// If the blob parses as an RSA public key in PEM form, the verifier operates in RSA
/// mode and accepts only RSA-signed tokens for the lifetime of the process. Anything
/// that fails to parse as an RSA PEM key -- including a blob that merely looks like
/// PEM (has a `-----BEGIN` header) but is truncated or otherwise malformed -- falls
/// back to HMAC mode, treating the raw bytes as the shared secret. Mode selection
/// happens exactly once, here, and is never an error: there is no verification
/// material for which `new` returns `Err`.
#[derive(Clone)]
pub struct TokenVerifier {
    mode: Mode,
    decoding_key: DecodingKey,
}

impl TokenVerifier {
    pub fn new(verification_material: &[u8]) -> Result<Self, VerifyError> {
        match DecodingKey::from_rsa_pem(verification_material) {
            Ok(decoding_key) => Ok(Self {
                mode: Mode::Rsa,
                decoding_key,
            }),
            // Anything that doesn't parse as an RSA PEM key -- not just bytes that
            // don't look like PEM at all -- falls back to HMAC, treating the blob
            // itself as the shared secret.
            Err(_) => Ok(Self {
                mode: Mode::Hmac,
                decoding_key: DecodingKey::from_secret(verification_material),
            }),
        }
    }

    fn allowed_algorithms(&self) -> &'static [Algorithm] {
        match self.mode {
            Mode::Rsa => &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
            Mode::Hmac => &[Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
        }
    }

    /// Verifies signature, `exp` (must be strictly future, if present), and `iat` (must
    /// not be future, if present), in that order, and projects the subject claim.
    pub fn validate(&self, token: &str) -> Result<Claims, VerifyError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| VerifyError::Parse)?;
        if !self.allowed_algorithms().contains(&header.alg) {
            return Err(VerifyError::UnexpectedAlgorithm);
        }

        // exp is checked by us below (not by jsonwebtoken) so that an expired-but-
        // otherwise-valid token maps to `Expired` rather than a generic parse failure.
        let mut validation = Validation::new(header.alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| VerifyError::Parse)?;
        let claims = data.claims;

        let now = Utc::now().timestamp();
        if claims.exp <= now {
            return Err(VerifyError::Expired);
        }
        if let Some(iat) = claims.iat {
            if iat > now {
                return Err(VerifyError::UsedBeforeIssued);
            }
        }
        if claims.sub.is_empty() {
            return Err(VerifyError::EmptySubject);
        }

        Ok(claims)
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, VerifyError> {
        let claims = self.validate(token)?;
        if claims.sub.is_empty() {
            return Err(VerifyError::EmptySubject);
        }
        Ok(claims.sub)
    }
}

pub fn expires_at_from_claims(claims: &Claims) -> DateTime<Utc> {
    DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const HMAC_SECRET: &[u8] = b"a-shared-secret-for-tests-only";

    fn sign(claims: &Claims, alg: Algorithm) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(HMAC_SECRET)).unwrap()
    }

    fn claims(sub: &str, exp_delta_secs: i64, iat_delta_secs: Option<i64>) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: sub.to_string(),
            exp: now + exp_delta_secs,
            iat: iat_delta_secs.map(|d| now + d),
            iss: None,
        }
    }

    #[test]
    fn hmac_mode_selected_for_non_pem_material() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        assert_eq!(verifier.mode, Mode::Hmac);
    }

    #[test]
    fn hmac_mode_selected_for_material_that_merely_looks_like_pem() {
        // Has the `-----BEGIN` header a PEM sniff would key off of, but the body is
        // truncated garbage that `DecodingKey::from_rsa_pem` cannot parse. This must
        // still resolve to HMAC mode, not a constructor error.
        let material: &[u8] = b"-----BEGIN PUBLIC KEY-----\nnot-actually-base64-der\n-----END PUBLIC KEY-----\n";
        let verifier = TokenVerifier::new(material).unwrap();
        assert_eq!(verifier.mode, Mode::Hmac);

        // The malformed PEM blob itself is the HMAC secret in the fallback path.
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims("user-1", 300, None),
            &EncodingKey::from_secret(material),
        )
        .unwrap();
        assert_eq!(verifier.validate(&token).unwrap().sub, "user-1");
    }

    #[test]
    fn valid_hmac_token_verifies() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        let token = sign(&claims("user-1", 300, Some(-5)), Algorithm::HS256);
        let result = verifier.validate(&token).unwrap();
        assert_eq!(result.sub, "user-1");
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        let token = sign(&claims("user-1", -10, Some(-100)), Algorithm::HS256);
        assert_eq!(verifier.validate(&token), Err(VerifyError::Expired));
    }

    #[test]
    fn future_iat_is_rejected() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        let token = sign(&claims("user-1", 300, Some(600)), Algorithm::HS256);
        assert_eq!(verifier.validate(&token), Err(VerifyError::UsedBeforeIssued));
    }

    #[test]
    fn extract_subject_returns_sub() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        let token = sign(&claims("user-42", 300, None), Algorithm::HS256);
        assert_eq!(verifier.extract_subject(&token).unwrap(), "user-42");
    }

    #[test]
    fn garbage_token_fails_to_parse() {
        let verifier = TokenVerifier::new(HMAC_SECRET).unwrap();
        assert!(matches!(verifier.validate("not-a-jwt"), Err(VerifyError::Parse)));
    }
}
