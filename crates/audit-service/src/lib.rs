//! Audit History Service
//!
//! A read-only HTTP microservice that fronts a PostgREST-style backend and serves a
//! single paginated, access-controlled view of a session's audit history.
//!
//! # Modules
//!
//! - `config` - environment-sourced configuration
//! - `models` - wire and domain types shared across components
//! - `errors` - the closed error taxonomy and its HTTP mapping
//! - `cache` - two-namespace TTL credential cache
//! - `verifier` - bearer (JWT) token verification
//! - `gateway` - HTTP client for the backend
//! - `repository` - typed PostgREST-style queries
//! - `authorizer` - per-request credential verification ordering
//! - `service` - ownership authorization and response assembly
//! - `middleware` - axum wiring for the authorizer
//! - `handlers` - HTTP request handlers
//! - `routes` - router assembly

pub mod authorizer;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod verifier;

use std::sync::Arc;

use authorizer::Authorizer;
use cache::CredentialCache;
use config::Config;
use gateway::{BackendGateway, GatewayConfig};
use repository::AuditRepository;
use service::AuditService;
use verifier::TokenVerifier;

use common::secret::ExposeSecret;

/// Shared application state, constructed once at startup and handed to every request
/// via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<Authorizer>,
    pub service: AuditService,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl AppState {
    /// Builds application state around an already-constructed cache, so the caller can
    /// keep a handle to it for the background cleanup sweep.
    pub fn build(config: &Config, cache: Arc<CredentialCache>) -> Result<Self, errors::AuditError> {
        let gateway = BackendGateway::new(&GatewayConfig {
            base_url: config.supabase_url.clone(),
            service_key: String::from_utf8_lossy(config.supabase_service_role_key.expose_secret()).into_owned(),
            http_timeout: config.http_timeout,
            max_idle_conns: config.http_max_idle_conns,
            max_conns_per_host: config.http_max_conns_per_host,
            idle_conn_timeout: config.http_idle_conn_timeout,
        })?;
        let repository = AuditRepository::new(gateway);

        let verifier = Arc::new(
            TokenVerifier::new(config.supabase_jwt_secret.expose_secret())
                .map_err(|e| errors::AuditError::Internal(format!("invalid JWT verification material: {e}")))?,
        );

        let authorizer = Arc::new(Authorizer::new(cache, verifier, repository.clone()));
        let service = AuditService::new(repository);

        Ok(Self {
            authorizer,
            service,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        })
    }
}
