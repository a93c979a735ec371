//! HTTP client for the remote PostgREST-style backend.
//!
//! Typed `get`/`post` with URL assembly, header injection, `Content-Range` total-count
//! extraction, and status-to-error mapping. One client is built at startup and shared
//! across every in-flight request; the pool is bounded by `max_idle_conns` /
//! `max_conns_per_host` and connections past `idle_conn_timeout` are closed.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AuditError;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub service_key: String,
    pub http_timeout: Duration,
    pub max_idle_conns: usize,
    pub max_conns_per_host: usize,
    pub idle_conn_timeout: Duration,
}

/// Backend error body shape, per the PostgREST-style convention.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    details: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    hint: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    code: Option<Value>,
}

/// Typed HTTP client over the backend's `/rest/v1` surface.
#[derive(Clone)]
pub struct BackendGateway {
    client: Client,
    base_url: String,
    service_key: String,
}

impl BackendGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, AuditError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(config.max_conns_per_host)
            .pool_idle_timeout(config.idle_conn_timeout)
            .build()
            .map_err(|e| AuditError::Internal(format!("failed to build HTTP client: {e}")))?;
        let _ = config.max_idle_conns; // reqwest pools per-host; total is informational here

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/rest/v1{}", self.base_url, path)
    }

    fn apply_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "count=exact")
    }

    /// Issues a GET request and returns the decoded body alongside the backend-reported
    /// total count (from `Content-Range`, or 0 if absent/unparsable).
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, i64), AuditError> {
        let request = self.apply_headers(self.client.get(self.url(path))).query(query);

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status.as_u16() >= 400 {
            return Err(map_error_response(status, response).await);
        }

        let total = extract_total_count(response.headers());
        let body = response
            .json::<T>()
            .await
            .map_err(|e| AuditError::Internal(format!("failed to decode backend response: {e}")))?;

        Ok((body, total))
    }

    /// Issues a POST request with a JSON payload and returns the decoded body.
    #[allow(dead_code)]
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        payload: &B,
    ) -> Result<T, AuditError> {
        let request = self.apply_headers(self.client.post(self.url(path))).json(payload);

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status.as_u16() >= 400 {
            return Err(map_error_response(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuditError::Internal(format!("failed to decode backend response: {e}")))
    }
}

fn map_transport_error(e: reqwest::Error) -> AuditError {
    if e.is_timeout() {
        AuditError::Timeout
    } else {
        AuditError::ServiceUnavailable(format!("transport error: {e}"))
    }
}

async fn map_error_response(status: StatusCode, response: reqwest::Response) -> AuditError {
    let body_text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<BackendErrorBody>(&body_text) {
        Ok(body) if !body.message.is_empty() => AuditError::Backend {
            status: status.as_u16(),
            message: body.message,
        },
        _ => AuditError::Backend {
            status: status.as_u16(),
            message: format!("status {}: {}", status.as_u16(), body_text),
        },
    }
}

/// Parses a `Content-Range: <start>-<end>/<total>` header. Returns 0 if the header is
/// absent or its value does not parse -- this never fails the call.
fn extract_total_count(headers: &reqwest::header::HeaderMap) -> i64 {
    headers
        .get("content-range")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit('/').next())
        .and_then(|total| total.parse::<i64>().ok())
        .unwrap_or(0)
}
