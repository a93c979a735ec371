pub mod history;

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

/// Liveness/readiness probe target. Always 200 once the process is serving traffic.
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}
