use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use motora_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// GET /health - liveness plus a database pool probe
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let db_check = match state.db.get() {
        Ok(_) => HealthCheck {
            name: "database".to_string(),
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => HealthCheck {
            name: "database".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    };

    let response = HealthResponse::healthy("motora-api", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![db_check]);

    Json(response)
}
