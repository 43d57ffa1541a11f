use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Liveness report. The process answers 200 even when Postgres is down so
/// orchestrators can tell a dead process from a degraded one.
#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let database = match state.db().ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = %err, "database ping failed");
            "unreachable"
        }
    };

    Json(ApiResponse::success(
        "Health check",
        HealthData {
            status: "ok".to_string(),
            database: database.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Some(Meta::empty()),
    ))
}
