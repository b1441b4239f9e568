//! Service registry CRUD handlers (spec.md §4.3.5).

use axum::extract::{Path, State};
use axum::Json;
use yta_models::{RegisteredService, ServiceRegistration};

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn register_service(
    State(state): State<AppState>,
    Json(registration): Json<ServiceRegistration>,
) -> ApiResult<Json<RegisteredService>> {
    Ok(Json(state.registry.register(registration).await?))
}

pub async fn list_services(State(state): State<AppState>) -> ApiResult<Json<Vec<RegisteredService>>> {
    Ok(Json(state.registry.list().await?))
}

pub async fn unregister_service(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.registry.unregister(&service_name).await?;
    Ok(Json(serde_json::json!({ "unregistered": service_name })))
}

/// Probe a service's health endpoint and persist the result. No automatic
/// eviction happens anywhere in this crate; see SPEC_FULL.md's concurrency
/// decisions.
pub async fn health_check_service(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult<Json<RegisteredService>> {
    Ok(Json(state.registry.refresh_health(&service_name).await?))
}
