//! Active-recoveries and error-summary introspection (SPEC_FULL.md §C.5).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use yta_models::ErrorSummary;
use yta_recovery::ErrorReporter;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ErrorSummaryQuery {
    #[serde(default = "default_hours")]
    pub hours: u32,
}

fn default_hours() -> u32 {
    24
}

pub async fn error_summary(
    State(state): State<AppState>,
    Query(query): Query<ErrorSummaryQuery>,
) -> ApiResult<Json<ErrorSummary>> {
    Ok(Json(state.reporter.error_summary(query.hours)))
}

/// SPEC_FULL.md §C.5: snapshot of download retries currently in flight.
pub async fn active_recoveries(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let active = state.download_recovery.active_recoveries();
    Ok(Json(serde_json::json!({
        "count": active.len(),
        "operations": active,
    })))
}
