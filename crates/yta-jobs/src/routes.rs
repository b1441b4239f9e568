//! HTTP router assembly.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::download::{cancel_download, get_formats, get_progress, start_download};
use crate::handlers::error_recovery::{active_recoveries, error_summary};
use crate::handlers::health::{health, ready};
use crate::handlers::jobs::{create_job, delete_job, execute_job, get_job, get_playlist_results, list_jobs};
use crate::handlers::metadata::{batch_fetch, get_playlist_metadata, get_video_metadata, quota_status};
use crate::handlers::registry::{health_check_service, list_services, register_service, unregister_service};
use crate::handlers::storage::{
    check_exists, generate_recovery_plan, get_stored_metadata, save_metadata, save_video, stats,
};
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
};
use crate::state::AppState;

/// Routes mirror spec.md §6's representative HTTP surface under
/// `/api/v1`, with C3–C6 composed in-process (SPEC_FULL.md §A) rather than
/// proxied to separate services.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id", delete(delete_job))
        .route("/jobs/:job_id/execute", put(execute_job))
        .route("/jobs/:job_id/playlist-results", get(get_playlist_results));

    let registry_routes = Router::new()
        .route("/registry/register", post(register_service))
        .route("/registry/services", get(list_services))
        .route("/registry/services/:service_name", delete(unregister_service))
        .route("/registry/services/:service_name/health", post(health_check_service));

    let download_routes = Router::new()
        .route("/download/video", post(start_download))
        .route("/download/progress/:task_id", get(get_progress))
        .route("/download/cancel/:task_id", post(cancel_download))
        .route("/download/formats/:video_id", get(get_formats));

    let metadata_routes = Router::new()
        .route("/metadata/video/:video_id", get(get_video_metadata))
        .route("/metadata/playlist/:playlist_id", get(get_playlist_metadata))
        .route("/metadata/batch", post(batch_fetch))
        .route("/metadata/quota", get(quota_status));

    let storage_routes = Router::new()
        .route("/storage/save/metadata", post(save_metadata))
        .route("/storage/save/video", post(save_video))
        .route("/storage/exists/:video_id", get(check_exists))
        .route("/storage/metadata/:video_id", get(get_stored_metadata))
        .route("/storage/recovery", post(generate_recovery_plan))
        .route("/storage/stats", get(stats));

    let recovery_routes = Router::new()
        .route("/error-recovery/errors", get(error_summary))
        .route("/error-recovery/active", get(active_recoveries));

    let rate_limiter = crate::middleware::create_rate_limiter(state.config.request_timeout.as_secs().max(1) as u32 * 20);

    let api_routes = Router::new()
        .merge(job_routes)
        .merge(registry_routes)
        .merge(download_routes)
        .merge(metadata_routes)
        .merge(storage_routes)
        .merge(recovery_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .nest("/api/v1", api_routes);

    if let Some(handle) = metrics_handle {
        router = router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
    }

    router
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer())
        .with_state(state)
}
