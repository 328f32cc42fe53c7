//! Router assembly

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;
use crate::auth::require_auth;
use crate::handlers::{analytics, corn_fields, health, historical, sensors};

/// Full application router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/sensors/historical", get(sensors::get_historical_readings))
        .route("/api/sensors/field/{field_number}", get(sensors::get_field_series))
        .route("/api/sensors/sync", post(sensors::trigger_sync))
        .route("/api/historical/calculate", post(historical::calculate_period))
        .route("/api/analytics/analyze", post(analytics::run_analysis))
        .route(
            "/api/analytics/latest-prescription",
            get(analytics::get_latest_prescription),
        )
        .route(
            "/api/analytics/unnotified-prescriptions",
            get(analytics::get_unnotified_prescriptions),
        )
        .route(
            "/api/analytics/prescriptions/{id}/notified",
            patch(analytics::mark_prescription_notified),
        )
        .route("/api/corn-analysis/all", get(analytics::list_all_analyses))
        .route(
            "/api/corn-analysis/field/{field_id}",
            get(analytics::list_field_analyses),
        )
        .route("/api/corn-analysis/recent", get(analytics::get_recent_analysis))
        .route(
            "/api/corn-fields/register",
            post(corn_fields::register_corn_field),
        )
        .route(
            "/api/corn-fields/user/{user_id}",
            get(corn_fields::list_user_corn_fields),
        )
        .route(
            "/api/corn-fields/{id}",
            get(corn_fields::get_corn_field)
                .put(corn_fields::update_corn_field)
                .delete(corn_fields::delete_corn_field),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/sensors/latest", get(sensors::get_latest_reading))
        .route("/api/sensors/status", get(sensors::get_sync_status))
        .route("/api/historical/{period}", get(historical::get_period_history));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
