pub mod auth;
pub mod error;
mod hos;
mod logs;
pub mod metrics;
pub mod rate_limit;
mod trips;
mod users;
pub mod validation;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Credential routes (public, rate limited)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh_token))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    // Data routes, token-protected when auth.require_auth is set
    let data_routes = Router::new()
        // Users
        .route("/user/:user_id", get(users::get_user))
        // Trips
        .route(
            "/user/:user_id/trips",
            get(trips::list_trips).post(trips::create_trip),
        )
        .route("/trip/:trip_id", get(trips::get_trip))
        // Driver logs
        .route("/trip/:trip_id/logs", post(logs::create_logs))
        .route("/user/:user_id/logs", get(logs::list_user_logs))
        // HOS summaries
        .route("/user/:user_id/hos", get(hos::list_summaries))
        .route("/user/:user_id/hos/update", post(hos::update_summary))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/api", auth_routes.merge(data_routes))
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The router as served: trailing slashes are trimmed before routing, so
/// `/api/trip/1/` and `/api/trip/1` are the same resource.
pub fn app(state: Arc<AppState>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(create_router(state))
}

async fn health_check() -> &'static str {
    "OK"
}
