pub mod db;
pub mod engine;
pub mod error;
pub mod games;
pub mod handlers {
    pub mod actions;
    pub mod admin;
}
pub mod health;
pub mod ledger;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use db::Db;
pub use engine::Engine;
pub use error::EngineError;
pub use ledger::Ledger;
pub use models::*;
pub use observability::MetricsCollector;
pub use policy::{Policy, PolicyPatch, PolicyStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub metrics: MetricsCollector,
    /// Shared token for administrative routes; the admin surface is
    /// disabled when unset.
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(engine: Engine, admin_token: Option<String>) -> Self {
        Self {
            engine,
            metrics: MetricsCollector::new(),
            admin_token,
        }
    }
}

/// Build the API router
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // User-facing routes
    let user_routes = Router::new()
        .route("/users/:id/balance", get(handlers::actions::get_balance))
        .route("/users/:id/actions", post(handlers::actions::perform_action))
        .route("/ranking", get(handlers::actions::get_ranking))
        .with_state(state.clone());

    // Admin routes (shared-token gate)
    let admin_routes = Router::new()
        .route("/admin/users/:id/balance", post(handlers::admin::adjust_balance))
        .route(
            "/admin/policy",
            get(handlers::admin::get_policy).patch(handlers::admin::update_policy),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::admin_middleware,
        ))
        .with_state(state.clone());

    // Probes
    let health_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/health", get(health::health_detail))
        .with_state(state);

    Router::new()
        .nest("/v1", user_routes)
        .nest("/v1", admin_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
