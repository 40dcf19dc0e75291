//! Router configuration.

use crate::handlers::{checkout, events, health};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use boxoffice_core::{GatewayFactory, SpotStore};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
pub fn build_router<S, F>(state: AppState<S, F>) -> Router
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/events",
            get(events::list_events::<S, F>).post(events::create_event::<S, F>),
        )
        .route("/events/:event_id", get(events::get_event::<S, F>))
        .route("/checkout", post(checkout::checkout::<S, F>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
