//! Event endpoints.
//!
//! - `GET /events` lists events with a snapshot of spot status
//! - `GET /events/:event_id` returns one event
//! - `POST /events` creates an event and its spots

use crate::WebResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use boxoffice_core::{Event, EventId, GatewayFactory, SpotStore};
use boxoffice_runtime::NewEvent;
use uuid::Uuid;

/// List all events.
///
/// # Errors
///
/// Returns a 500 [`AppError`](crate::AppError) if the store cannot be read.
pub async fn list_events<S, F>(
    State(state): State<AppState<S, F>>,
) -> WebResult<Json<Vec<Event>>>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    Ok(Json(state.events.list_events().await?))
}

/// Get one event with its sections and spots.
///
/// # Errors
///
/// Returns a 404 [`AppError`](crate::AppError) for an unknown id.
pub async fn get_event<S, F>(
    State(state): State<AppState<S, F>>,
    Path(event_id): Path<Uuid>,
) -> WebResult<Json<Event>>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    let event = state.events.get_event(EventId::from_uuid(event_id)).await?;
    Ok(Json(event))
}

/// Create an event. Spot names are generated when a section omits them.
///
/// ```bash
/// curl -X POST http://localhost:8080/events \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Rust Conf", "date": "2026-03-01T20:00:00Z", "partner_id": 1,
///        "sections": [{"id": "Main", "capacity": 20, "price": 5000}]}'
/// ```
///
/// # Errors
///
/// Returns a 422 [`AppError`](crate::AppError) for an inconsistent layout.
pub async fn create_event<S, F>(
    State(state): State<AppState<S, F>>,
    Json(new_event): Json<NewEvent>,
) -> WebResult<(StatusCode, Json<Event>)>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    let event = state.events.create_event(new_event).await?;
    tracing::info!(event_id = %event.id, partner = %event.partner_id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}
