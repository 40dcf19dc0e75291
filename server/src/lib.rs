//! # Box Office Server
//!
//! Axum HTTP surface over the purchase orchestrator and the event service.
//!
//! | Route                   | Handler                              |
//! |-------------------------|--------------------------------------|
//! | `GET /health`           | [`handlers::health::health_check`]   |
//! | `GET /events`           | [`handlers::events::list_events`]    |
//! | `GET /events/:event_id` | [`handlers::events::get_event`]      |
//! | `POST /events`          | [`handlers::events::create_event`]   |
//! | `POST /checkout`        | [`handlers::checkout::checkout`]     |
//!
//! Failures are rendered by [`AppError`] as `{"code", "message"}` JSON.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
