//! # Box Office Runtime
//!
//! Services that drive the purchase path on top of the capabilities defined
//! in `boxoffice-core`.
//!
//! ## Core Components
//!
//! - **Purchase Orchestrator**: validate, reserve, checkout, confirm or release
//! - **Reservation Sweeper**: releases holds orphaned by crashes
//! - **Event Service**: list, get and create events
//! - **Retry**: bounded exponential backoff used at the checkout call site
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_runtime::{OrchestratorConfig, PurchaseOrchestrator};
//!
//! let orchestrator = PurchaseOrchestrator::new(store, factory, OrchestratorConfig::default());
//! let receipt = orchestrator.purchase(request).await?;
//! println!("issued {} tickets", receipt.ticket_ids.len());
//! ```

/// Caller-side cancellation
pub mod cancel;

/// Event queries and setup
pub mod events;

/// Prometheus metric names and recorders
pub mod metrics;

/// Purchase state machine driver
pub mod orchestrator;

/// Retry logic with exponential backoff
pub mod retry;

/// Stale reservation release
pub mod sweeper;

pub use cancel::{CancelHandle, CancelSignal};
pub use events::{EventService, NewEvent, NewSection};
pub use orchestrator::{OrchestratorConfig, PurchaseOrchestrator, PurchaseOutcome};
pub use retry::{RetryError, RetryPolicy};
pub use sweeper::{ReservationSweeper, SweeperConfig};
