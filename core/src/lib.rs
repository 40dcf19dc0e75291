//! # Box Office Core
//!
//! Core types and capability traits for selling event tickets through
//! third-party partner services.
//!
//! This crate holds everything the purchase path needs to agree on, without
//! any I/O of its own:
//!
//! - **Types**: events, sections, spots, tickets, purchase requests ([`types`])
//! - **Errors**: the failure taxonomy every layer classifies into ([`error`])
//! - **Store**: the Event/Spot store capability ([`store::SpotStore`])
//! - **Partners**: the checkout capability and its factory ([`partner`])
//! - **Saga**: the purchase state machine ([`saga::PurchaseSaga`])
//! - **Environment**: injected dependencies such as the clock ([`environment`])
//!
//! ## Purchase Flow
//!
//! ```text
//! Validating ──► Reserved ──► Confirming ──► Sold
//!     │              │             │
//!     ▼              ├──► ReleasedOnFailure ◄┘
//!  Rejected          └──► ReleasedOnTimeout
//! ```
//!
//! Spot state only moves `Available → Reserved → Sold` or
//! `Reserved → Available`. The store enforces that a spot leaves `Available`
//! for at most one reservation at a time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod partner;
pub mod saga;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{
    ConfigError, FailureReason, PartnerError, PartnerErrorKind, PurchaseError, StoreError,
};
pub use partner::{
    CheckoutRequest, GatewayFactory, PartnerConfirmation, PartnerGateway, PartnerTicket,
};
pub use saga::{InvalidTransition, PurchasePhase, PurchaseSaga, PurchaseStep};
pub use store::SpotStore;
pub use types::*;

/// Environment module - Dependency injection traits
///
/// External dependencies that would make behaviour non-deterministic are
/// abstracted behind traits so tests can substitute them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use boxoffice_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
