//! # Box Office Testing
//!
//! Test doubles for the capabilities defined in `boxoffice-core`.
//!
//! This crate provides:
//! - [`InMemorySpotStore`]: a complete, mutex-guarded `SpotStore`
//! - [`MockPartnerGateway`] / [`MockGatewayFactory`]: scripted partners
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`fixtures`]: the events and requests the test suites share
//!
//! ## Example
//!
//! ```ignore
//! use boxoffice_testing::{fixtures, InMemorySpotStore, MockGatewayFactory};
//!
//! let store = Arc::new(InMemorySpotStore::new());
//! let event = fixtures::event_e1();
//! store.create_event(&event).await?;
//!
//! let factory = Arc::new(MockGatewayFactory::new().with_partner(PartnerId::new(1)));
//! let orchestrator = PurchaseOrchestrator::new(store, factory, OrchestratorConfig::default());
//! ```

pub mod fixtures;
pub mod gateway;
pub mod store;

use boxoffice_core::environment::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};

pub use gateway::{MockGatewayFactory, MockPartnerGateway, MockResponse};
pub use store::InMemorySpotStore;

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can hold one clone and advance the
/// time seen by the store or sweeper holding another.
///
/// # Example
///
/// ```
/// use boxoffice_testing::test_clock;
/// use boxoffice_core::environment::Clock;
/// use chrono::Duration;
///
/// let clock = test_clock();
/// let before = clock.now();
/// assert_eq!(clock.now(), before);
///
/// clock.advance(Duration::minutes(10));
/// assert_eq!(clock.now() - before, Duration::minutes(10));
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    /// Create a clock stopped at `time`
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Jump to `time`
    pub fn set(&self, time: DateTime<Utc>) {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A clock stopped at 2025-01-01 00:00:00 UTC
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let shared = clock.clone();
        let start = clock.now();

        shared.advance(Duration::seconds(30));

        assert_eq!(clock.now() - start, Duration::seconds(30));
        assert_eq!(start.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
