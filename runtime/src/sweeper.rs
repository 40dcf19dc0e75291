//! Background release of orphaned reservations.
//!
//! A purchase normally confirms or releases its own hold. If the process dies
//! in between, the hold would stay `Pending` forever; the sweeper periodically
//! releases every pending reservation older than the configured TTL.

use crate::metrics::ReservationMetrics;
use boxoffice_core::environment::Clock;
use boxoffice_core::{DateTime, ReservationToken, SpotStore, StoreError, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Sweeper settings.
///
/// `reservation_ttl` must exceed the orchestrator's checkout deadline, or
/// live purchases would lose their hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Age after which a pending reservation is considered orphaned
    pub reservation_ttl: chrono::Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            reservation_ttl: chrono::Duration::minutes(5),
        }
    }
}

/// Periodic stale-reservation release.
pub struct ReservationSweeper<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
    shutdown: watch::Receiver<bool>,
}

impl<S: SpotStore + 'static> ReservationSweeper<S> {
    /// Creates a sweeper and its shutdown sender. Send `true` to stop it.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: SweeperConfig,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = Self {
            store,
            clock,
            config,
            shutdown: shutdown_rx,
        };
        (sweeper, shutdown_tx)
    }

    /// Reservations taken before this instant are stale.
    #[must_use]
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_signed(self.config.reservation_ttl)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Release every stale reservation once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be reached.
    pub async fn sweep_once(&self) -> Result<Vec<ReservationToken>, StoreError> {
        let cutoff = self.cutoff();
        let released = self.store.release_stale_reservations(cutoff).await?;

        for token in &released {
            tracing::warn!(reservation = %token, cutoff = %cutoff, "Released stale reservation");
        }
        if !released.is_empty() {
            ReservationMetrics::record_released("stale", released.len());
        }
        Ok(released)
    }

    /// Sweep on every tick until shutdown.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            ttl_secs = self.config.reservation_ttl.num_seconds(),
            "Reservation sweeper started"
        );

        while !*self.shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.sweep_once().await {
                        tracing::error!(error = %error, "Reservation sweep failed");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                }
            }
        }

        tracing::info!("Reservation sweeper stopped");
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
