//! Event/Spot store capability.

use crate::error::StoreError;
use crate::types::{
    Event, EventId, PurchaserInfo, ReleaseOutcome, Reservation, ReservationToken, SpotId,
    TicketId, TicketKind,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Durable storage of events, spots, reservations and tickets.
///
/// All spot state changes go through this trait. Implementations must make
/// each operation atomic: the orchestrator never reads a spot and then writes
/// it back.
///
/// # Concurrency
///
/// For a given spot, concurrent [`reserve_spots`](Self::reserve_spots) calls
/// must be serialized by the storage layer so that exactly one observes it
/// `Available`. Everybody else fails immediately with
/// [`StoreError::SpotsUnavailable`].
pub trait SpotStore: Send + Sync {
    /// Persist a new event with all its spots `Available`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicateEvent`] if the id is taken
    /// - [`StoreError::InvalidEvent`] if the layout is inconsistent
    /// - [`StoreError::Database`] on backend failure
    fn create_event(&self, event: &Event) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// List all events with a snapshot of spot status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on backend failure.
    fn list_events(&self) -> impl Future<Output = Result<Vec<Event>, StoreError>> + Send;

    /// Load one event including sections and spot status snapshot.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EventNotFound`] if the event does not exist
    /// - [`StoreError::Database`] on backend failure
    fn get_event(
        &self,
        event_id: EventId,
    ) -> impl Future<Output = Result<Event, StoreError>> + Send;

    /// Atomically move every named spot from `Available` to `Reserved`.
    ///
    /// All-or-nothing: if any spot is missing or not available, nothing
    /// changes.
    ///
    /// # Errors
    ///
    /// - [`StoreError::SpotsUnavailable`] naming the offending spots
    /// - [`StoreError::Database`] on backend failure
    fn reserve_spots(
        &self,
        event_id: EventId,
        spot_ids: &[SpotId],
    ) -> impl Future<Output = Result<Reservation, StoreError>> + Send;

    /// Move the reservation's spots to `Sold` and issue one ticket per spot.
    ///
    /// Idempotent: confirming an already-confirmed token returns the tickets
    /// issued the first time.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ReservationNotFound`] for an unknown token
    /// - [`StoreError::ReservationReleased`] if the hold was released
    /// - [`StoreError::Database`] on backend failure
    fn confirm_reservation(
        &self,
        token: ReservationToken,
        purchaser: &PurchaserInfo,
        kind: TicketKind,
    ) -> impl Future<Output = Result<Vec<TicketId>, StoreError>> + Send;

    /// Return the reservation's spots to `Available`.
    ///
    /// Safe to call repeatedly and on confirmed tokens; those cases are
    /// reported through [`ReleaseOutcome`] without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on backend failure.
    fn release_reservation(
        &self,
        token: ReservationToken,
    ) -> impl Future<Output = Result<ReleaseOutcome, StoreError>> + Send;

    /// Release every pending reservation taken before `cutoff`.
    ///
    /// Recovery path for holds orphaned by a crash between reserve and
    /// confirm/release.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on backend failure.
    fn release_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ReservationToken>, StoreError>> + Send;
}
