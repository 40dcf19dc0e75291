//! In-memory `SpotStore`.
//!
//! One mutex guards all state, so every operation is atomic and concurrent
//! reservations of the same spot are serialized exactly as the contract
//! requires. Failures can be injected to exercise the orchestrator's confirm
//! retry and release paths.

use boxoffice_core::environment::{Clock, SystemClock};
use boxoffice_core::{
    DateTime, Event, EventId, PurchaserInfo, ReleaseOutcome, Reservation, ReservationStatus,
    ReservationToken, Spot, SpotId, SpotStatus, SpotStore, StoreError, Ticket, TicketId,
    TicketKind, Utc,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    reservations: HashMap<ReservationToken, Reservation>,
    issued: HashMap<ReservationToken, Vec<TicketId>>,
    tickets: HashMap<TicketId, Ticket>,
}

impl State {
    fn event_mut(&mut self, event_id: EventId) -> Option<&mut Event> {
        self.events.iter_mut().find(|event| event.id == event_id)
    }

    /// Returns spots to available. Only touches spots still reserved.
    fn release(&mut self, token: ReservationToken) -> ReleaseOutcome {
        let Some(reservation) = self.reservations.get_mut(&token) else {
            return ReleaseOutcome::Unknown;
        };
        match reservation.status {
            ReservationStatus::Released => return ReleaseOutcome::AlreadyReleased,
            ReservationStatus::Confirmed => return ReleaseOutcome::AlreadyConfirmed,
            ReservationStatus::Pending => reservation.status = ReservationStatus::Released,
        }
        let event_id = reservation.event_id;
        let spot_ids = reservation.spot_ids.clone();

        let mut released = 0;
        if let Some(event) = self.event_mut(event_id) {
            for spot_id in &spot_ids {
                match spot_mut(event, spot_id) {
                    Some(spot) if spot.status.can_transition_to(SpotStatus::Available) => {
                        spot.status = SpotStatus::Available;
                        released += 1;
                    }
                    _ => {}
                }
            }
        }
        ReleaseOutcome::Released { spots: released }
    }
}

fn spot_mut<'a>(event: &'a mut Event, spot_id: &SpotId) -> Option<&'a mut Spot> {
    event
        .sections
        .iter_mut()
        .flat_map(|section| section.spots.iter_mut())
        .find(|spot| &spot.id == spot_id)
}

fn injected(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

/// In-memory store for tests and local development.
///
/// Clones share state.
#[derive(Clone)]
pub struct InMemorySpotStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    failing_confirms: Arc<AtomicUsize>,
    failing_releases: Arc<AtomicUsize>,
}

impl Default for InMemorySpotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySpotStore {
    /// Empty store using the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Empty store stamping reservations with `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
            failing_confirms: Arc::new(AtomicUsize::new(0)),
            failing_releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make the next `count` confirm calls fail with a database error
    pub fn fail_next_confirms(&self, count: usize) {
        self.failing_confirms.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` release calls fail with a database error
    pub fn fail_next_releases(&self, count: usize) {
        self.failing_releases.store(count, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("store mutex poisoned".to_string()))
    }

    /// Current status of one spot
    #[must_use]
    pub fn spot_status(&self, event_id: EventId, spot_id: &SpotId) -> Option<SpotStatus> {
        let state = self.lock().ok()?;
        let event = state.events.iter().find(|event| event.id == event_id)?;
        event.find_spot(spot_id).map(|(_, spot)| spot.status)
    }

    /// A reservation by token
    #[must_use]
    pub fn reservation(&self, token: ReservationToken) -> Option<Reservation> {
        self.lock().ok()?.reservations.get(&token).cloned()
    }

    /// Every reservation ever taken
    #[must_use]
    pub fn reservations(&self) -> Vec<Reservation> {
        self.lock()
            .map(|state| state.reservations.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Reservations still holding spots
    #[must_use]
    pub fn pending_reservations(&self) -> usize {
        self.reservations()
            .iter()
            .filter(|reservation| reservation.status == ReservationStatus::Pending)
            .count()
    }

    /// Every ticket issued
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.lock()
            .map(|state| state.tickets.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl SpotStore for InMemorySpotStore {
    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        event.check_layout().map_err(StoreError::InvalidEvent)?;
        let mut state = self.lock()?;
        if state.events.iter().any(|existing| existing.id == event.id) {
            return Err(StoreError::DuplicateEvent(event.id));
        }

        let mut event = event.clone();
        for section in &mut event.sections {
            for spot in &mut section.spots {
                spot.status = SpotStatus::Available;
                spot.ticket_id = None;
            }
        }
        state.events.push(event);
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        Ok(self.lock()?.events.clone())
    }

    async fn get_event(&self, event_id: EventId) -> Result<Event, StoreError> {
        self.lock()?
            .events
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
            .ok_or(StoreError::EventNotFound(event_id))
    }

    async fn reserve_spots(
        &self,
        event_id: EventId,
        spot_ids: &[SpotId],
    ) -> Result<Reservation, StoreError> {
        let now = self.clock.now();
        let mut state = self.lock()?;
        let event = state
            .event_mut(event_id)
            .ok_or(StoreError::EventNotFound(event_id))?;

        let mut seen = HashSet::new();
        let unavailable: Vec<SpotId> = spot_ids
            .iter()
            .filter(|spot_id| {
                !seen.insert(*spot_id)
                    || event
                        .find_spot(spot_id)
                        .is_none_or(|(_, spot)| {
                            !spot.status.can_transition_to(SpotStatus::Reserved)
                        })
            })
            .cloned()
            .collect();
        if !unavailable.is_empty() {
            return Err(StoreError::SpotsUnavailable { spots: unavailable });
        }

        for spot_id in spot_ids {
            if let Some(spot) = spot_mut(event, spot_id) {
                spot.status = SpotStatus::Reserved;
            }
        }

        let reservation = Reservation {
            token: ReservationToken::new(),
            event_id,
            spot_ids: spot_ids.to_vec(),
            status: ReservationStatus::Pending,
            created_at: now,
        };
        state
            .reservations
            .insert(reservation.token, reservation.clone());
        Ok(reservation)
    }

    async fn confirm_reservation(
        &self,
        token: ReservationToken,
        purchaser: &PurchaserInfo,
        kind: TicketKind,
    ) -> Result<Vec<TicketId>, StoreError> {
        if injected(&self.failing_confirms) {
            return Err(StoreError::Database("injected confirm failure".to_string()));
        }
        let now = self.clock.now();
        let mut state = self.lock()?;
        let reservation = state
            .reservations
            .get(&token)
            .cloned()
            .ok_or(StoreError::ReservationNotFound(token))?;

        match reservation.status {
            ReservationStatus::Released => return Err(StoreError::ReservationReleased(token)),
            ReservationStatus::Confirmed => {
                return Ok(state.issued.get(&token).cloned().unwrap_or_default());
            }
            ReservationStatus::Pending => {}
        }

        let event = state
            .event_mut(reservation.event_id)
            .ok_or(StoreError::EventNotFound(reservation.event_id))?;
        let mut tickets = Vec::with_capacity(reservation.spot_ids.len());
        for spot_id in &reservation.spot_ids {
            let (section, spot) = event
                .find_spot(spot_id)
                .ok_or_else(|| StoreError::Database(format!("spot {spot_id} vanished")))?;
            if !spot.status.can_transition_to(SpotStatus::Sold) {
                return Err(StoreError::Database(format!(
                    "spot {spot_id} is {} under a pending reservation",
                    spot.status.as_str()
                )));
            }
            let price = kind.price_for(section.price);
            tickets.push(Ticket {
                id: TicketId::new(),
                event_id: reservation.event_id,
                spot_id: spot_id.clone(),
                reservation: token,
                purchaser_email: purchaser.email.clone(),
                kind,
                price,
                issued_at: now,
            });
        }
        for ticket in &tickets {
            if let Some(spot) = spot_mut(event, &ticket.spot_id) {
                spot.status = SpotStatus::Sold;
                spot.ticket_id = Some(ticket.id);
            }
        }

        let ticket_ids: Vec<TicketId> = tickets.iter().map(|ticket| ticket.id).collect();
        state.tickets.extend(tickets.into_iter().map(|ticket| (ticket.id, ticket)));
        state.issued.insert(token, ticket_ids.clone());
        if let Some(reservation) = state.reservations.get_mut(&token) {
            reservation.status = ReservationStatus::Confirmed;
        }
        Ok(ticket_ids)
    }

    async fn release_reservation(
        &self,
        token: ReservationToken,
    ) -> Result<ReleaseOutcome, StoreError> {
        if injected(&self.failing_releases) {
            return Err(StoreError::Database("injected release failure".to_string()));
        }
        Ok(self.lock()?.release(token))
    }

    async fn release_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ReservationToken>, StoreError> {
        let mut state = self.lock()?;
        let stale: Vec<ReservationToken> = state
            .reservations
            .values()
            .filter(|reservation| {
                reservation.status == ReservationStatus::Pending && reservation.created_at < cutoff
            })
            .map(|reservation| reservation.token)
            .collect();
        for token in &stale {
            state.release(*token);
        }
        Ok(stale)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn create_event_resets_spot_status() {
        let store = InMemorySpotStore::new();
        let mut event = fixtures::event_e1();
        event.sections[0].spots[0].status = SpotStatus::Sold;

        store.create_event(&event).await.unwrap();

        let stored = store.get_event(event.id).await.unwrap();
        assert_eq!(stored.available(), 3);
        assert_eq!(
            store.create_event(&event).await,
            Err(StoreError::DuplicateEvent(event.id))
        );
    }

    #[tokio::test]
    async fn duplicate_spots_in_one_request_are_unavailable() {
        let store = InMemorySpotStore::new();
        let event = fixtures::event_e1();
        store.create_event(&event).await.unwrap();

        let result = store
            .reserve_spots(event.id, &[SpotId::new("A1"), SpotId::new("A1")])
            .await;

        assert!(matches!(result, Err(StoreError::SpotsUnavailable { .. })));
        assert_eq!(store.spot_status(event.id, &SpotId::new("A1")), Some(SpotStatus::Available));
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = InMemorySpotStore::new();
        store.fail_next_releases(1);

        assert!(store.release_reservation(ReservationToken::new()).await.is_err());
        assert_eq!(
            store.release_reservation(ReservationToken::new()).await,
            Ok(ReleaseOutcome::Unknown)
        );
    }

    #[tokio::test]
    async fn sold_spots_never_move_again() {
        let store = InMemorySpotStore::new();
        let event = fixtures::event_e1();
        store.create_event(&event).await.unwrap();
        let a1 = SpotId::new("A1");
        let reservation = store
            .reserve_spots(event.id, std::slice::from_ref(&a1))
            .await
            .unwrap();
        store
            .confirm_reservation(
                reservation.token,
                &PurchaserInfo::new("ana@example.com"),
                TicketKind::Full,
            )
            .await
            .unwrap();

        assert_eq!(
            store.release_reservation(reservation.token).await,
            Ok(ReleaseOutcome::AlreadyConfirmed)
        );
        assert!(matches!(
            store.reserve_spots(event.id, std::slice::from_ref(&a1)).await,
            Err(StoreError::SpotsUnavailable { .. })
        ));
        assert_eq!(store.spot_status(event.id, &a1), Some(SpotStatus::Sold));
    }
}
