//! Contract tests for `InMemorySpotStore`.
//!
//! These pin down the behaviour every `SpotStore` must have; the Postgres
//! store runs the same scenarios against a real database.

#![allow(clippy::unwrap_used)]

use boxoffice_core::environment::Clock;
use boxoffice_core::{
    PurchaserInfo, ReleaseOutcome, ReservationStatus, SpotId, SpotStatus, SpotStore, StoreError,
    TicketKind,
};
use boxoffice_testing::{InMemorySpotStore, fixtures, test_clock};
use chrono::Duration;
use std::sync::Arc;

async fn seeded() -> (InMemorySpotStore, boxoffice_core::Event) {
    let store = InMemorySpotStore::new();
    let event = fixtures::event_e1();
    store.create_event(&event).await.unwrap();
    (store, event)
}

#[tokio::test]
async fn reserve_is_all_or_nothing() {
    let (store, event) = seeded().await;
    store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A2"]))
        .await
        .unwrap();

    let err = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A1", "A2", "Z9"]))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::SpotsUnavailable {
            spots: fixtures::spot_ids(&["A2", "Z9"])
        }
    );
    assert_eq!(
        store.spot_status(event.id, &SpotId::new("A1")),
        Some(SpotStatus::Available)
    );
}

#[tokio::test]
async fn concurrent_reservations_of_one_spot_have_one_winner() {
    let (store, event) = seeded().await;
    let store = Arc::new(store);

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .reserve_spots(event.id, &fixtures::spot_ids(&["A1"]))
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let winners = results
        .iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(store.pending_reservations(), 1);
}

#[tokio::test]
async fn confirm_is_idempotent_and_prices_by_kind() {
    let (store, event) = seeded().await;
    let reservation = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A1", "A2"]))
        .await
        .unwrap();
    let purchaser = PurchaserInfo::new("ana@example.com");

    let first = store
        .confirm_reservation(reservation.token, &purchaser, TicketKind::Half)
        .await
        .unwrap();
    let second = store
        .confirm_reservation(reservation.token, &purchaser, TicketKind::Half)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    let tickets = store.tickets();
    assert_eq!(tickets.len(), 2);
    assert!(tickets.iter().all(|ticket| ticket.price.cents() == 2_500));
    assert_eq!(
        store.spot_status(event.id, &SpotId::new("A1")),
        Some(SpotStatus::Sold)
    );
}

#[tokio::test]
async fn every_sold_spot_has_exactly_one_ticket() {
    let (store, event) = seeded().await;
    let reservation = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A1", "A3"]))
        .await
        .unwrap();
    let tickets = store
        .confirm_reservation(
            reservation.token,
            &PurchaserInfo::new("ana@example.com"),
            TicketKind::Full,
        )
        .await
        .unwrap();

    let stored = store.get_event(event.id).await.unwrap();
    for (_, spot) in stored.spots() {
        match spot.status {
            SpotStatus::Sold => {
                let owner = spot.ticket_id.unwrap();
                assert!(tickets.contains(&owner));
            }
            _ => assert!(spot.ticket_id.is_none()),
        }
    }
}

#[tokio::test]
async fn release_outcomes() {
    let (store, event) = seeded().await;
    let released = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A1"]))
        .await
        .unwrap();
    let confirmed = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A2"]))
        .await
        .unwrap();
    store
        .confirm_reservation(
            confirmed.token,
            &PurchaserInfo::new("ana@example.com"),
            TicketKind::Full,
        )
        .await
        .unwrap();

    assert_eq!(
        store.release_reservation(released.token).await,
        Ok(ReleaseOutcome::Released { spots: 1 })
    );
    assert_eq!(
        store.release_reservation(released.token).await,
        Ok(ReleaseOutcome::AlreadyReleased)
    );
    assert_eq!(
        store.release_reservation(confirmed.token).await,
        Ok(ReleaseOutcome::AlreadyConfirmed)
    );
    assert_eq!(
        store.spot_status(event.id, &SpotId::new("A2")),
        Some(SpotStatus::Sold)
    );
    assert_eq!(
        store
            .confirm_reservation(
                released.token,
                &PurchaserInfo::new("ana@example.com"),
                TicketKind::Full
            )
            .await,
        Err(StoreError::ReservationReleased(released.token))
    );
}

#[tokio::test]
async fn stale_release_only_touches_old_pending_holds() {
    let clock = test_clock();
    let store = InMemorySpotStore::with_clock(Arc::new(clock.clone()));
    let event = fixtures::event_e1();
    store.create_event(&event).await.unwrap();

    let old = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A1"]))
        .await
        .unwrap();
    clock.advance(Duration::minutes(10));
    let fresh = store
        .reserve_spots(event.id, &fixtures::spot_ids(&["A2"]))
        .await
        .unwrap();

    let cutoff = clock.now() - Duration::minutes(5);
    let released = store.release_stale_reservations(cutoff).await.unwrap();

    assert_eq!(released, vec![old.token]);
    assert_eq!(
        store.reservation(old.token).unwrap().status,
        ReservationStatus::Released
    );
    assert_eq!(
        store.reservation(fresh.token).unwrap().status,
        ReservationStatus::Pending
    );
    assert_eq!(
        store.spot_status(event.id, &SpotId::new("A1")),
        Some(SpotStatus::Available)
    );
}
