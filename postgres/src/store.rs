//! `SpotStore` implementation.

use crate::rows::{self, EventRow, ReservationRow, SectionRow, SpotRow, db};
use boxoffice_core::environment::{Clock, SystemClock};
use boxoffice_core::{
    DateTime, Event, EventId, Money, PurchaserInfo, ReleaseOutcome, Reservation,
    ReservationStatus, ReservationToken, SpotId, SpotStatus, SpotStore, StoreError, TicketId,
    TicketKind, Utc,
};
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// `PostgreSQL` spot store.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PostgresSpotStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresSpotStore {
    /// Create a store on `pool` using the system clock.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Create a store stamping reservations and tickets with `clock`.
    #[must_use]
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))
    }

    /// Load one event, or all of them when `event_id` is `None`.
    async fn load_events(&self, event_id: Option<Uuid>) -> Result<Vec<Event>, StoreError> {
        let events: Vec<EventRow> = sqlx::query_as(
            "SELECT id, name, location, organization, rating, date, image_url, partner_id
             FROM events
             WHERE ($1::uuid IS NULL OR id = $1)
             ORDER BY date, created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let sections: Vec<SectionRow> = sqlx::query_as(
            "SELECT event_id, id, capacity, price_cents
             FROM sections
             WHERE ($1::uuid IS NULL OR event_id = $1)
             ORDER BY event_id, position",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let spots: Vec<SpotRow> = sqlx::query_as(
            "SELECT event_id, id, section_id, status, ticket_id
             FROM spots
             WHERE ($1::uuid IS NULL OR event_id = $1)
             ORDER BY event_id, position",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows::assemble(events, sections, spots)
    }
}

fn spot_names(spot_ids: &[SpotId]) -> Vec<String> {
    spot_ids.iter().map(|spot| spot.as_str().to_string()).collect()
}

/// Return a locked pending reservation's spots to available and mark it
/// released. Only spots still `reserved` are touched.
async fn release_locked(
    conn: &mut PgConnection,
    token: Uuid,
    event_id: Uuid,
    spot_ids: &[String],
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    let released = sqlx::query(
        "UPDATE spots SET status = 'available'
         WHERE event_id = $1 AND id = ANY($2) AND status = 'reserved'",
    )
    .bind(event_id)
    .bind(spot_ids)
    .execute(&mut *conn)
    .await
    .map_err(db)?
    .rows_affected();

    sqlx::query("UPDATE reservations SET status = 'released', resolved_at = $2 WHERE token = $1")
        .bind(token)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(db)?;

    Ok(usize::try_from(released).unwrap_or(usize::MAX))
}

async fn lock_reservation(
    conn: &mut PgConnection,
    token: ReservationToken,
) -> Result<Option<(ReservationRow, ReservationStatus)>, StoreError> {
    let row: Option<ReservationRow> = sqlx::query_as(
        "SELECT token, event_id, spot_ids, status FROM reservations WHERE token = $1 FOR UPDATE",
    )
    .bind(token.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db)?;

    row.map(|row| {
        let status = ReservationStatus::parse(&row.status).ok_or_else(|| {
            StoreError::Database(format!("corrupt reservation status: {}", row.status))
        })?;
        Ok((row, status))
    })
    .transpose()
}

impl SpotStore for PostgresSpotStore {
    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        event.check_layout().map_err(StoreError::InvalidEvent)?;
        let partner_id = rows::to_i32("partner id", event.partner_id.value())?;

        let mut tx = self.pool.begin().await.map_err(db)?;
        let inserted = sqlx::query(
            "INSERT INTO events (id, name, location, organization, rating, date, image_url, partner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.location)
        .bind(&event.organization)
        .bind(&event.rating)
        .bind(event.date)
        .bind(&event.image_url)
        .bind(partner_id)
        .execute(&mut *tx)
        .await
        .map_err(db)?
        .rows_affected();
        if inserted == 0 {
            return Err(StoreError::DuplicateEvent(event.id));
        }

        let mut spot_position = 0_i32;
        for (section_position, section) in (0_i32..).zip(&event.sections) {
            sqlx::query(
                "INSERT INTO sections (event_id, id, position, capacity, price_cents)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(event.id.as_uuid())
            .bind(section.id.as_str())
            .bind(section_position)
            .bind(rows::to_i32("capacity", section.capacity)?)
            .bind(rows::to_i64("price", section.price)?)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

            for spot in &section.spots {
                sqlx::query(
                    "INSERT INTO spots (event_id, id, section_id, position, status)
                     VALUES ($1, $2, $3, $4, 'available')",
                )
                .bind(event.id.as_uuid())
                .bind(spot.id.as_str())
                .bind(section.id.as_str())
                .bind(spot_position)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
                spot_position += 1;
            }
        }

        tx.commit().await.map_err(db)?;
        tracing::info!(event_id = %event.id, spots = spot_position, "Event created");
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.load_events(None).await
    }

    async fn get_event(&self, event_id: EventId) -> Result<Event, StoreError> {
        self.load_events(Some(*event_id.as_uuid()))
            .await?
            .pop()
            .ok_or(StoreError::EventNotFound(event_id))
    }

    async fn reserve_spots(
        &self,
        event_id: EventId,
        spot_ids: &[SpotId],
    ) -> Result<Reservation, StoreError> {
        let mut seen = HashSet::new();
        let duplicates: Vec<SpotId> = spot_ids
            .iter()
            .filter(|spot| !seen.insert(*spot))
            .cloned()
            .collect();
        if !duplicates.is_empty() {
            return Err(StoreError::SpotsUnavailable { spots: duplicates });
        }

        let names = spot_names(spot_ids);
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db)?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
            .bind(event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?;
        if exists.is_none() {
            return Err(StoreError::EventNotFound(event_id));
        }

        let locked: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, status FROM spots
             WHERE event_id = $1 AND id = ANY($2)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(event_id.as_uuid())
        .bind(&names)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let available: HashSet<&str> = locked
            .iter()
            .filter(|(_, status)| {
                SpotStatus::parse(status)
                    .is_some_and(|status| status.can_transition_to(SpotStatus::Reserved))
            })
            .map(|(id, _)| id.as_str())
            .collect();
        let unavailable: Vec<SpotId> = spot_ids
            .iter()
            .filter(|spot| !available.contains(spot.as_str()))
            .cloned()
            .collect();
        if !unavailable.is_empty() {
            tx.rollback().await.map_err(db)?;
            tracing::debug!(%event_id, spots = ?unavailable, "Reservation refused");
            return Err(StoreError::SpotsUnavailable { spots: unavailable });
        }

        sqlx::query(
            "UPDATE spots SET status = 'reserved'
             WHERE event_id = $1 AND id = ANY($2) AND status = 'available'",
        )
        .bind(event_id.as_uuid())
        .bind(&names)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        let token = ReservationToken::new();
        sqlx::query(
            "INSERT INTO reservations (token, event_id, spot_ids, status, created_at)
             VALUES ($1, $2, $3, 'pending', $4)",
        )
        .bind(token.as_uuid())
        .bind(event_id.as_uuid())
        .bind(&names)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(Reservation {
            token,
            event_id,
            spot_ids: spot_ids.to_vec(),
            status: ReservationStatus::Pending,
            created_at: now,
        })
    }

    async fn confirm_reservation(
        &self,
        token: ReservationToken,
        purchaser: &PurchaserInfo,
        kind: TicketKind,
    ) -> Result<Vec<TicketId>, StoreError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db)?;
        let (reservation, status) = lock_reservation(&mut tx, token)
            .await?
            .ok_or(StoreError::ReservationNotFound(token))?;

        match status {
            ReservationStatus::Released => return Err(StoreError::ReservationReleased(token)),
            ReservationStatus::Confirmed => {
                let issued: Vec<(Uuid, String)> =
                    sqlx::query_as("SELECT id, spot_id FROM tickets WHERE reservation = $1")
                        .bind(token.as_uuid())
                        .fetch_all(&mut *tx)
                        .await
                        .map_err(db)?;
                let by_spot: HashMap<String, Uuid> =
                    issued.into_iter().map(|(id, spot)| (spot, id)).collect();
                return Ok(reservation
                    .spot_ids
                    .iter()
                    .filter_map(|spot| by_spot.get(spot).copied().map(TicketId::from_uuid))
                    .collect());
            }
            ReservationStatus::Pending => {}
        }

        let prices: Vec<(String, i64)> = sqlx::query_as(
            "SELECT s.id, sec.price_cents
             FROM spots s
             JOIN sections sec ON sec.event_id = s.event_id AND sec.id = s.section_id
             WHERE s.event_id = $1 AND s.id = ANY($2)",
        )
        .bind(reservation.event_id)
        .bind(&reservation.spot_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;
        let prices: HashMap<String, i64> = prices.into_iter().collect();

        let mut ticket_ids = Vec::with_capacity(reservation.spot_ids.len());
        for spot_id in &reservation.spot_ids {
            let section_price = prices
                .get(spot_id)
                .and_then(|cents| u64::try_from(*cents).ok())
                .map(Money::from_cents)
                .ok_or_else(|| StoreError::Database(format!("spot {spot_id} vanished")))?;
            let ticket_id = TicketId::new();

            sqlx::query(
                "INSERT INTO tickets
                     (id, event_id, spot_id, reservation, purchaser_email, kind, price_cents, issued_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(ticket_id.as_uuid())
            .bind(reservation.event_id)
            .bind(spot_id)
            .bind(reservation.token)
            .bind(&purchaser.email)
            .bind(kind.as_str())
            .bind(rows::to_i64("price", kind.price_for(section_price))?)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

            sqlx::query(
                "UPDATE spots SET status = 'sold', ticket_id = $3 WHERE event_id = $1 AND id = $2",
            )
            .bind(reservation.event_id)
            .bind(spot_id)
            .bind(ticket_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db)?;

            ticket_ids.push(ticket_id);
        }

        sqlx::query(
            "UPDATE reservations SET status = 'confirmed', resolved_at = $2 WHERE token = $1",
        )
        .bind(reservation.token)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        tracing::debug!(reservation = %token, tickets = ticket_ids.len(), "Reservation confirmed");
        Ok(ticket_ids)
    }

    async fn release_reservation(
        &self,
        token: ReservationToken,
    ) -> Result<ReleaseOutcome, StoreError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db)?;
        let Some((reservation, status)) = lock_reservation(&mut tx, token).await? else {
            return Ok(ReleaseOutcome::Unknown);
        };

        let outcome = match status {
            ReservationStatus::Released => ReleaseOutcome::AlreadyReleased,
            ReservationStatus::Confirmed => ReleaseOutcome::AlreadyConfirmed,
            ReservationStatus::Pending => {
                let spots = release_locked(
                    &mut tx,
                    reservation.token,
                    reservation.event_id,
                    &reservation.spot_ids,
                    now,
                )
                .await?;
                ReleaseOutcome::Released { spots }
            }
        };

        tx.commit().await.map_err(db)?;
        Ok(outcome)
    }

    async fn release_stale_reservations(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ReservationToken>, StoreError> {
        let now = self.clock.now();
        let mut tx = self.pool.begin().await.map_err(db)?;
        let stale: Vec<ReservationRow> = sqlx::query_as(
            "SELECT token, event_id, spot_ids, status FROM reservations
             WHERE status = 'pending' AND created_at < $1
             ORDER BY created_at
             FOR UPDATE SKIP LOCKED",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let mut released = Vec::with_capacity(stale.len());
        for reservation in stale {
            release_locked(
                &mut tx,
                reservation.token,
                reservation.event_id,
                &reservation.spot_ids,
                now,
            )
            .await?;
            released.push(ReservationToken::from_uuid(reservation.token));
        }

        tx.commit().await.map_err(db)?;
        if !released.is_empty() {
            tracing::info!(count = released.len(), %cutoff, "Released stale reservations");
        }
        Ok(released)
    }
}
