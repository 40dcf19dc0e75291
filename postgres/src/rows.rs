//! Row types and their conversion into domain values.

use boxoffice_core::{
    DateTime, Event, EventId, Money, PartnerId, Section, SectionId, Spot, SpotId, SpotStatus,
    StoreError, TicketId, Utc,
};
use std::collections::HashMap;
use uuid::Uuid;

pub(crate) fn db(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("corrupt {what}: {value}"))
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub organization: String,
    pub rating: String,
    pub date: DateTime<Utc>,
    pub image_url: Option<String>,
    pub partner_id: i32,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SectionRow {
    pub event_id: Uuid,
    pub id: String,
    pub capacity: i32,
    pub price_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SpotRow {
    pub event_id: Uuid,
    pub id: String,
    pub section_id: String,
    pub status: String,
    pub ticket_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReservationRow {
    pub token: Uuid,
    pub event_id: Uuid,
    pub spot_ids: Vec<String>,
    pub status: String,
}

pub(crate) fn to_i32(what: &str, value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| corrupt(what, value))
}

pub(crate) fn to_i64(what: &str, value: Money) -> Result<i64, StoreError> {
    i64::try_from(value.cents()).map_err(|_| corrupt(what, value))
}

/// Assemble events from flat rows. Sections and spots must already be in
/// layout order.
pub(crate) fn assemble(
    events: Vec<EventRow>,
    sections: Vec<SectionRow>,
    spots: Vec<SpotRow>,
) -> Result<Vec<Event>, StoreError> {
    let mut spots_by_section: HashMap<(Uuid, String), Vec<Spot>> = HashMap::new();
    for row in spots {
        let status = SpotStatus::parse(&row.status).ok_or_else(|| corrupt("spot status", &row.status))?;
        spots_by_section
            .entry((row.event_id, row.section_id))
            .or_default()
            .push(Spot {
                id: SpotId::new(row.id),
                status,
                ticket_id: row.ticket_id.map(TicketId::from_uuid),
            });
    }

    let mut sections_by_event: HashMap<Uuid, Vec<Section>> = HashMap::new();
    for row in sections {
        let spots = spots_by_section
            .remove(&(row.event_id, row.id.clone()))
            .unwrap_or_default();
        sections_by_event.entry(row.event_id).or_default().push(Section {
            capacity: u32::try_from(row.capacity).map_err(|_| corrupt("capacity", row.capacity))?,
            price: Money::from_cents(
                u64::try_from(row.price_cents).map_err(|_| corrupt("price", row.price_cents))?,
            ),
            id: SectionId::new(row.id),
            spots,
        });
    }

    events
        .into_iter()
        .map(|row| {
            Ok(Event {
                id: EventId::from_uuid(row.id),
                name: row.name,
                location: row.location,
                organization: row.organization,
                rating: row.rating,
                date: row.date,
                image_url: row.image_url,
                partner_id: PartnerId::new(
                    u32::try_from(row.partner_id)
                        .map_err(|_| corrupt("partner id", row.partner_id))?,
                ),
                sections: sections_by_event.remove(&row.id).unwrap_or_default(),
            })
        })
        .collect()
}
