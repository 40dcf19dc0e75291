//! Shared test data.

use boxoffice_core::{
    DateTime, Event, EventId, Money, PartnerId, PurchaseRequest, PurchaserInfo, Section,
    SectionId, Spot, SpotId, TicketKind, Utc,
};

/// Partner that sells [`event_e1`]
pub const PARTNER_1: PartnerId = PartnerId::new(1);
/// The other configured partner
pub const PARTNER_2: PartnerId = PartnerId::new(2);

/// Build an event for `partner` with one section per `(name, spots)` entry,
/// every section priced at 50.00.
#[must_use]
pub fn event(partner: PartnerId, sections: &[(&str, &[&str])]) -> Event {
    Event {
        id: EventId::new(),
        name: "Rust Conf Live".to_string(),
        location: "Hall 1".to_string(),
        organization: "Ferris Events".to_string(),
        rating: "L".to_string(),
        date: DateTime::<Utc>::from_timestamp(1_767_225_600, 0).unwrap_or_default(),
        image_url: None,
        partner_id: partner,
        sections: sections
            .iter()
            .map(|(id, spots)| Section {
                id: SectionId::new(*id),
                capacity: u32::try_from(spots.len()).unwrap_or(u32::MAX),
                price: Money::from_cents(5_000),
                spots: spots
                    .iter()
                    .map(|spot| Spot::available(SpotId::new(*spot)))
                    .collect(),
            })
            .collect(),
    }
}

/// Event E1: partner 1, one section with spots A1, A2 and A3.
#[must_use]
pub fn event_e1() -> Event {
    event(PARTNER_1, &[("Main", &["A1", "A2", "A3"])])
}

/// Full-price purchase of `spots` by a valid purchaser.
#[must_use]
pub fn purchase(event_id: EventId, partner: PartnerId, spots: &[&str]) -> PurchaseRequest {
    PurchaseRequest {
        event_id,
        partner_id: partner,
        spot_ids: spot_ids(spots),
        ticket_kind: TicketKind::Full,
        purchaser: PurchaserInfo::new("buyer@example.com"),
    }
}

/// Spot ids from names
#[must_use]
pub fn spot_ids(spots: &[&str]) -> Vec<SpotId> {
    spots.iter().map(|spot| SpotId::new(*spot)).collect()
}
