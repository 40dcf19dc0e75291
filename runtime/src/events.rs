//! Read side and setup of events.

use boxoffice_core::{
    DateTime, Event, EventId, Money, PartnerId, Section, SectionId, Spot, SpotId, SpotStore,
    StoreError, Utc,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Section of an event being created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSection {
    /// Section identifier
    pub id: SectionId,
    /// Number of spots
    pub capacity: u32,
    /// Full ticket price
    pub price: Money,
    /// Explicit spot names. When absent, names are generated in row order
    /// continuing from the previous section (`A1`..`A10`, `B1`, ...).
    #[serde(default)]
    pub spots: Option<Vec<SpotId>>,
}

/// Event setup command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name
    pub name: String,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Organizer
    #[serde(default)]
    pub organization: String,
    /// Age rating
    #[serde(default)]
    pub rating: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Cover image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Partner that sells this event
    pub partner_id: PartnerId,
    /// Sections in display order
    pub sections: Vec<NewSection>,
}

impl NewEvent {
    /// Build the event with every spot available.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEvent`] if the name is blank, there are no
    /// sections, a section is empty, explicit spot names disagree with the
    /// capacity, or generated names run past row `Z`.
    pub fn into_event(self, id: EventId) -> Result<Event, StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidEvent("event name must not be blank".to_string()));
        }
        if self.sections.is_empty() {
            return Err(StoreError::InvalidEvent(
                "event must have at least one section".to_string(),
            ));
        }

        let mut position = 0usize;
        let mut sections = Vec::with_capacity(self.sections.len());
        for new_section in self.sections {
            if new_section.capacity == 0 {
                return Err(StoreError::InvalidEvent(format!(
                    "section {} must have at least one spot",
                    new_section.id
                )));
            }
            let spot_ids = match new_section.spots {
                Some(spot_ids) => spot_ids,
                None => {
                    let count = usize::try_from(new_section.capacity).map_err(|_| {
                        StoreError::InvalidEvent(format!("section {} is too large", new_section.id))
                    })?;
                    let generated = (position..position + count)
                        .map(SpotId::for_position)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| {
                            StoreError::InvalidEvent(format!(
                                "section {} does not fit in rows A-Z",
                                new_section.id
                            ))
                        })?;
                    position += count;
                    generated
                }
            };
            sections.push(Section {
                id: new_section.id,
                capacity: new_section.capacity,
                price: new_section.price,
                spots: spot_ids.into_iter().map(Spot::available).collect(),
            });
        }

        let event = Event {
            id,
            name: self.name.trim().to_string(),
            location: self.location,
            organization: self.organization,
            rating: self.rating,
            date: self.date,
            image_url: self.image_url,
            partner_id: self.partner_id,
            sections,
        };
        event.check_layout().map_err(StoreError::InvalidEvent)?;
        Ok(event)
    }
}

/// Event queries and setup.
pub struct EventService<S> {
    store: Arc<S>,
}

impl<S> Clone for EventService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SpotStore> EventService<S> {
    /// Creates the service.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// All events with a snapshot of spot status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.store.list_events().await
    }

    /// One event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EventNotFound`] if the event does not exist.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event, StoreError> {
        self.store.get_event(event_id).await
    }

    /// Validate and persist a new event under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEvent`] for a malformed layout, or the
    /// store's error if persisting fails.
    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event, StoreError> {
        let event = new_event.into_event(EventId::new())?;
        self.store.create_event(&event).await?;
        tracing::info!(
            event_id = %event.id,
            partner = %event.partner_id,
            spots = event.spots().count(),
            "Event created"
        );
        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn new_event(sections: Vec<NewSection>) -> NewEvent {
        NewEvent {
            name: "Rock in Rust".to_string(),
            location: "Main Stage".to_string(),
            organization: "Crab Productions".to_string(),
            rating: "L".to_string(),
            date: Utc::now(),
            image_url: None,
            partner_id: PartnerId::new(1),
            sections,
        }
    }

    fn section(id: &str, capacity: u32) -> NewSection {
        NewSection {
            id: SectionId::new(id),
            capacity,
            price: Money::from_cents(10_000),
            spots: None,
        }
    }

    #[test]
    fn generated_names_continue_across_sections() {
        let event = new_event(vec![section("VIP", 12), section("Floor", 3)])
            .into_event(EventId::new())
            .unwrap();

        let names: Vec<&str> = event.spots().map(|(_, spot)| spot.id.as_str()).collect();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "A1");
        assert_eq!(names[9], "A10");
        assert_eq!(names[11], "B2");
        assert_eq!(names[12], "B3");
        assert_eq!(event.available(), 15);
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut command = new_event(vec![section("VIP", 1)]);
        command.name = "   ".to_string();
        assert!(matches!(
            command.into_event(EventId::new()),
            Err(StoreError::InvalidEvent(_))
        ));
    }

    #[test]
    fn explicit_spots_must_match_capacity() {
        let mut vip = section("VIP", 3);
        vip.spots = Some(vec![SpotId::new("A1"), SpotId::new("A2")]);
        let err = new_event(vec![vip]).into_event(EventId::new()).unwrap_err();
        assert!(err.to_string().contains("capacity 3"));
    }

    #[test]
    fn explicit_spots_are_validated() {
        let mut vip = section("VIP", 1);
        vip.spots = Some(vec![SpotId::new("1A")]);
        assert!(new_event(vec![vip]).into_event(EventId::new()).is_err());
    }

    #[test]
    fn layouts_past_row_z_are_rejected() {
        assert!(new_event(vec![section("Huge", 261)])
            .into_event(EventId::new())
            .is_err());
        assert!(new_event(vec![section("Empty", 0)])
            .into_event(EventId::new())
            .is_err());
        assert!(new_event(Vec::new()).into_event(EventId::new()).is_err());
    }
}
