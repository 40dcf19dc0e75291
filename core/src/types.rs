//! Domain types for partner-delegated ticket sales.
//!
//! Value objects (identifiers, money, ticket kinds) and the entities the
//! store owns: events, their sections and spots, reservations and tickets.

use crate::error::FailureReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for a temporary hold on a batch of spots.
///
/// Issued by [`crate::SpotStore::reserve_spots`] and consumed by confirm or
/// release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationToken(Uuid);

impl ReservationToken {
    /// Creates a new random `ReservationToken`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationToken` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a partner service that owns ticket sales for some events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartnerId(u32);

impl PartnerId {
    /// Creates a `PartnerId`
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the numeric identifier
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a section, unique within its event (e.g. "VIP", "Floor").
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(String);

impl SectionId {
    /// Creates a new `SectionId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the section id as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a spot (a seat), e.g. "A1" or "C12".
///
/// Spot ids are unique across the whole event, so a purchase can address
/// spots without naming their section.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpotId(String);

impl SpotId {
    /// Creates a new `SpotId` without validating its format
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the spot id as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the spot naming rule: one uppercase letter followed by a
    /// positive number without leading zeros.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the violation.
    pub fn validate(&self) -> Result<(), String> {
        let mut chars = self.0.chars();
        let Some(row) = chars.next() else {
            return Err("spot id must not be empty".to_string());
        };
        if !row.is_ascii_uppercase() {
            return Err(format!("spot id {} must start with a letter A-Z", self.0));
        }
        let number = chars.as_str();
        if number.is_empty() || number.starts_with('0') || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!(
                "spot id {} must be a letter followed by a positive number",
                self.0
            ));
        }
        Ok(())
    }

    /// Generates the spot id for a zero-based position in an event's layout.
    ///
    /// Rows hold ten spots: position 0 is `A1`, 9 is `A10`, 10 is `B1`.
    /// Returns `None` past row `Z`.
    #[must_use]
    pub fn for_position(position: usize) -> Option<Self> {
        let row = u8::try_from(position / 10).ok().filter(|row| *row < 26)?;
        let row = char::from(b'A' + row);
        Some(Self(format!("{row}{}", position % 10 + 1)))
    }
}

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpotId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole currency units (rounded down)
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0 / 100
    }

    /// Half of the amount, rounded down to the cent
    #[must_use]
    pub const fn half(self) -> Self {
        Self(self.0 / 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.units(), self.0 % 100)
    }
}

// ============================================================================
// Ticket Kind
// ============================================================================

/// Whether a ticket is sold at full or half price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    /// Full price
    #[default]
    Full,
    /// Half price (students, seniors)
    Half,
}

impl TicketKind {
    /// Price of one ticket of this kind for a section priced at `section_price`
    #[must_use]
    pub const fn price_for(self, section_price: Money) -> Money {
        match self {
            Self::Full => section_price,
            Self::Half => section_price.half(),
        }
    }

    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Half => "half",
        }
    }
}

// ============================================================================
// Spots and Sections
// ============================================================================

/// Reservation state of a single spot.
///
/// Legal transitions: `Available → Reserved → Sold` and
/// `Reserved → Available`. `Sold` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    /// Free to be reserved
    Available,
    /// Held by an in-flight purchase
    Reserved,
    /// Sold; owned by exactly one ticket
    Sold,
}

impl SpotStatus {
    /// Whether moving from `self` to `next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Available, Self::Reserved)
                | (Self::Reserved, Self::Sold | Self::Available)
        )
    }

    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Sold => "sold",
        }
    }

    /// Parse from the database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            "sold" => Some(Self::Sold),
            _ => None,
        }
    }
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The smallest sellable unit of inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    /// Spot identifier
    pub id: SpotId,
    /// Current status
    pub status: SpotStatus,
    /// Ticket that owns this spot once sold
    pub ticket_id: Option<TicketId>,
}

impl Spot {
    /// Creates an available spot
    #[must_use]
    pub const fn available(id: SpotId) -> Self {
        Self {
            id,
            status: SpotStatus::Available,
            ticket_id: None,
        }
    }
}

/// A priced group of spots within an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier (unique within the event)
    pub id: SectionId,
    /// Total number of spots
    pub capacity: u32,
    /// Full ticket price for spots in this section
    pub price: Money,
    /// Spots in this section
    pub spots: Vec<Spot>,
}

impl Section {
    /// Number of spots currently available
    #[must_use]
    pub fn available(&self) -> usize {
        self.spots
            .iter()
            .filter(|spot| spot.status == SpotStatus::Available)
            .count()
    }
}

// ============================================================================
// Events
// ============================================================================

/// An event whose tickets are sold through a partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Display name
    pub name: String,
    /// Venue / location
    pub location: String,
    /// Organizing entity
    pub organization: String,
    /// Age rating (e.g. "L", "L14")
    pub rating: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Optional cover image
    pub image_url: Option<String>,
    /// Partner that owns ticket sales for this event (immutable)
    pub partner_id: PartnerId,
    /// Ordered sections
    pub sections: Vec<Section>,
}

impl Event {
    /// Iterates all spots with their section
    pub fn spots(&self) -> impl Iterator<Item = (&Section, &Spot)> {
        self.sections
            .iter()
            .flat_map(|section| section.spots.iter().map(move |spot| (section, spot)))
    }

    /// Finds a spot and its section by spot id
    #[must_use]
    pub fn find_spot(&self, spot_id: &SpotId) -> Option<(&Section, &Spot)> {
        self.spots().find(|(_, spot)| &spot.id == spot_id)
    }

    /// Total spots currently available across all sections
    #[must_use]
    pub fn available(&self) -> usize {
        self.sections.iter().map(Section::available).sum()
    }

    /// Checks the structural invariants the store relies on: unique section
    /// ids, unique spot ids across the event, capacity matching spot count,
    /// and valid spot names.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first violation.
    pub fn check_layout(&self) -> Result<(), String> {
        if self.sections.is_empty() {
            return Err("event must have at least one section".to_string());
        }
        let mut sections = HashSet::new();
        let mut spots = HashSet::new();
        for section in &self.sections {
            if !sections.insert(&section.id) {
                return Err(format!("duplicate section id {}", section.id));
            }
            if usize::try_from(section.capacity).ok() != Some(section.spots.len()) {
                return Err(format!(
                    "section {} declares capacity {} but has {} spots",
                    section.id,
                    section.capacity,
                    section.spots.len()
                ));
            }
            for spot in &section.spots {
                spot.id.validate()?;
                if !spots.insert(&spot.id) {
                    return Err(format!("duplicate spot id {}", spot.id));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Reservations and Tickets
// ============================================================================

/// Lifecycle of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Spots are held, awaiting partner checkout
    Pending,
    /// Spots were sold and tickets issued
    Confirmed,
    /// Spots went back to available
    Released,
}

impl ReservationStatus {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Released => "released",
        }
    }

    /// Parse from the database string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "released" => Some(Self::Released),
            _ => None,
        }
    }
}

/// A temporary hold on a batch of spots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Token identifying the hold
    pub token: ReservationToken,
    /// Event the spots belong to
    pub event_id: EventId,
    /// Spots held by this reservation
    pub spot_ids: Vec<SpotId>,
    /// Current status
    pub status: ReservationStatus,
    /// When the hold was taken
    pub created_at: DateTime<Utc>,
}

/// Result of releasing a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseOutcome {
    /// Spots were returned to available
    Released {
        /// Number of spots released
        spots: usize,
    },
    /// The reservation had already been released (no-op)
    AlreadyReleased,
    /// The reservation had been confirmed; nothing changed
    AlreadyConfirmed,
    /// No reservation with this token exists (no-op)
    Unknown,
}

/// A sold ticket. Owns exactly one spot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Event the ticket is for
    pub event_id: EventId,
    /// Spot owned by this ticket
    pub spot_id: SpotId,
    /// Reservation the ticket was issued under
    pub reservation: ReservationToken,
    /// Purchaser contact
    pub purchaser_email: String,
    /// Full or half price
    pub kind: TicketKind,
    /// Price paid
    pub price: Money,
    /// When the ticket was issued
    pub issued_at: DateTime<Utc>,
}

// ============================================================================
// Purchase Requests and Results
// ============================================================================

/// Who is buying, and how they pay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaserInfo {
    /// Contact email; tickets are issued to this address
    pub email: String,
    /// Opaque payment reference from the caller. Neither partner's wire
    /// format carries it, so it is only recorded with the sale.
    #[serde(default)]
    pub payment_reference: Option<String>,
}

impl PurchaserInfo {
    /// Creates purchaser info without a payment reference
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            payment_reference: None,
        }
    }

    /// Minimal identity check: the email has a non-empty local part and
    /// domain around a single `@`.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the email was refused.
    pub fn validate(&self) -> Result<(), String> {
        match self.email.trim().split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(format!("invalid purchaser email {:?}", self.email)),
        }
    }
}

/// Inbound purchase command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Event to buy tickets for
    pub event_id: EventId,
    /// Partner the caller believes owns the event; must match
    pub partner_id: PartnerId,
    /// Requested spots
    pub spot_ids: Vec<SpotId>,
    /// Full or half price tickets
    #[serde(default)]
    pub ticket_kind: TicketKind,
    /// Buyer identity
    pub purchaser: PurchaserInfo,
}

/// Successful purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Event the tickets are for
    pub event_id: EventId,
    /// Reservation the sale went through
    pub reservation: ReservationToken,
    /// Issued tickets, one per requested spot
    pub ticket_ids: Vec<TicketId>,
    /// Partner-side reference for the sale
    pub partner_reference: String,
}

/// Terminal outcome reported to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    /// Whether tickets were issued
    pub success: bool,
    /// Confirmed tickets (empty on failure)
    pub ticket_ids: Vec<TicketId>,
    /// Classified failure (absent on success)
    pub failure: Option<FailureReason>,
    /// Human-readable failure detail
    pub message: Option<String>,
}

impl PurchaseResult {
    /// Success with the issued tickets
    #[must_use]
    pub const fn sold(ticket_ids: Vec<TicketId>) -> Self {
        Self {
            success: true,
            ticket_ids,
            failure: None,
            message: None,
        }
    }

    /// Failure with a stable reason
    #[must_use]
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ticket_ids: Vec::new(),
            failure: Some(reason),
            message: Some(message.into()),
        }
    }

    /// Whether the failure was a spot conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.failure == Some(FailureReason::Conflict)
    }
}

impl From<Result<PurchaseReceipt, crate::error::PurchaseError>> for PurchaseResult {
    fn from(result: Result<PurchaseReceipt, crate::error::PurchaseError>) -> Self {
        match result {
            Ok(receipt) => Self::sold(receipt.ticket_ids),
            Err(error) => Self::failed(error.reason(), error.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn spot_ids_follow_row_number_format() {
        assert!(SpotId::new("A1").validate().is_ok());
        assert!(SpotId::new("Z10").validate().is_ok());
        assert!(SpotId::new("").validate().is_err());
        assert!(SpotId::new("a1").validate().is_err());
        assert!(SpotId::new("A").validate().is_err());
        assert!(SpotId::new("A0").validate().is_err());
        assert!(SpotId::new("A01").validate().is_err());
        assert!(SpotId::new("AB1").validate().is_err());
    }

    #[test]
    fn spot_positions_fill_rows_of_ten() {
        assert_eq!(SpotId::for_position(0), Some(SpotId::new("A1")));
        assert_eq!(SpotId::for_position(9), Some(SpotId::new("A10")));
        assert_eq!(SpotId::for_position(10), Some(SpotId::new("B1")));
        assert_eq!(SpotId::for_position(259), Some(SpotId::new("Z10")));
        assert_eq!(SpotId::for_position(260), None);
    }

    #[test]
    fn half_tickets_round_down() {
        assert_eq!(TicketKind::Full.price_for(Money::from_cents(1001)).cents(), 1001);
        assert_eq!(TicketKind::Half.price_for(Money::from_cents(1001)).cents(), 500);
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
    }

    #[test]
    fn spot_status_transitions() {
        use SpotStatus::{Available, Reserved, Sold};
        assert!(Available.can_transition_to(Reserved));
        assert!(Reserved.can_transition_to(Sold));
        assert!(Reserved.can_transition_to(Available));
        assert!(!Available.can_transition_to(Sold));
        assert!(!Sold.can_transition_to(Available));
        assert!(!Sold.can_transition_to(Reserved));
    }

    #[test]
    fn purchaser_email_validation() {
        assert!(PurchaserInfo::new("ana@example.com").validate().is_ok());
        assert!(PurchaserInfo::new("ana").validate().is_err());
        assert!(PurchaserInfo::new("@example.com").validate().is_err());
        assert!(PurchaserInfo::new("ana@").validate().is_err());
        assert!(PurchaserInfo::new("a@b@c").validate().is_err());
    }

    #[test]
    fn layout_rejects_duplicate_spots_across_sections() {
        let section = |id: &str, spots: &[&str]| Section {
            id: SectionId::new(id),
            capacity: u32::try_from(spots.len()).unwrap_or(u32::MAX),
            price: Money::from_cents(5000),
            spots: spots.iter().map(|s| Spot::available(SpotId::new(*s))).collect(),
        };
        let mut event = Event {
            id: EventId::new(),
            name: "Show".to_string(),
            location: "Arena".to_string(),
            organization: "Org".to_string(),
            rating: "L".to_string(),
            date: Utc::now(),
            image_url: None,
            partner_id: PartnerId::new(1),
            sections: vec![section("VIP", &["A1", "A2"]), section("Floor", &["B1"])],
        };
        assert!(event.check_layout().is_ok());

        event.sections[1] = section("Floor", &["A2"]);
        assert!(event.check_layout().unwrap_err().contains("duplicate spot id A2"));
    }

    #[test]
    fn statuses_round_trip_through_storage_strings() {
        for status in [SpotStatus::Available, SpotStatus::Reserved, SpotStatus::Sold] {
            assert_eq!(SpotStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Released,
        ] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SpotStatus::parse("held"), None);
    }
}
