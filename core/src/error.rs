//! Error taxonomy for the purchase path.
//!
//! Store and partner failures are classified into [`PurchaseError`] before
//! they leave the orchestrator; [`FailureReason`] is the stable, serializable
//! classification callers branch on.

use crate::types::{EventId, PartnerId, ReservationToken, SpotId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

fn join_spots(spots: &[SpotId]) -> String {
    spots
        .iter()
        .map(SpotId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by an Event/Spot store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No event with this id
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// At least one requested spot is missing or not available
    #[error("Spots not available: {}", join_spots(.spots))]
    SpotsUnavailable {
        /// Offending spots
        spots: Vec<SpotId>,
    },

    /// No reservation with this token
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationToken),

    /// Confirm was attempted on a released reservation
    #[error("Reservation {0} was already released")]
    ReservationReleased(ReservationToken),

    /// Event setup tried to reuse an existing id
    #[error("Event {0} already exists")]
    DuplicateEvent(EventId),

    /// Event setup failed a structural check
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Storage backend failure
    #[error("Database error: {0}")]
    Database(String),
}

/// How a partner checkout failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerErrorKind {
    /// Partner declined; permanent, never retried
    Rejected,
    /// Partner unreachable or timed out; transient
    Unavailable,
    /// Partner answered with something we cannot interpret; permanent
    ProtocolError,
}

impl PartnerErrorKind {
    /// Metric/log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Unavailable => "unavailable",
            Self::ProtocolError => "protocol_error",
        }
    }
}

impl fmt::Display for PartnerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a partner gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Partner {partner} {kind}: {message}")]
pub struct PartnerError {
    /// Partner that failed
    pub partner: PartnerId,
    /// Classification
    pub kind: PartnerErrorKind,
    /// Detail for logs
    pub message: String,
}

impl PartnerError {
    /// Partner declined the checkout
    #[must_use]
    pub fn rejected(partner: PartnerId, message: impl Into<String>) -> Self {
        Self {
            partner,
            kind: PartnerErrorKind::Rejected,
            message: message.into(),
        }
    }

    /// Partner could not be reached
    #[must_use]
    pub fn unavailable(partner: PartnerId, message: impl Into<String>) -> Self {
        Self {
            partner,
            kind: PartnerErrorKind::Unavailable,
            message: message.into(),
        }
    }

    /// Partner response could not be interpreted
    #[must_use]
    pub fn protocol(partner: PartnerId, message: impl Into<String>) -> Self {
        Self {
            partner,
            kind: PartnerErrorKind::ProtocolError,
            message: message.into(),
        }
    }

    /// Whether a retry may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.kind, PartnerErrorKind::Unavailable)
    }
}

/// Partner configuration errors. Never silently fall back to another partner.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No gateway is configured for this partner
    #[error("No gateway configured for partner {0}")]
    UnknownPartner(PartnerId),

    /// A base URL was configured for a partner we have no implementation for
    #[error("Partner {0} has no gateway implementation")]
    UnsupportedPartner(PartnerId),

    /// Base URL could not be parsed
    #[error("Invalid base URL {url:?} for partner {partner}: {reason}")]
    InvalidBaseUrl {
        /// Partner the URL belongs to
        partner: PartnerId,
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Any other invalid setting
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Stable classification of a failed purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Caller mistake; do not retry as-is
    Validation,
    /// Spots no longer available; retry with different spots
    Conflict,
    /// Partner declined
    PartnerRejected,
    /// Partner unreachable after bounded retries
    PartnerTransient,
    /// Partner answered with an unreadable response
    ProtocolError,
    /// Caller cancelled or the checkout deadline passed
    Cancelled,
    /// Partner not configured
    Configuration,
    /// Storage failure
    InternalStoreError,
}

impl FailureReason {
    /// Metric/log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::PartnerRejected => "partner_rejected",
            Self::PartnerTransient => "partner_transient",
            Self::ProtocolError => "protocol_error",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
            Self::InternalStoreError => "internal_store_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal purchase failure as seen by callers of the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PurchaseError {
    /// Malformed or inconsistent request; nothing was reserved
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested event does not exist; nothing was reserved
    #[error("Event {0} not found")]
    EventNotFound(EventId),

    /// Spots were taken by someone else
    #[error("Spots no longer available: {}", join_spots(.spots))]
    Conflict {
        /// Spots that could not be reserved
        spots: Vec<SpotId>,
    },

    /// Partner declined; reservation released
    #[error("Partner rejected the purchase: {0}")]
    PartnerRejected(PartnerError),

    /// Partner stayed unreachable; reservation released
    #[error("Partner unavailable after {attempts} attempts: {last}")]
    PartnerTransient {
        /// Checkout attempts made
        attempts: usize,
        /// Last error observed
        last: PartnerError,
    },

    /// Partner response unreadable; reservation released
    #[error("Partner protocol error: {0}")]
    PartnerProtocol(PartnerError),

    /// Caller cancelled or deadline passed during checkout; reservation released
    #[error("Purchase cancelled: {0}")]
    Cancelled(String),

    /// Partner not configured
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Storage failure; a release was attempted before returning
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl PurchaseError {
    /// Stable classification of this failure
    #[must_use]
    pub const fn reason(&self) -> FailureReason {
        match self {
            Self::Validation(_) | Self::EventNotFound(_) => FailureReason::Validation,
            Self::Conflict { .. } => FailureReason::Conflict,
            Self::PartnerRejected(_) => FailureReason::PartnerRejected,
            Self::PartnerTransient { .. } => FailureReason::PartnerTransient,
            Self::PartnerProtocol(_) => FailureReason::ProtocolError,
            Self::Cancelled(_) => FailureReason::Cancelled,
            Self::Configuration(_) => FailureReason::Configuration,
            Self::Store(_) => FailureReason::InternalStoreError,
        }
    }

    /// Classifies a partner error that ended a checkout
    #[must_use]
    pub fn from_partner(error: PartnerError, attempts: usize) -> Self {
        match error.kind {
            PartnerErrorKind::Rejected => Self::PartnerRejected(error),
            PartnerErrorKind::Unavailable => Self::PartnerTransient {
                attempts,
                last: error,
            },
            PartnerErrorKind::ProtocolError => Self::PartnerProtocol(error),
        }
    }
}
