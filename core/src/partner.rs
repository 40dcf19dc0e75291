//! Partner checkout capability.
//!
//! Each partner service speaks its own protocol. Gateways hide that behind
//! [`PartnerGateway::checkout`] and report failures as a [`PartnerError`]
//! whose kind drives retry and release decisions.

use crate::error::{ConfigError, PartnerError};
use crate::types::{EventId, PartnerId, PurchaserInfo, SpotId, TicketKind};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// What a partner is asked to sell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Event the spots belong to
    pub event_id: EventId,
    /// Spots to sell
    pub spot_ids: Vec<SpotId>,
    /// Full or half price
    pub ticket_kind: TicketKind,
    /// Buyer
    pub purchaser: PurchaserInfo,
}

/// One spot the partner confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerTicket {
    /// Partner-side ticket identifier
    pub external_id: String,
    /// Spot the partner sold
    pub spot_id: SpotId,
}

/// Successful partner checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerConfirmation {
    /// Partner that confirmed
    pub partner: PartnerId,
    /// Partner-side reference for the whole sale
    pub reference: String,
    /// Confirmed spots
    pub tickets: Vec<PartnerTicket>,
}

/// Partner checkout capability.
///
/// Implementations hold no mutable shared state beyond their HTTP connection
/// pool.
pub trait PartnerGateway: Send + Sync {
    /// Partner this gateway talks to
    fn partner_id(&self) -> PartnerId;

    /// Ask the partner to sell the requested spots.
    ///
    /// # Errors
    ///
    /// - `Rejected`: partner declined (spots taken on its side, payment
    ///   refused); permanent
    /// - `Unavailable`: unreachable or timed out; may be retried
    /// - `ProtocolError`: response could not be interpreted; permanent
    fn checkout(
        &self,
        request: &CheckoutRequest,
    ) -> impl Future<Output = Result<PartnerConfirmation, PartnerError>> + Send;
}

/// Maps partner identifiers to constructed gateways.
///
/// Built once at startup; lookups never fall back to a different partner.
pub trait GatewayFactory: Send + Sync {
    /// Gateway type produced by this factory
    type Gateway: PartnerGateway;

    /// Gateway for `partner`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPartner`] if no gateway is configured.
    fn gateway(&self, partner: PartnerId) -> Result<&Self::Gateway, ConfigError>;
}
