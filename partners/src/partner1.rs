//! Partner 1: English JSON API.
//!
//! `POST {base}/events/{event_id}/reserve`

use crate::config::PartnerEndpoint;
use crate::http;
use boxoffice_core::{
    CheckoutRequest, ConfigError, PartnerConfirmation, PartnerError, PartnerGateway, PartnerId,
    PartnerTicket, SpotId, TicketKind,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ReserveRequest<'a> {
    spots: Vec<&'a str>,
    ticket_kind: &'static str,
    email: &'a str,
}

/// One entry of the response array. The partner also echoes `email`,
/// `ticket_kind`, `status` and `event_id`; those are ignored.
#[derive(Debug, Deserialize)]
struct ReservedTicket {
    id: String,
    spot: String,
}

const fn wire_kind(kind: TicketKind) -> &'static str {
    match kind {
        TicketKind::Full => "full",
        TicketKind::Half => "half",
    }
}

/// Gateway for partner 1.
#[derive(Debug, Clone)]
pub struct Partner1Gateway {
    partner: PartnerId,
    base_url: String,
    client: Client,
}

impl Partner1Gateway {
    /// Build the gateway for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for a malformed base URL.
    pub fn new(partner: PartnerId, endpoint: &PartnerEndpoint) -> Result<Self, ConfigError> {
        Ok(Self {
            partner,
            base_url: http::normalize_base_url(partner, &endpoint.base_url)?,
            client: http::build_client(partner, endpoint.timeout)?,
        })
    }

    /// Normalized base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PartnerGateway for Partner1Gateway {
    fn partner_id(&self) -> PartnerId {
        self.partner
    }

    async fn checkout(&self, request: &CheckoutRequest) -> Result<PartnerConfirmation, PartnerError> {
        let url = format!("{}/events/{}/reserve", self.base_url, request.event_id);
        let body = ReserveRequest {
            spots: request.spot_ids.iter().map(SpotId::as_str).collect(),
            ticket_kind: wire_kind(request.ticket_kind),
            email: &request.purchaser.email,
        };

        let tickets: Vec<ReservedTicket> =
            http::post_json(&self.client, self.partner, &url, &body).await?;
        http::check_spots(
            self.partner,
            &request.spot_ids,
            tickets.iter().map(|ticket| ticket.spot.as_str()),
        )?;

        let reference = tickets
            .iter()
            .map(|ticket| ticket.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        Ok(PartnerConfirmation {
            partner: self.partner,
            reference,
            tickets: tickets
                .into_iter()
                .map(|ticket| PartnerTicket {
                    external_id: ticket.id,
                    spot_id: SpotId::new(ticket.spot),
                })
                .collect(),
        })
    }
}
