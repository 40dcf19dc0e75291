//! Partner 2: Portuguese JSON API.
//!
//! `POST {base}/eventos/{event_id}/reservar`

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
    #[serde(rename = "lugares")]
    spots: Vec<&'a str>,
    #[serde(rename = "tipo_ingresso")]
    ticket_kind: &'static str,
    email: &'a str,
}

/// One entry of the response array. `email`, `tipo_ingresso`, `estado` and
/// `evento_id` are echoed back and ignored.
#[derive(Debug, Deserialize)]
struct ReservedTicket {
    id: serde_json::Value,
    #[serde(rename = "lugar")]
    spot: String,
}

const fn wire_kind(kind: TicketKind) -> &'static str {
    match kind {
        TicketKind::Full => "inteira",
        TicketKind::Half => "meia",
    }
}

fn external_id(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(id) => id.clone(),
        other => other.to_string(),
    }
}

/// Gateway for partner 2.
#[derive(Debug, Clone)]
pub struct Partner2Gateway {
    partner: PartnerId,
    base_url: String,
    client: Client,
}

impl Partner2Gateway {
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

impl PartnerGateway for Partner2Gateway {
    fn partner_id(&self) -> PartnerId {
        self.partner
    }

    async fn checkout(&self, request: &CheckoutRequest) -> Result<PartnerConfirmation, PartnerError> {
        let url = format!("{}/eventos/{}/reservar", self.base_url, request.event_id);
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

        let tickets: Vec<PartnerTicket> = tickets
            .into_iter()
            .map(|ticket| PartnerTicket {
                external_id: external_id(&ticket.id),
                spot_id: SpotId::new(ticket.spot),
            })
            .collect();
        Ok(PartnerConfirmation {
            partner: self.partner,
            reference: tickets
                .iter()
                .map(|ticket| ticket.external_id.as_str())
                .collect::<Vec<_>>()
                .join(","),
            tickets,
        })
    }
}
