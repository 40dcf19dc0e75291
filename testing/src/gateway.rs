//! Scripted partner gateways.

use boxoffice_core::{
    CheckoutRequest, ConfigError, GatewayFactory, PartnerConfirmation, PartnerError,
    PartnerErrorKind, PartnerGateway, PartnerId, PartnerTicket,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// What the mock answers to one checkout call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Confirm every requested spot
    Confirm,
    /// Fail with this kind
    Fail(PartnerErrorKind),
}

/// Partner gateway answering from a queue of scripted responses.
///
/// Once the queue is empty every call confirms. Clones share the queue and
/// the call log.
#[derive(Debug, Clone)]
pub struct MockPartnerGateway {
    partner: PartnerId,
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<CheckoutRequest>>>,
    delay: Option<Duration>,
}

impl MockPartnerGateway {
    /// Gateway for `partner` that confirms everything
    #[must_use]
    pub fn new(partner: PartnerId) -> Self {
        Self {
            partner,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Sleep this long before answering each call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue the answer for the next unanswered call
    pub fn push_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Queue the same failure `times` times
    pub fn fail_times(&self, kind: PartnerErrorKind, times: usize) {
        for _ in 0..times {
            self.push_response(MockResponse::Fail(kind));
        }
    }

    /// Checkout calls received so far
    #[must_use]
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of checkout calls received so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests().len()
    }
}

impl PartnerGateway for MockPartnerGateway {
    fn partner_id(&self) -> PartnerId {
        self.partner
    }

    async fn checkout(&self, request: &CheckoutRequest) -> Result<PartnerConfirmation, PartnerError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MockResponse::Confirm);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            MockResponse::Confirm => Ok(PartnerConfirmation {
                partner: self.partner,
                reference: format!("mock-{}", request.event_id),
                tickets: request
                    .spot_ids
                    .iter()
                    .enumerate()
                    .map(|(index, spot_id)| PartnerTicket {
                        external_id: format!("mock-ticket-{index}"),
                        spot_id: spot_id.clone(),
                    })
                    .collect(),
            }),
            MockResponse::Fail(kind) => Err(PartnerError {
                partner: self.partner,
                kind,
                message: format!("scripted {kind}"),
            }),
        }
    }
}

/// Factory over a fixed set of mock gateways.
#[derive(Debug, Clone, Default)]
pub struct MockGatewayFactory {
    gateways: HashMap<PartnerId, MockPartnerGateway>,
}

impl MockGatewayFactory {
    /// Factory with no partners configured
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gateway (replacing any for the same partner)
    #[must_use]
    pub fn with_gateway(mut self, gateway: MockPartnerGateway) -> Self {
        self.gateways.insert(gateway.partner_id(), gateway);
        self
    }

    /// Add a confirming gateway for `partner`
    #[must_use]
    pub fn with_partner(self, partner: PartnerId) -> Self {
        self.with_gateway(MockPartnerGateway::new(partner))
    }

    /// The gateway for `partner`, sharing its script and call log
    #[must_use]
    pub fn mock(&self, partner: PartnerId) -> Option<MockPartnerGateway> {
        self.gateways.get(&partner).cloned()
    }
}

impl GatewayFactory for MockGatewayFactory {
    type Gateway = MockPartnerGateway;

    fn gateway(&self, partner: PartnerId) -> Result<&MockPartnerGateway, ConfigError> {
        self.gateways
            .get(&partner)
            .ok_or(ConfigError::UnknownPartner(partner))
    }
}
