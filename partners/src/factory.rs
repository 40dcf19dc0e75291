//! Partner id to gateway mapping.

use crate::config::PartnersConfig;
use crate::partner1::Partner1Gateway;
use crate::partner2::Partner2Gateway;
use boxoffice_core::{
    CheckoutRequest, ConfigError, GatewayFactory, PartnerConfirmation, PartnerError,
    PartnerGateway, PartnerId,
};
use std::collections::HashMap;

/// Any of the supported partner gateways.
#[derive(Debug, Clone)]
pub enum HttpPartnerGateway {
    /// Partner 1 (English API)
    Partner1(Partner1Gateway),
    /// Partner 2 (Portuguese API)
    Partner2(Partner2Gateway),
}

impl PartnerGateway for HttpPartnerGateway {
    fn partner_id(&self) -> PartnerId {
        match self {
            Self::Partner1(gateway) => gateway.partner_id(),
            Self::Partner2(gateway) => gateway.partner_id(),
        }
    }

    async fn checkout(&self, request: &CheckoutRequest) -> Result<PartnerConfirmation, PartnerError> {
        match self {
            Self::Partner1(gateway) => gateway.checkout(request).await,
            Self::Partner2(gateway) => gateway.checkout(request).await,
        }
    }
}

/// Gateways built once at startup.
#[derive(Debug, Clone, Default)]
pub struct PartnerFactory {
    gateways: HashMap<PartnerId, HttpPartnerGateway>,
}

impl PartnerFactory {
    /// Build one gateway per configured partner.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnsupportedPartner`] for an id with no implementation
    /// - [`ConfigError::InvalidBaseUrl`] for a malformed base URL
    pub fn from_config(config: &PartnersConfig) -> Result<Self, ConfigError> {
        let mut gateways = HashMap::with_capacity(config.endpoints.len());
        for (&partner, endpoint) in &config.endpoints {
            let gateway = match partner.value() {
                1 => HttpPartnerGateway::Partner1(Partner1Gateway::new(partner, endpoint)?),
                2 => HttpPartnerGateway::Partner2(Partner2Gateway::new(partner, endpoint)?),
                _ => return Err(ConfigError::UnsupportedPartner(partner)),
            };
            tracing::info!(
                partner = %partner,
                base_url = %endpoint.base_url,
                timeout_ms = u64::try_from(endpoint.timeout.as_millis()).unwrap_or(u64::MAX),
                "Partner gateway configured"
            );
            gateways.insert(partner, gateway);
        }
        Ok(Self { gateways })
    }

    /// Configured partner ids, ascending
    #[must_use]
    pub fn partners(&self) -> Vec<PartnerId> {
        let mut partners: Vec<PartnerId> = self.gateways.keys().copied().collect();
        partners.sort_unstable();
        partners
    }
}

impl GatewayFactory for PartnerFactory {
    type Gateway = HttpPartnerGateway;

    fn gateway(&self, partner: PartnerId) -> Result<&HttpPartnerGateway, ConfigError> {
        self.gateways
            .get(&partner)
            .ok_or(ConfigError::UnknownPartner(partner))
    }
}
