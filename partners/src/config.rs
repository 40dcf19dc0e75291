//! Partner endpoint configuration.

use boxoffice_core::{ConfigError, PartnerId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-request timeout for partner calls
pub const DEFAULT_PARTNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how to reach one partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerEndpoint {
    /// Base URL; routes are appended to it
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl PartnerEndpoint {
    /// Endpoint with the default timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_PARTNER_TIMEOUT,
        }
    }
}

/// Partner id to endpoint map, the only input of
/// [`PartnerFactory::from_config`](crate::PartnerFactory::from_config).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnersConfig {
    /// Configured partners
    pub endpoints: BTreeMap<PartnerId, PartnerEndpoint>,
}

impl Default for PartnersConfig {
    /// The two partner simulators on `localhost:9000`.
    fn default() -> Self {
        Self {
            endpoints: BTreeMap::from([
                (
                    PartnerId::new(1),
                    PartnerEndpoint::new("http://localhost:9000/api1"),
                ),
                (
                    PartnerId::new(2),
                    PartnerEndpoint::new("http://localhost:9000/api2"),
                ),
            ]),
        }
    }
}

impl PartnersConfig {
    /// Parse `1=http://host/a,2=http://host/b`, applying `timeout` to each.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an entry without `=`, a
    /// non-numeric or repeated partner id, or an empty list.
    pub fn parse_base_urls(raw: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let mut endpoints = BTreeMap::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let (id, url) = entry.split_once('=').ok_or_else(|| {
                ConfigError::Invalid(format!("partner entry {entry:?} must look like ID=URL"))
            })?;
            let id: u32 = id.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("partner id {:?} is not a number", id.trim()))
            })?;
            let endpoint = PartnerEndpoint {
                base_url: url.trim().to_string(),
                timeout,
            };
            if endpoints.insert(PartnerId::new(id), endpoint).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "partner {id} is configured twice"
                )));
            }
        }
        if endpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one partner must be configured".to_string(),
            ));
        }
        Ok(Self { endpoints })
    }
}
