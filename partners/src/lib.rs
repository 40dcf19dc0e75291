//! # Box Office Partners
//!
//! HTTP implementations of [`boxoffice_core::PartnerGateway`] for the two
//! ticket partners, and the [`PartnerFactory`] that selects one per event.
//!
//! Every failure is classified on the way out:
//!
//! | Response                                   | Kind            |
//! |--------------------------------------------|-----------------|
//! | 2xx, body names exactly the requested spots| confirmation    |
//! | 400, 404, 409, 422                         | `Rejected`      |
//! | 408, 429, 5xx, connect error, timeout      | `Unavailable`   |
//! | anything else, unreadable or wrong spots   | `ProtocolError` |
//!
//! ## Example
//!
//! ```no_run
//! use boxoffice_partners::{PartnerFactory, PartnersConfig};
//!
//! let factory = PartnerFactory::from_config(&PartnersConfig::default())?;
//! # Ok::<(), boxoffice_core::ConfigError>(())
//! ```

pub mod config;
pub mod factory;
mod http;
pub mod partner1;
pub mod partner2;

pub use config::{DEFAULT_PARTNER_TIMEOUT, PartnerEndpoint, PartnersConfig};
pub use factory::{HttpPartnerGateway, PartnerFactory};
pub use partner1::Partner1Gateway;
pub use partner2::Partner2Gateway;
