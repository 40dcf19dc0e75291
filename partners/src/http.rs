//! Shared request/response handling for partner gateways.
//!
//! Both partners speak JSON over HTTP and fail the same way, so status and
//! transport classification live here. Only the wire types differ.

use boxoffice_core::{ConfigError, PartnerError, PartnerId, SpotId};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::time::Duration;

const BODY_SNIPPET_LEN: usize = 200;

/// Validated base URL without a trailing slash.
pub(crate) fn normalize_base_url(partner: PartnerId, base_url: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        partner,
        url: base_url.to_string(),
        reason,
    };
    let url = Url::parse(base_url).map_err(|error| invalid(error.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// HTTP client with the endpoint's timeout.
pub(crate) fn build_client(partner: PartnerId, timeout: Duration) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| {
            ConfigError::Invalid(format!("HTTP client for partner {partner}: {error}"))
        })
}

/// Classify a non-success status.
pub(crate) fn classify_status(partner: PartnerId, status: StatusCode, body: &str) -> PartnerError {
    let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
    let message = format!("HTTP {}: {snippet}", status.as_u16());
    match status.as_u16() {
        400 | 404 | 409 | 422 => PartnerError::rejected(partner, message),
        408 | 429 | 500..=599 => PartnerError::unavailable(partner, message),
        _ => PartnerError::protocol(partner, message),
    }
}

/// Classify a transport failure (no usable response).
pub(crate) fn classify_transport(partner: PartnerId, error: &reqwest::Error) -> PartnerError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        PartnerError::unavailable(partner, error.to_string())
    } else {
        PartnerError::protocol(partner, error.to_string())
    }
}

/// The partner must confirm exactly the requested spots.
pub(crate) fn check_spots<'a>(
    partner: PartnerId,
    requested: &[SpotId],
    confirmed: impl IntoIterator<Item = &'a str>,
) -> Result<(), PartnerError> {
    let requested: BTreeSet<&str> = requested.iter().map(SpotId::as_str).collect();
    let confirmed: Vec<&str> = confirmed.into_iter().collect();
    let confirmed_set: BTreeSet<&str> = confirmed.iter().copied().collect();
    if confirmed.len() != confirmed_set.len() || confirmed_set != requested {
        return Err(PartnerError::protocol(
            partner,
            format!(
                "partner confirmed spots [{}] but [{}] were requested",
                confirmed.join(", "),
                requested.into_iter().collect::<Vec<_>>().join(", ")
            ),
        ));
    }
    Ok(())
}

/// POST `body` as JSON and decode a 2xx JSON response.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    partner: PartnerId,
    url: &str,
    body: &B,
) -> Result<R, PartnerError>
where
    B: Serialize + Sync,
    R: DeserializeOwned,
{
    tracing::debug!(partner = %partner, url, "Calling partner");
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|error| classify_transport(partner, &error))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|error| classify_transport(partner, &error))?;

    if !status.is_success() {
        return Err(classify_status(partner, status, &text));
    }

    serde_json::from_str(&text).map_err(|error| {
        PartnerError::protocol(partner, format!("unreadable response body: {error}"))
    })
}
