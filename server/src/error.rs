//! HTTP error responses.
//!
//! Every domain error is classified into an [`AppError`] with a status and a
//! stable machine-readable code, and rendered as
//! `{"code": "...", "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use boxoffice_core::{PurchaseError, StoreError};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    /// Internal error, logged but never sent to the client
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 422 Unprocessable Entity.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    /// 408 Request Timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "TIMEOUT", message)
    }

    /// 502 Bad Gateway, for upstream partner misbehaviour.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "PARTNER_PROTOCOL_ERROR", message)
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "PARTNER_UNAVAILABLE", message)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        let message = error.to_string();
        match error {
            StoreError::EventNotFound(id) => Self::not_found("Event", id),
            StoreError::ReservationNotFound(token) => Self::not_found("Reservation", token),
            StoreError::DuplicateEvent(_)
            | StoreError::SpotsUnavailable { .. }
            | StoreError::ReservationReleased(_) => Self::conflict(message),
            StoreError::InvalidEvent(_) => Self::validation(message),
            StoreError::Database(_) => {
                Self::internal("An internal error occurred").with_source(error)
            }
        }
    }
}

impl From<PurchaseError> for AppError {
    fn from(error: PurchaseError) -> Self {
        let message = error.to_string();
        match error {
            PurchaseError::Validation(_) => Self::validation(message),
            PurchaseError::EventNotFound(id) => Self::not_found("Event", id),
            PurchaseError::Conflict { .. } => Self::conflict(message),
            PurchaseError::PartnerRejected(_) => {
                Self::new(StatusCode::CONFLICT, "PARTNER_REJECTED", message)
            }
            PurchaseError::PartnerTransient { .. } => Self::unavailable(message),
            PurchaseError::PartnerProtocol(_) => Self::bad_gateway(message),
            PurchaseError::Cancelled(_) => Self::timeout(message),
            PurchaseError::Configuration(source) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                "Partner is not configured",
            )
            .with_source(source),
            PurchaseError::Store(source) => {
                Self::internal("An internal error occurred").with_source(source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::{
        ConfigError, EventId, PartnerError, PartnerErrorKind, PartnerId, SpotId,
    };

    fn partner_error(kind: PartnerErrorKind) -> PartnerError {
        PartnerError {
            partner: PartnerId::new(1),
            kind,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn error_display() {
        let err = AppError::validation("Email is required");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] Email is required");
    }

    #[test]
    fn purchase_errors_map_to_statuses() {
        let cases = [
            (PurchaseError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (PurchaseError::EventNotFound(EventId::new()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                PurchaseError::Conflict { spots: vec![SpotId::new("A1")] },
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                PurchaseError::PartnerRejected(partner_error(PartnerErrorKind::Rejected)),
                StatusCode::CONFLICT,
                "PARTNER_REJECTED",
            ),
            (
                PurchaseError::PartnerTransient {
                    attempts: 3,
                    last: partner_error(PartnerErrorKind::Unavailable),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "PARTNER_UNAVAILABLE",
            ),
            (
                PurchaseError::PartnerProtocol(partner_error(PartnerErrorKind::ProtocolError)),
                StatusCode::BAD_GATEWAY,
                "PARTNER_PROTOCOL_ERROR",
            ),
            (PurchaseError::Cancelled("deadline".into()), StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            (
                PurchaseError::Configuration(ConfigError::UnknownPartner(PartnerId::new(7))),
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
            ),
            (
                PurchaseError::Store(StoreError::Database("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
            ),
        ];

        for (error, status, code) in cases {
            let app = AppError::from(error);
            assert_eq!((app.status(), app.code()), (status, code));
        }
    }

    #[test]
    fn internal_details_stay_out_of_the_message() {
        let err = AppError::from(StoreError::Database("password=hunter2".into()));
        assert!(!err.to_string().contains("hunter2"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
