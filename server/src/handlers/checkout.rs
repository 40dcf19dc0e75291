//! `POST /checkout`: buy tickets for specific spots.

use crate::error::AppError;
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use boxoffice_core::{
    EventId, GatewayFactory, PurchaseReceipt, PurchaseRequest, ReservationToken, SpotStore,
    TicketId,
};
use boxoffice_runtime::CancelSignal;
use serde::Serialize;

/// Body of a successful checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Always `"sold"`
    pub status: &'static str,
    /// Event the tickets are for
    pub event_id: EventId,
    /// Reservation the sale went through
    pub reservation: ReservationToken,
    /// One ticket per requested spot
    pub ticket_ids: Vec<TicketId>,
    /// Partner-side reference
    pub partner_reference: String,
}

impl From<PurchaseReceipt> for CheckoutResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            status: "sold",
            event_id: receipt.event_id,
            reservation: receipt.reservation,
            ticket_ids: receipt.ticket_ids,
            partner_reference: receipt.partner_reference,
        }
    }
}

/// Run a purchase.
///
/// If the client goes away mid-checkout the handler future is dropped, which
/// drops the cancel handle and makes the orchestrator release the hold.
///
/// ```bash
/// curl -X POST http://localhost:8080/checkout \
///   -H "Content-Type: application/json" \
///   -d '{"event_id": "...", "partner_id": 1, "spot_ids": ["A1", "A2"],
///        "ticket_kind": "full", "purchaser": {"email": "ana@example.com"}}'
/// ```
///
/// # Errors
///
/// Returns the classified [`AppError`] for every failed purchase.
pub async fn checkout<S, F>(
    State(state): State<AppState<S, F>>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    let (_cancel, signal) = CancelSignal::new();
    let outcome = state.orchestrator.purchase_with_cancel(request, signal).await;
    tracing::debug!(phase = outcome.phase().as_str(), "Checkout finished");

    let receipt = outcome.result?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse::from(receipt))))
}
