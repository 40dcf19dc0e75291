//! Prometheus metric names and recorders for the purchase path.
//!
//! The recorders only talk to the `metrics` facade. The server installs the
//! Prometheus exporter; without one installed every call is a no-op, which is
//! what tests rely on.

use boxoffice_core::{PartnerError, PartnerId, PurchaseError, PurchaseReceipt};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Purchases by terminal outcome (`sold` or a failure reason)
pub const PURCHASES_TOTAL: &str = "boxoffice_purchases_total";
/// Tickets issued
pub const TICKETS_SOLD_TOTAL: &str = "boxoffice_tickets_sold_total";
/// Partner checkout calls by partner and result
pub const PARTNER_CHECKOUT_ATTEMPTS_TOTAL: &str = "boxoffice_partner_checkout_attempts_total";
/// Reservations returned to available, by reason
pub const RESERVATIONS_RELEASED_TOTAL: &str = "boxoffice_reservations_released_total";
/// End-to-end purchase latency
pub const PURCHASE_DURATION_SECONDS: &str = "boxoffice_purchase_duration_seconds";

/// Histogram buckets for [`PURCHASE_DURATION_SECONDS`].
pub const PURCHASE_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Register all metric descriptions. Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(PURCHASES_TOTAL, "Total purchases by terminal outcome");
    describe_counter!(TICKETS_SOLD_TOTAL, "Total tickets issued");
    describe_counter!(
        PARTNER_CHECKOUT_ATTEMPTS_TOTAL,
        "Total partner checkout calls by partner and result"
    );
    describe_counter!(
        RESERVATIONS_RELEASED_TOTAL,
        "Total reservations released by reason"
    );
    describe_histogram!(
        PURCHASE_DURATION_SECONDS,
        "Time from purchase request to terminal outcome"
    );
}

/// Purchase outcome recorder.
pub struct PurchaseMetrics;

impl PurchaseMetrics {
    /// Record a finished purchase.
    pub fn record(result: &Result<PurchaseReceipt, PurchaseError>, elapsed: Duration) {
        let outcome = match result {
            Ok(receipt) => {
                counter!(TICKETS_SOLD_TOTAL).increment(receipt.ticket_ids.len() as u64);
                "sold"
            }
            Err(error) => error.reason().as_str(),
        };
        counter!(PURCHASES_TOTAL, "outcome" => outcome).increment(1);
        histogram!(PURCHASE_DURATION_SECONDS).record(elapsed.as_secs_f64());
    }
}

/// Partner call recorder.
pub struct PartnerMetrics;

impl PartnerMetrics {
    /// Record one checkout call.
    pub fn record_attempt<T>(partner: PartnerId, result: &Result<T, PartnerError>) {
        let outcome = match result {
            Ok(_) => "confirmed",
            Err(error) => error.kind.as_str(),
        };
        counter!(
            PARTNER_CHECKOUT_ATTEMPTS_TOTAL,
            "partner" => partner.to_string(),
            "result" => outcome
        )
        .increment(1);
    }
}

/// Reservation release recorder.
pub struct ReservationMetrics;

impl ReservationMetrics {
    /// Record released reservations.
    pub fn record_released(reason: &'static str, count: usize) {
        counter!(RESERVATIONS_RELEASED_TOTAL, "reason" => reason).increment(count as u64);
    }
}
