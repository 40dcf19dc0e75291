//! Purchase orchestrator.
//!
//! Coordinates the store and the partner gateways for one purchase:
//!
//! 1. **Validate** the request against the event. Nothing is touched on failure.
//! 2. **Reserve** the spots. Losing the race is a conflict.
//! 3. **Checkout** with the event's partner, retrying transient failures.
//! 4. **Confirm** the reservation, issuing one ticket per spot.
//!
//! Any failure between reserve and confirm releases the reservation. Steps
//! 2-4 run on a spawned task so dropping the caller's future cannot skip the
//! release; the caller's [`CancelSignal`] is honoured instead.

use crate::cancel::CancelSignal;
use crate::metrics::{PartnerMetrics, PurchaseMetrics, ReservationMetrics};
use crate::retry::{RetryError, RetryPolicy, retry_with_backoff, retry_with_predicate};
use boxoffice_core::{
    CheckoutRequest, FailureReason, GatewayFactory, PartnerConfirmation, PartnerError,
    PartnerGateway, PurchaseError, PurchasePhase, PurchaseReceipt, PurchaseRequest, PurchaseSaga,
    PurchaseStep, ReservationToken, SpotId, SpotStore, StoreError,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Retry policy for partner checkout
    pub checkout_retry: RetryPolicy,
    /// Upper bound on the whole checkout step, retries included
    pub checkout_deadline: Duration,
    /// Maximum spots in one request
    pub max_spots: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            checkout_retry: RetryPolicy::builder()
                .max_retries(2)
                .initial_delay(Duration::from_millis(200))
                .build(),
            checkout_deadline: Duration::from_secs(30),
            max_spots: 10,
        }
    }
}

/// Terminal outcome of a purchase together with the state machine that
/// produced it.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// Receipt or classified failure
    pub result: Result<PurchaseReceipt, PurchaseError>,
    /// Recorded transitions
    pub saga: PurchaseSaga,
}

/// Runs purchases against a store and a set of partner gateways.
pub struct PurchaseOrchestrator<S, F> {
    store: Arc<S>,
    factory: Arc<F>,
    config: Arc<OrchestratorConfig>,
}

impl<S, F> Clone for PurchaseOrchestrator<S, F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            factory: Arc::clone(&self.factory),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, F> PurchaseOrchestrator<S, F>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(store: Arc<S>, factory: Arc<F>, config: OrchestratorConfig) -> Self {
        Self {
            store,
            factory,
            config: Arc::new(config),
        }
    }

    /// Settings in use.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a purchase that cannot be cancelled by the caller.
    ///
    /// # Errors
    ///
    /// Returns the classified [`PurchaseError`]; by the time it is returned
    /// any reservation taken has been released (or handed to the sweeper if
    /// the store was unreachable).
    pub async fn purchase(&self, request: PurchaseRequest) -> Result<PurchaseReceipt, PurchaseError> {
        self.purchase_with_cancel(request, CancelSignal::never())
            .await
            .result
    }

    /// Run a purchase, releasing the hold if `cancel` fires during checkout.
    #[tracing::instrument(
        name = "purchase",
        skip_all,
        fields(
            event_id = %request.event_id,
            partner = %request.partner_id,
            spots = request.spot_ids.len(),
        )
    )]
    pub async fn purchase_with_cancel(
        &self,
        request: PurchaseRequest,
        cancel: CancelSignal,
    ) -> PurchaseOutcome {
        let started = Instant::now();
        let mut saga = PurchaseSaga::new();

        let outcome = match self.validate(&request).await {
            Err(error) => {
                tracing::info!(error = %error, "Purchase rejected during validation");
                advance(&mut saga, PurchaseStep::Reject(error.reason()));
                PurchaseOutcome {
                    result: Err(error),
                    saga,
                }
            }
            Ok(()) => {
                let run = PurchaseRun {
                    store: Arc::clone(&self.store),
                    factory: Arc::clone(&self.factory),
                    config: Arc::clone(&self.config),
                    request,
                    saga,
                    cancel,
                };
                let fallback = run.saga.clone();
                match tokio::spawn(run.execute()).await {
                    Ok(outcome) => outcome,
                    Err(join_error) => {
                        tracing::error!(error = %join_error, "Purchase task failed");
                        PurchaseOutcome {
                            result: Err(PurchaseError::Store(StoreError::Database(format!(
                                "purchase task failed: {join_error}"
                            )))),
                            saga: fallback,
                        }
                    }
                }
            }
        };

        PurchaseMetrics::record(&outcome.result, started.elapsed());
        outcome
    }

    async fn validate(&self, request: &PurchaseRequest) -> Result<(), PurchaseError> {
        if request.spot_ids.is_empty() {
            return Err(PurchaseError::Validation(
                "at least one spot must be requested".to_string(),
            ));
        }
        if request.spot_ids.len() > self.config.max_spots {
            return Err(PurchaseError::Validation(format!(
                "at most {} spots may be bought at once, {} requested",
                self.config.max_spots,
                request.spot_ids.len()
            )));
        }

        let mut seen = HashSet::with_capacity(request.spot_ids.len());
        for spot_id in &request.spot_ids {
            spot_id.validate().map_err(PurchaseError::Validation)?;
            if !seen.insert(spot_id) {
                return Err(PurchaseError::Validation(format!(
                    "spot {spot_id} requested more than once"
                )));
            }
        }
        request
            .purchaser
            .validate()
            .map_err(PurchaseError::Validation)?;

        let event = self
            .store
            .get_event(request.event_id)
            .await
            .map_err(|error| match error {
                StoreError::EventNotFound(id) => PurchaseError::EventNotFound(id),
                other => PurchaseError::Store(other),
            })?;

        if event.partner_id != request.partner_id {
            return Err(PurchaseError::Validation(format!(
                "event {} is sold by partner {}, not partner {}",
                event.id, event.partner_id, request.partner_id
            )));
        }

        let unknown: Vec<&SpotId> = request
            .spot_ids
            .iter()
            .filter(|spot_id| event.find_spot(spot_id).is_none())
            .collect();
        if !unknown.is_empty() {
            let names: Vec<&str> = unknown.iter().map(|spot| spot.as_str()).collect();
            return Err(PurchaseError::Validation(format!(
                "event {} has no spots {}",
                event.id,
                names.join(", ")
            )));
        }

        // Resolve now so a missing partner never touches spot state
        self.factory.gateway(event.partner_id)?;
        Ok(())
    }
}

fn advance(saga: &mut PurchaseSaga, step: PurchaseStep) {
    let from = saga.phase();
    match saga.apply(step) {
        Ok(to) => tracing::debug!(from = %from, to = %to, "Purchase transition"),
        Err(error) => tracing::error!(error = %error, "Refused purchase transition"),
    }
}

fn release_policy() -> RetryPolicy {
    RetryPolicy::builder()
        .max_retries(2)
        .initial_delay(Duration::from_millis(50))
        .build()
}

enum CheckoutOutcome {
    Finished(Result<PartnerConfirmation, PurchaseError>),
    Interrupted(String),
}

/// Owned state of one purchase after validation.
struct PurchaseRun<S, F> {
    store: Arc<S>,
    factory: Arc<F>,
    config: Arc<OrchestratorConfig>,
    request: PurchaseRequest,
    saga: PurchaseSaga,
    cancel: CancelSignal,
}

impl<S, F> PurchaseRun<S, F>
where
    S: SpotStore,
    F: GatewayFactory,
{
    async fn execute(mut self) -> PurchaseOutcome {
        let result = self.reserve_and_sell().await;
        PurchaseOutcome {
            result,
            saga: self.saga,
        }
    }

    async fn reserve_and_sell(&mut self) -> Result<PurchaseReceipt, PurchaseError> {
        let reservation = match self
            .store
            .reserve_spots(self.request.event_id, &self.request.spot_ids)
            .await
        {
            Ok(reservation) => reservation,
            Err(StoreError::SpotsUnavailable { spots }) => {
                tracing::info!(spots = spots.len(), "Spots already taken");
                advance(&mut self.saga, PurchaseStep::Reject(FailureReason::Conflict));
                return Err(PurchaseError::Conflict { spots });
            }
            Err(error) => {
                advance(
                    &mut self.saga,
                    PurchaseStep::Reject(FailureReason::InternalStoreError),
                );
                return Err(PurchaseError::Store(error));
            }
        };
        let token = reservation.token;
        advance(&mut self.saga, PurchaseStep::Reserve(token));
        tracing::info!(reservation = %token, "Spots reserved");

        let deadline = self.config.checkout_deadline;
        let mut cancel = self.cancel.clone();
        let outcome = tokio::select! {
            result = self.checkout() => CheckoutOutcome::Finished(result),
            () = cancel.cancelled() => {
                CheckoutOutcome::Interrupted("purchase cancelled by caller".to_string())
            }
            () = tokio::time::sleep(deadline) => CheckoutOutcome::Interrupted(format!(
                "checkout did not finish within {}ms",
                deadline.as_millis()
            )),
        };

        match outcome {
            CheckoutOutcome::Finished(Ok(confirmation)) => {
                advance(&mut self.saga, PurchaseStep::BeginConfirm);
                self.confirm(token, confirmation).await
            }
            CheckoutOutcome::Finished(Err(error)) => {
                let reason = error.reason();
                tracing::warn!(reservation = %token, error = %error, "Checkout failed");
                self.release(token, reason.as_str()).await;
                let step = if reason == FailureReason::PartnerTransient {
                    PurchaseStep::ReleaseOnTimeout(reason)
                } else {
                    PurchaseStep::Release(reason)
                };
                advance(&mut self.saga, step);
                Err(error)
            }
            CheckoutOutcome::Interrupted(message) => {
                tracing::warn!(reservation = %token, reason = %message, "Checkout interrupted");
                self.release(token, FailureReason::Cancelled.as_str()).await;
                advance(
                    &mut self.saga,
                    PurchaseStep::ReleaseOnTimeout(FailureReason::Cancelled),
                );
                Err(PurchaseError::Cancelled(message))
            }
        }
    }

    async fn checkout(&self) -> Result<PartnerConfirmation, PurchaseError> {
        let gateway = self.factory.gateway(self.request.partner_id)?;
        let partner = gateway.partner_id();
        let request = CheckoutRequest {
            event_id: self.request.event_id,
            spot_ids: self.request.spot_ids.clone(),
            ticket_kind: self.request.ticket_kind,
            purchaser: self.request.purchaser.clone(),
        };

        let request = &request;
        retry_with_predicate(
            &self.config.checkout_retry,
            move || async move {
                let result = gateway.checkout(request).await;
                PartnerMetrics::record_attempt(partner, &result);
                result
            },
            PartnerError::is_transient,
        )
        .await
        .map_err(|RetryError { attempts, error }| PurchaseError::from_partner(error, attempts))
    }

    async fn confirm(
        &mut self,
        token: ReservationToken,
        confirmation: PartnerConfirmation,
    ) -> Result<PurchaseReceipt, PurchaseError> {
        let purchaser = &self.request.purchaser;
        let kind = self.request.ticket_kind;

        let mut confirmed = self.store.confirm_reservation(token, purchaser, kind).await;
        if let Err(error) = &confirmed {
            tracing::warn!(reservation = %token, error = %error, "Confirm failed, retrying once");
            confirmed = self.store.confirm_reservation(token, purchaser, kind).await;
        }

        match confirmed {
            Ok(ticket_ids) => {
                advance(&mut self.saga, PurchaseStep::Sell(ticket_ids.clone()));
                tracing::info!(
                    reservation = %token,
                    tickets = ticket_ids.len(),
                    partner_reference = %confirmation.reference,
                    payment_reference = purchaser.payment_reference.as_deref(),
                    "Purchase sold"
                );
                Ok(PurchaseReceipt {
                    event_id: self.request.event_id,
                    reservation: token,
                    ticket_ids,
                    partner_reference: confirmation.reference,
                })
            }
            Err(error) => {
                tracing::error!(
                    reservation = %token,
                    partner_reference = %confirmation.reference,
                    error = %error,
                    "Partner sold the spots but local confirmation failed"
                );
                self.release(token, FailureReason::InternalStoreError.as_str())
                    .await;
                advance(
                    &mut self.saga,
                    PurchaseStep::Release(FailureReason::InternalStoreError),
                );
                Err(PurchaseError::Store(error))
            }
        }
    }

    /// Best effort; a hold that cannot be released is left for the sweeper.
    async fn release(&self, token: ReservationToken, reason: &'static str) {
        let store = &self.store;
        match retry_with_backoff(&release_policy(), move || store.release_reservation(token)).await
        {
            Ok(outcome) => {
                tracing::info!(reservation = %token, outcome = ?outcome, reason, "Reservation released");
                ReservationMetrics::record_released(reason, 1);
            }
            Err(error) => {
                tracing::error!(
                    reservation = %token,
                    error = %error,
                    "Could not release reservation, leaving it to the sweeper"
                );
            }
        }
    }
}

impl PurchaseOutcome {
    /// Final phase of the purchase.
    #[must_use]
    pub const fn phase(&self) -> PurchasePhase {
        self.saga.phase()
    }
}
