//! Purchase state machine.
//!
//! A [`PurchaseSaga`] records how one purchase moves through its phases.
//! It does no I/O: the orchestrator performs each store or partner call and
//! then applies the matching [`PurchaseStep`]. Illegal steps are refused, so a
//! purchase can never, say, confirm after it released its spots.
//!
//! ```text
//! Validating ──Reserve──► Reserved ──BeginConfirm──► Confirming ──Sell──► Sold
//!     │                      │  │                        │
//!   Reject          Release  │  │ ReleaseOnTimeout       │ Release
//!     ▼                      ▼  ▼                        ▼
//!  Rejected   ReleasedOnFailure  ReleasedOnTimeout   ReleasedOnFailure
//! ```

use crate::error::FailureReason;
use crate::types::{ReservationToken, TicketId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Phase of a single purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchasePhase {
    /// Checking the request against the event
    Validating,
    /// Spots are held; partner checkout in progress
    Reserved,
    /// Partner confirmed; tickets being issued locally
    Confirming,
    /// Tickets issued (terminal)
    Sold,
    /// Request refused before anything was held (terminal)
    Rejected,
    /// Hold released after a permanent failure (terminal)
    ReleasedOnFailure,
    /// Hold released after retries ran out, cancellation or deadline (terminal)
    ReleasedOnTimeout,
}

impl PurchasePhase {
    /// Whether no further step is accepted
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Sold | Self::Rejected | Self::ReleasedOnFailure | Self::ReleasedOnTimeout
        )
    }

    /// Metric/log label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Reserved => "reserved",
            Self::Confirming => "confirming",
            Self::Sold => "sold",
            Self::Rejected => "rejected",
            Self::ReleasedOnFailure => "released_on_failure",
            Self::ReleasedOnTimeout => "released_on_timeout",
        }
    }
}

impl fmt::Display for PurchasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseStep {
    /// Store granted the hold
    Reserve(ReservationToken),
    /// Request refused (validation or conflict)
    Reject(FailureReason),
    /// Partner checkout succeeded
    BeginConfirm,
    /// Store issued the tickets
    Sell(Vec<TicketId>),
    /// Hold released after a permanent failure
    Release(FailureReason),
    /// Hold released after transient failures, cancellation or deadline
    ReleaseOnTimeout(FailureReason),
}

impl PurchaseStep {
    const fn name(&self) -> &'static str {
        match self {
            Self::Reserve(_) => "reserve",
            Self::Reject(_) => "reject",
            Self::BeginConfirm => "begin_confirm",
            Self::Sell(_) => "sell",
            Self::Release(_) => "release",
            Self::ReleaseOnTimeout(_) => "release_on_timeout",
        }
    }
}

/// A step that is not legal in the current phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Illegal purchase step {step} in phase {from}")]
pub struct InvalidTransition {
    /// Phase the saga was in
    pub from: PurchasePhase,
    /// Step that was refused
    pub step: &'static str,
}

/// State of one purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSaga {
    phase: PurchasePhase,
    reservation: Option<ReservationToken>,
    tickets: Vec<TicketId>,
    failure: Option<FailureReason>,
    history: Vec<PurchasePhase>,
}

impl Default for PurchaseSaga {
    fn default() -> Self {
        Self::new()
    }
}

impl PurchaseSaga {
    /// A purchase that has not been validated yet
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: PurchasePhase::Validating,
            reservation: None,
            tickets: Vec::new(),
            failure: None,
            history: vec![PurchasePhase::Validating],
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> PurchasePhase {
        self.phase
    }

    /// Reservation held (or last held) by this purchase
    #[must_use]
    pub const fn reservation(&self) -> Option<ReservationToken> {
        self.reservation
    }

    /// Tickets issued, once sold
    #[must_use]
    pub fn tickets(&self) -> &[TicketId] {
        &self.tickets
    }

    /// Failure classification, once failed
    #[must_use]
    pub const fn failure(&self) -> Option<FailureReason> {
        self.failure
    }

    /// Every phase visited, in order
    #[must_use]
    pub fn history(&self) -> &[PurchasePhase] {
        &self.history
    }

    /// Apply a step.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] and leaves the saga untouched if the step
    /// is not legal in the current phase.
    pub fn apply(&mut self, step: PurchaseStep) -> Result<PurchasePhase, InvalidTransition> {
        let next = match (self.phase, &step) {
            (PurchasePhase::Validating, PurchaseStep::Reserve(_)) => PurchasePhase::Reserved,
            (PurchasePhase::Validating, PurchaseStep::Reject(_)) => PurchasePhase::Rejected,
            (PurchasePhase::Reserved, PurchaseStep::BeginConfirm) => PurchasePhase::Confirming,
            (PurchasePhase::Reserved | PurchasePhase::Confirming, PurchaseStep::Release(_)) => {
                PurchasePhase::ReleasedOnFailure
            }
            (PurchasePhase::Reserved, PurchaseStep::ReleaseOnTimeout(_)) => {
                PurchasePhase::ReleasedOnTimeout
            }
            (PurchasePhase::Confirming, PurchaseStep::Sell(_)) => PurchasePhase::Sold,
            (from, step) => {
                return Err(InvalidTransition {
                    from,
                    step: step.name(),
                });
            }
        };

        match step {
            PurchaseStep::Reserve(token) => self.reservation = Some(token),
            PurchaseStep::Sell(tickets) => self.tickets = tickets,
            PurchaseStep::Reject(reason)
            | PurchaseStep::Release(reason)
            | PurchaseStep::ReleaseOnTimeout(reason) => self.failure = Some(reason),
            PurchaseStep::BeginConfirm => {}
        }

        self.phase = next;
        self.history.push(next);
        Ok(next)
    }
}
