//! Application state shared across all HTTP handlers.

use boxoffice_core::{GatewayFactory, SpotStore};
use boxoffice_runtime::{EventService, OrchestratorConfig, PurchaseOrchestrator};
use std::sync::Arc;

/// Services the handlers call into.
///
/// Generic over the store and the gateway factory so the router can be
/// exercised with the in-memory store and scripted partners.
pub struct AppState<S, F> {
    /// Event queries and setup
    pub events: EventService<S>,
    /// Purchase path
    pub orchestrator: PurchaseOrchestrator<S, F>,
}

impl<S, F> Clone for AppState<S, F> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<S, F> AppState<S, F>
where
    S: SpotStore + 'static,
    F: GatewayFactory + 'static,
{
    /// Build both services over one store.
    #[must_use]
    pub fn new(store: Arc<S>, factory: Arc<F>, config: OrchestratorConfig) -> Self {
        Self {
            events: EventService::new(Arc::clone(&store)),
            orchestrator: PurchaseOrchestrator::new(store, factory, config),
        }
    }
}
