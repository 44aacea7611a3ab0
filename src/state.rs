use crate::confirm::Confirmations;
use crate::preferences::Preferences;
use crate::reconciler::Reconciler;
use crate::session::IdentityProvider;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Reconciler>,
    pub identity: Arc<dyn IdentityProvider>,
    pub confirmations: Arc<Confirmations>,
    pub preferences: Arc<Preferences>,
}

impl AppState {
    pub fn new(
        tracker: Arc<Reconciler>,
        identity: Arc<dyn IdentityProvider>,
        preferences: Preferences,
    ) -> Self {
        Self {
            tracker,
            identity,
            confirmations: Arc::new(Confirmations::new()),
            preferences: Arc::new(preferences),
        }
    }
}
