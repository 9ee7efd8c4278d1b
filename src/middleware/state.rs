use std::sync::Arc;

use super::config::AuthSettings;
use crate::flow::{AuthFlow, IdentityProvider};

/// Shared state for auth route handlers.
pub(super) struct AuthState<P> {
    pub(super) flow: Arc<AuthFlow<P>>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding a `P: Clone` bound.
impl<P> Clone for AuthState<P> {
    fn clone(&self) -> Self {
        Self {
            flow: self.flow.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<P: IdentityProvider> AuthState<P> {
    pub(super) fn new(flow: AuthFlow<P>, settings: AuthSettings) -> Self {
        Self {
            flow: Arc::new(flow),
            settings,
        }
    }
}
