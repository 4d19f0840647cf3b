use std::sync::Arc;

use botforge_telegram::SessionRegistry;

use crate::auth::ResolvedAuth;

/// Shared gateway runtime state, wrapped in Arc for use across handlers.
pub struct GatewayState {
    /// Owned `session_id -> handle` registry.
    pub registry: Arc<SessionRegistry>,
    /// Auth configuration.
    pub auth: ResolvedAuth,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(auth: ResolvedAuth, registry: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            auth,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
