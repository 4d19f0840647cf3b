//! Gateway: the REST surface in front of session management and BotFather
//! automation.
//!
//! Lifecycle:
//! 1. Resolve auth (API key or explicit unauthenticated opt-in)
//! 2. Build the session registry around the live grammers factory
//! 3. Build the router (public `/` + `/health`, guarded operation routes)
//! 4. Serve
//!
//! Contract notes the external caller depends on: domain failures come back
//! as HTTP 200 `{success: false, error, message}` payloads; only a bad API
//! key maps to an HTTP status (401).

pub mod auth;
pub mod payload;
pub mod routes;
pub mod server;
pub mod state;

pub use {
    server::{build_app, start_gateway},
    state::GatewayState,
};
