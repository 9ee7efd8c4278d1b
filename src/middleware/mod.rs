//! Plug-and-play BankID authentication middleware for Axum.
//!
//! This module wires the session codec, store, dedup tracker, and provider
//! client into a mountable route set for the browser-facing handshake.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use bankid_sessions::middleware::{BankIdAuthConfig, auth_routes};
//!
//! // 1. Configure from environment (BANKID_SESSION_SECRET required)
//! let config = BankIdAuthConfig::from_env()?;
//!
//! // 2. Mount auth routes; keep the sweeper handle alive
//! let (routes, _sweeper) = auth_routes(config);
//! let app = axum::Router::new().merge(routes);
//!
//! // 3. Use the ActiveSession extractor (or resolve_session()) in handlers
//! //    that need the authenticated session
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod state;
mod types;

pub use config::BankIdAuthConfig;
pub use error::AuthError;
pub use extractor::{ActiveSession, resolve_session};
pub use routes::auth_routes;
pub use types::{
    CancelResponse, CsrfResponse, SessionStatusResponse, StartRequest, StartResponse,
};
