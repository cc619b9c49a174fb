//! # ridenow
//!
//! Client core for the RideNow ride-hailing backend.
//!
//! This crate owns the session lifecycle (persistent store, published
//! session state, login/signup/logout) and the authenticated request
//! gateway that attaches bearer tokens and renews them on 401. Typed
//! wrappers for the rider and driver endpoints sit on top of the gateway.
//! Rendering is left to the embedding shell (see the `ridenow-cli` crate).

pub mod config;
pub mod error;
pub mod net;
pub mod state;
pub mod util;

pub use config::ClientConfig;
pub use error::ApiError;
pub use net::gateway::Gateway;
pub use state::auth::{Session, SessionEvent, SessionHandle};
pub use state::context::{LoginOutcome, SessionContext};
pub use state::store::{FileStore, MemoryStore, SessionStore};
pub use util::guard::{GuardDecision, RouteGuard};
