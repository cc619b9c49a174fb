//! Session state: persistence, the published session, and the context that drives it.

pub mod auth;
pub mod context;
pub mod store;
