//! Backend access: transport, authenticated gateway, and typed endpoint wrappers.

pub mod auth;
pub mod driver;
pub mod gateway;
pub mod rider;
pub mod transport;
pub mod types;
