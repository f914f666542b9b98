//! Request extractors shared by the handlers.
//!
//! - [`auth::AuthUser`] -- Extracts the caller's user and session from a JWT Bearer token.
//! - [`device::Device`] -- Extracts the device binding tuple from request headers.

pub mod auth;
pub mod device;
