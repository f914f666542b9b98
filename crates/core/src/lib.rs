//! Domain types shared by the database and API crates.
//!
//! Nothing in here performs I/O.

pub mod device;
pub mod error;
pub mod password_policy;
pub mod types;
