//! Data access layer. One module per aggregate; each exposes a mockable
//! trait plus the Postgres implementation.

pub mod attendance;
pub mod session;
pub mod token;
pub mod user;
