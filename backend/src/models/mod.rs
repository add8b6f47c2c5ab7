//! Data models shared across database access and API handlers.

pub mod attendance;
pub mod session;
pub mod token;
pub mod user;
