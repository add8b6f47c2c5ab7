//! Shared domain types.

pub mod id;

pub use id::{RecordId, SessionId, TokenId, UnitId, UserId};
