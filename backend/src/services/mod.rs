//! Domain logic, independent of the HTTP layer.

pub mod geofence;
pub mod scan;
pub mod schedule;
pub mod token_issuer;
