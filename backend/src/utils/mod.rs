pub mod cookies;
pub mod jwt;
pub mod secret;
pub mod time;
