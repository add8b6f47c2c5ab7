use anyhow::anyhow;
use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of an attendance token in minutes. Bounds the replay window
    /// of a leaked QR image, so keep it short.
    pub token_ttl_minutes: i64,
    /// Scans within this many minutes after session start count as present;
    /// later scans (while the session is still ongoing) count as late.
    pub grace_period_minutes: i64,
    pub time_zone: Tz,
    pub bind_addr: String,
    /// Per-IP burst allowance on the scan route.
    pub rate_limit_scan_max_requests: u32,
    pub rate_limit_scan_window_seconds: u64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/rollcall".to_string());

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let token_ttl_minutes = parse_minutes("TOKEN_TTL_MINUTES", 5)?;
        let grace_period_minutes = parse_minutes("GRACE_PERIOD_MINUTES", 15)?;

        let time_zone_name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rate_limit_scan_max_requests = env::var("RATE_LIMIT_SCAN_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);
        let rate_limit_scan_window_seconds = env::var("RATE_LIMIT_SCAN_WINDOW_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Config {
            database_url,
            jwt_secret,
            token_ttl_minutes,
            grace_period_minutes,
            time_zone,
            bind_addr,
            rate_limit_scan_max_requests,
            rate_limit_scan_window_seconds,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::minutes(self.grace_period_minutes)
    }
}

fn parse_minutes(var: &str, default: i64) -> anyhow::Result<i64> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let minutes: i64 = raw
                .parse()
                .map_err(|_| anyhow!("Invalid {} value: {}", var, raw))?;
            if minutes <= 0 {
                return Err(anyhow!("{} must be positive, got {}", var, minutes));
            }
            Ok(minutes)
        }
    }
}
