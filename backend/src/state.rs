use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        attendance::PgAttendanceRepository, session::PgSessionRepository,
        token::PgTokenRepository,
    },
    services::{scan::ScanService, token_issuer::TokenIssuer},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub scan_service: ScanService,
    pub token_issuer: TokenIssuer,
    pub attendance_repo: Arc<PgAttendanceRepository>,
    pub session_repo: Arc<PgSessionRepository>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let sessions = Arc::new(PgSessionRepository::new(pool.clone()));
        let tokens = Arc::new(PgTokenRepository::new(pool.clone()));
        let ledger = Arc::new(PgAttendanceRepository::new(pool.clone()));

        let scan_service = ScanService::new(
            sessions.clone(),
            tokens.clone(),
            ledger.clone(),
            config.time_zone,
            config.grace_period(),
        );
        let token_issuer = TokenIssuer::new(
            sessions.clone(),
            tokens,
            config.time_zone,
            config.token_ttl(),
        );

        Self {
            pool,
            config,
            scan_service,
            token_issuer,
            attendance_repo: ledger,
            session_repo: sessions,
        }
    }
}
