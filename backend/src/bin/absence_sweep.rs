use chrono::Utc;

use rollcall_backend::{
    config::Config,
    db::connection::create_pool,
    models::session::SessionStatus,
    repositories::{attendance as attendance_repo, session as session_repo},
    services::schedule,
    utils::time,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Marks every enrolled student without a record as absent, for each session
/// that has ended. Idempotent; safe to run on a schedule.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;

    let now = Utc::now();
    let today = time::today_local(&config.time_zone);
    let sessions = session_repo::list_on_or_before(&pool, today)
        .await
        .expect("list candidate sessions");

    let mut swept = 0u64;
    for session in sessions {
        if schedule::session_status(&session, now, &config.time_zone) != SessionStatus::Ended {
            continue;
        }

        let inserted =
            attendance_repo::insert_absentees(&pool, session.id, session.unit_id, now)
                .await
                .expect("insert absent records");
        if inserted > 0 {
            tracing::info!(
                session_id = %session.id,
                inserted,
                "Recorded absences for ended session"
            );
        }
        swept += inserted;
    }

    tracing::info!(swept, "Absence sweep finished");

    Ok(())
}
