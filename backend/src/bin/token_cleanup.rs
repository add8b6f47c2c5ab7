use chrono::Utc;

use rollcall_backend::{
    config::Config, db::connection::create_pool, repositories::token as token_repo,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

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

    let deleted = token_repo::delete_dead_tokens(&pool, Utc::now())
        .await
        .expect("delete dead tokens");
    if deleted > 0 {
        tracing::info!("Deleted {} revoked or expired tokens", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) attendance_tokens")
        .execute(&pool)
        .await
        .expect("vacuum attendance_tokens table");

    Ok(())
}
