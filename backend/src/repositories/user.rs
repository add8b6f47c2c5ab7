//! User lookups for the auth middleware.

use crate::db::connection::DbPool;
use crate::error::AppError;
use crate::models::user::User;
use crate::types::UserId;

pub async fn find_by_id(pool: &DbPool, id: UserId) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, role, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
