use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::types::UserId;

/// Authenticated caller, loaded by the auth middleware. Account
/// management itself lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Lecturer,
    Student,
    Admin,
}

impl User {
    pub fn is_lecturer(&self) -> bool {
        matches!(self.role, UserRole::Lecturer)
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, UserRole::Student)
    }
}
