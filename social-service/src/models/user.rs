use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::query::{Column, ColumnKind, FilterValue, Filterable};

pub mod user_type {
    pub const USER: &str = "user";
    pub const ADMIN: &str = "admin";
}

pub mod user_status {
    pub const INVERIFY: &str = "inverify";
    pub const ACTIVE: &str = "active";
}

/// Account row. The password hash never leaves the service; responses use
/// [`SanitizedUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub user_type: String,
    pub user_role: String,
    pub status: String,
    pub avatar_id: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn sanitized(&self) -> SanitizedUser {
        SanitizedUser::from(self.clone())
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == user_type::ADMIN
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub user_type: String,
    pub user_role: String,
    pub status: String,
    pub avatar_id: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            username: user.username,
            email: user.email,
            user_type: user.user_type,
            user_role: user.user_role,
            status: user.status,
            avatar_id: user.avatar_id,
            gender: user.gender,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserColumn {
    Id,
    FullName,
    Username,
    Email,
    UserType,
    UserRole,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl Column for UserColumn {
    fn as_sql(self) -> &'static str {
        match self {
            UserColumn::Id => "id",
            UserColumn::FullName => "full_name",
            UserColumn::Username => "username",
            UserColumn::Email => "email",
            UserColumn::UserType => "user_type",
            UserColumn::UserRole => "user_role",
            UserColumn::Status => "status",
            UserColumn::CreatedAt => "created_at",
            UserColumn::UpdatedAt => "updated_at",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            UserColumn::Id => ColumnKind::Uuid,
            UserColumn::CreatedAt | UserColumn::UpdatedAt => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }
}

impl Filterable<UserColumn> for User {
    fn field(&self, column: UserColumn) -> Option<FilterValue> {
        Some(match column {
            UserColumn::Id => self.id.into(),
            UserColumn::FullName => self.full_name.clone().into(),
            UserColumn::Username => self.username.clone().into(),
            UserColumn::Email => self.email.clone().into(),
            UserColumn::UserType => self.user_type.clone().into(),
            UserColumn::UserRole => self.user_role.clone().into(),
            UserColumn::Status => self.status.clone().into(),
            UserColumn::CreatedAt => self.created_at.into(),
            UserColumn::UpdatedAt => self.updated_at.into(),
        })
    }
}
