use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::query::{Column, ColumnKind, FilterValue, Filterable};

/// A login on one platform. Deleting the row revokes every credential that
/// names it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub platform: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionColumn {
    Id,
    UserId,
    IsActive,
    Platform,
    LastActiveAt,
    CreatedAt,
}

impl Column for SessionColumn {
    fn as_sql(self) -> &'static str {
        match self {
            SessionColumn::Id => "id",
            SessionColumn::UserId => "user_id",
            SessionColumn::IsActive => "is_active",
            SessionColumn::Platform => "platform",
            SessionColumn::LastActiveAt => "last_active_at",
            SessionColumn::CreatedAt => "created_at",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            SessionColumn::Id | SessionColumn::UserId => ColumnKind::Uuid,
            SessionColumn::IsActive => ColumnKind::Bool,
            SessionColumn::Platform => ColumnKind::Text,
            SessionColumn::LastActiveAt | SessionColumn::CreatedAt => ColumnKind::Timestamp,
        }
    }
}

impl Filterable<SessionColumn> for Session {
    fn field(&self, column: SessionColumn) -> Option<FilterValue> {
        Some(match column {
            SessionColumn::Id => self.id.into(),
            SessionColumn::UserId => self.user_id.into(),
            SessionColumn::IsActive => self.is_active.into(),
            SessionColumn::Platform => self.platform.clone().into(),
            SessionColumn::LastActiveAt => self.last_active_at.into(),
            SessionColumn::CreatedAt => self.created_at.into(),
        })
    }
}
