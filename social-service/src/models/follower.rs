use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::User;
use crate::query::{Column, ColumnKind, FilterValue, Filterable};

/// `follower_id` follows `following_id`. Row presence is the whole state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FollowEdge {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// An edge joined with the follower's account, as listed by
/// `follower f JOIN users u ON u.id = f.follower_id`.
#[derive(Debug, Clone)]
pub struct FollowerRow {
    pub edge: FollowEdge,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerColumn {
    FollowerId,
    FollowingId,
    FullName,
    Username,
    Email,
    FollowedAt,
}

impl Column for FollowerColumn {
    fn as_sql(self) -> &'static str {
        match self {
            FollowerColumn::FollowerId => "f.follower_id",
            FollowerColumn::FollowingId => "f.following_id",
            FollowerColumn::FullName => "u.full_name",
            FollowerColumn::Username => "u.username",
            FollowerColumn::Email => "u.email",
            FollowerColumn::FollowedAt => "f.created_at",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            FollowerColumn::FollowerId | FollowerColumn::FollowingId => ColumnKind::Uuid,
            FollowerColumn::FollowedAt => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }
}

impl Filterable<FollowerColumn> for FollowerRow {
    fn field(&self, column: FollowerColumn) -> Option<FilterValue> {
        Some(match column {
            FollowerColumn::FollowerId => self.edge.follower_id.into(),
            FollowerColumn::FollowingId => self.edge.following_id.into(),
            FollowerColumn::FullName => self.user.full_name.clone().into(),
            FollowerColumn::Username => self.user.username.clone().into(),
            FollowerColumn::Email => self.user.email.clone().into(),
            FollowerColumn::FollowedAt => self.edge.created_at.into(),
        })
    }
}
