use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::query::{Column, ColumnKind, FilterValue, Filterable};

/// Level given to the per-account tag created when someone is first followed.
pub const FOLLOW_TAG_LEVEL: i32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tag {
    pub id: Uuid,
    pub slug: String,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription of a user to a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserTag {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tag_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagColumn {
    Id,
    Slug,
    Level,
    CreatedAt,
}

impl Column for TagColumn {
    fn as_sql(self) -> &'static str {
        match self {
            TagColumn::Id => "id",
            TagColumn::Slug => "slug",
            TagColumn::Level => "level",
            TagColumn::CreatedAt => "created_at",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            TagColumn::Id => ColumnKind::Uuid,
            TagColumn::Slug => ColumnKind::Text,
            TagColumn::Level => ColumnKind::Int,
            TagColumn::CreatedAt => ColumnKind::Timestamp,
        }
    }
}

impl Filterable<TagColumn> for Tag {
    fn field(&self, column: TagColumn) -> Option<FilterValue> {
        Some(match column {
            TagColumn::Id => self.id.into(),
            TagColumn::Slug => self.slug.clone().into(),
            TagColumn::Level => i64::from(self.level).into(),
            TagColumn::CreatedAt => self.created_at.into(),
        })
    }
}
