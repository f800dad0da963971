use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::SanitizedUser;
use crate::query::{Column, ColumnKind, FilterValue, Filterable};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Tweet {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TweetAttachment {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub tweet_id: Uuid,
    pub file_path: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tweet with its attachments and (when still present) its owner.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TweetDetails {
    #[serde(flatten)]
    pub tweet: Tweet,
    pub owner: Option<SanitizedUser>,
    pub attachments: Vec<TweetAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetColumn {
    Id,
    OwnerId,
    Content,
    Status,
    CreatedAt,
}

impl Column for TweetColumn {
    fn as_sql(self) -> &'static str {
        match self {
            TweetColumn::Id => "id",
            TweetColumn::OwnerId => "owner_id",
            TweetColumn::Content => "content",
            TweetColumn::Status => "status",
            TweetColumn::CreatedAt => "created_at",
        }
    }

    fn kind(self) -> ColumnKind {
        match self {
            TweetColumn::Id | TweetColumn::OwnerId => ColumnKind::Uuid,
            TweetColumn::Content | TweetColumn::Status => ColumnKind::Text,
            TweetColumn::CreatedAt => ColumnKind::Timestamp,
        }
    }
}

impl Filterable<TweetColumn> for Tweet {
    fn field(&self, column: TweetColumn) -> Option<FilterValue> {
        Some(match column {
            TweetColumn::Id => self.id.into(),
            TweetColumn::OwnerId => self.owner_id.into(),
            TweetColumn::Content => self.content.clone().into(),
            TweetColumn::Status => self.status.clone().into(),
            TweetColumn::CreatedAt => self.created_at.into(),
        })
    }
}
