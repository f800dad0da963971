//! Store contracts. Implemented by [`super::Database`] (PostgreSQL) and
//! [`super::InMemoryStore`] (tests and local runs).

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::ServiceError;
use crate::{
    models::{
        FollowerColumn, Session, SessionColumn, Tag, TagColumn, Tweet, TweetAttachment,
        TweetColumn, TweetDetails, User, UserColumn,
    },
    query::CompiledQuery,
};

/// How to find a single account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(Uuid),
    Email(String),
    Username(String),
}

/// Mutable session fields. Applying an update also bumps `last_active_at`
/// and `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub id: Uuid,
    pub ip_address: String,
    pub is_active: bool,
}

/// New attachment for a tweet being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub file_path: String,
    pub content_type: String,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: User) -> Result<User, ServiceError>;
    async fn find_user(&self, lookup: UserLookup) -> Result<User, ServiceError>;
    async fn list_users(
        &self,
        query: &CompiledQuery<UserColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError>;
    /// Persist every mutable field of `user`; `updated_at` is set by the store.
    async fn update_user(&self, user: User) -> Result<User, ServiceError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Source of truth for whether a login is still valid.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: Session) -> Result<Session, ServiceError>;
    /// Fails with `NotFound` for deleted or unknown ids; inactive sessions
    /// are returned as they are.
    async fn get_session(&self, id: Uuid) -> Result<Session, ServiceError>;
    async fn list_sessions(
        &self,
        query: &CompiledQuery<SessionColumn>,
    ) -> Result<(Vec<Session>, i64), ServiceError>;
    async fn update_session(&self, update: SessionUpdate) -> Result<Session, ServiceError>;
    async fn delete_session(&self, id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create_tag(&self, slug: String, level: i32) -> Result<Tag, ServiceError>;
    async fn get_tag(&self, id: Uuid) -> Result<Tag, ServiceError>;
    async fn list_tags(
        &self,
        query: &CompiledQuery<TagColumn>,
    ) -> Result<(Vec<Tag>, i64), ServiceError>;
    async fn update_tag(&self, id: Uuid, slug: String, level: i32) -> Result<Tag, ServiceError>;
    async fn delete_tag(&self, id: Uuid) -> Result<(), ServiceError>;
}

/// Name of the unique `(follower_id, following_id)` constraint.
pub const FOLLOWER_PAIR_UNIQUE: &str = "follower_pair_unique";

/// Follow graph. The `(follower_id, following_id)` pair is unique.
#[async_trait]
pub trait FollowerRepository: Send + Sync {
    /// Insert the edge, and in the same transaction make sure the tag whose
    /// slug is `following_id` exists and `follower_id` is subscribed to it.
    /// An existing edge fails with [`ServiceError::UniqueViolation`] naming
    /// [`FOLLOWER_PAIR_UNIQUE`].
    async fn insert_follow(&self, follower_id: Uuid, following_id: Uuid)
        -> Result<(), ServiceError>;

    /// Delete the edge and the follower's subscription to the followed
    /// account's tag in one transaction. Returns the number of edges removed.
    async fn remove_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<u64, ServiceError>;

    /// Accounts following someone, filtered over the follower join.
    async fn list_followers(
        &self,
        query: &CompiledQuery<FollowerColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError>;
}

#[async_trait]
pub trait TweetRepository: Send + Sync {
    /// Insert a tweet and its attachments atomically.
    async fn create_tweet(
        &self,
        tweet: Tweet,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Tweet, Vec<TweetAttachment>), ServiceError>;
    async fn get_tweet(&self, id: Uuid) -> Result<TweetDetails, ServiceError>;
    async fn list_tweets(
        &self,
        query: &CompiledQuery<TweetColumn>,
    ) -> Result<(Vec<TweetDetails>, i64), ServiceError>;
    async fn update_tweet(
        &self,
        id: Uuid,
        content: String,
        status: String,
    ) -> Result<Tweet, ServiceError>;
    async fn delete_tweet(&self, id: Uuid) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// Every store contract, each behind its own trait object.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub tags: Arc<dyn TagRepository>,
    pub followers: Arc<dyn FollowerRepository>,
    pub tweets: Arc<dyn TweetRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    /// Serve every contract from one backing store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + SessionStore
            + TagRepository
            + FollowerRepository
            + TweetRepository
            + StoreHealth
            + 'static,
    {
        Self {
            users: store.clone(),
            sessions: store.clone(),
            tags: store.clone(),
            followers: store.clone(),
            tweets: store.clone(),
            health: store,
        }
    }
}
