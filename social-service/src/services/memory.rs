//! In-memory implementation of every store contract.
//!
//! Each operation runs under a single lock, so it is atomic in the same way a
//! transaction is. Uniqueness, foreign keys and cascades mirror the
//! PostgreSQL schema in `migrations/`.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{
    repository::{
        FollowerRepository, NewAttachment, SessionStore, SessionUpdate, StoreHealth,
        TagRepository, TweetRepository, UserLookup, UserRepository, FOLLOWER_PAIR_UNIQUE,
    },
    ServiceError,
};
use crate::{
    models::{
        FollowEdge, FollowerColumn, FollowerRow, Session, SessionColumn, Tag, TagColumn, Tweet,
        TweetAttachment, TweetColumn, TweetDetails, User, UserColumn, UserTag, FOLLOW_TAG_LEVEL,
    },
    query::CompiledQuery,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    tags: HashMap<Uuid, Tag>,
    user_tags: Vec<UserTag>,
    follows: Vec<FollowEdge>,
    tweets: HashMap<Uuid, Tweet>,
    attachments: Vec<TweetAttachment>,
}

impl MemoryState {
    fn require_user(&self, id: Uuid) -> Result<(), ServiceError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(ServiceError::ForeignKeyViolation)
        }
    }

    fn check_user_unique(&self, user: &User) -> Result<(), ServiceError> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(ServiceError::UniqueViolation("users_username_key".into()));
            }
            if other.email == user.email {
                return Err(ServiceError::UniqueViolation("users_email_key".into()));
            }
        }
        Ok(())
    }

    fn check_slug_unique(&self, id: Uuid, slug: &str) -> Result<(), ServiceError> {
        if self.tags.values().any(|t| t.id != id && t.slug == slug) {
            return Err(ServiceError::UniqueViolation("tag_slug_key".into()));
        }
        Ok(())
    }

    fn tag_id_by_slug(&self, slug: &str) -> Option<Uuid> {
        self.tags.values().find(|t| t.slug == slug).map(|t| t.id)
    }

    fn tweet_details(&self, tweet: Tweet) -> TweetDetails {
        let mut attachments: Vec<_> = self
            .attachments
            .iter()
            .filter(|a| a.tweet_id == tweet.id)
            .cloned()
            .collect();
        attachments.sort_by_key(|a| a.created_at);

        TweetDetails {
            owner: self.users.get(&tweet.owner_id).map(User::sanitized),
            attachments,
            tweet,
        }
    }

    fn retain_tweets(&mut self, keep: impl Fn(&Tweet) -> bool) {
        self.tweets.retain(|_, t| keep(t));
        let tweets = &self.tweets;
        self.attachments.retain(|a| tweets.contains_key(&a.tweet_id));
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, ServiceError> {
        self.state
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("In-memory store mutex poisoned: {}", e)))
    }

    /// Whether `follower_id` currently follows `following_id`.
    pub fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, ServiceError> {
        Ok(self
            .lock()?
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.following_id == following_id))
    }

    /// Whether `user_id` is subscribed to the tag with `slug`.
    pub fn has_user_tag(&self, user_id: Uuid, slug: &str) -> Result<bool, ServiceError> {
        let state = self.lock()?;
        Ok(match state.tag_id_by_slug(slug) {
            Some(tag_id) => state
                .user_tags
                .iter()
                .any(|ut| ut.user_id == user_id && ut.tag_id == tag_id),
            None => false,
        })
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.lock().map(|_| ())
    }
}

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: User) -> Result<User, ServiceError> {
        let mut state = self.lock()?;
        if state.users.contains_key(&user.id) {
            return Err(ServiceError::UniqueViolation("users_pkey".into()));
        }
        state.check_user_unique(&user)?;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, lookup: UserLookup) -> Result<User, ServiceError> {
        let state = self.lock()?;
        let found = match &lookup {
            UserLookup::Id(id) => state.users.get(id),
            UserLookup::Email(email) => state.users.values().find(|u| &u.email == email),
            UserLookup::Username(name) => state.users.values().find(|u| &u.username == name),
        };
        found.cloned().ok_or(ServiceError::NotFound("user"))
    }

    async fn list_users(
        &self,
        query: &CompiledQuery<UserColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError> {
        let state = self.lock()?;
        Ok(query.apply(state.users.values().cloned()))
    }

    async fn update_user(&self, mut user: User) -> Result<User, ServiceError> {
        let mut state = self.lock()?;
        let created_at = state
            .users
            .get(&user.id)
            .map(|existing| existing.created_at)
            .ok_or(ServiceError::NotFound("user"))?;
        state.check_user_unique(&user)?;

        user.created_at = created_at;
        user.updated_at = Utc::now();
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        state.users.remove(&id).ok_or(ServiceError::NotFound("user"))?;

        state.sessions.retain(|_, s| s.user_id != id);
        state.user_tags.retain(|ut| ut.user_id != id);
        state
            .follows
            .retain(|e| e.follower_id != id && e.following_id != id);
        state.retain_tweets(|t| t.owner_id != id);
        Ok(())
    }
}

// ==================== Session Operations ====================

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn create_session(&self, session: Session) -> Result<Session, ServiceError> {
        let mut state = self.lock()?;
        state.require_user(session.user_id)?;
        if state.sessions.contains_key(&session.id) {
            return Err(ServiceError::UniqueViolation("session_pkey".into()));
        }
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, ServiceError> {
        self.lock()?
            .sessions
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound("session"))
    }

    async fn list_sessions(
        &self,
        query: &CompiledQuery<SessionColumn>,
    ) -> Result<(Vec<Session>, i64), ServiceError> {
        let state = self.lock()?;
        Ok(query.apply(state.sessions.values().cloned()))
    }

    async fn update_session(&self, update: SessionUpdate) -> Result<Session, ServiceError> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&update.id)
            .ok_or(ServiceError::NotFound("session"))?;

        let now = Utc::now();
        session.ip_address = update.ip_address;
        session.is_active = update.is_active;
        session.last_active_at = now;
        session.updated_at = now;
        Ok(session.clone())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), ServiceError> {
        self.lock()?
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(ServiceError::NotFound("session"))
    }
}

// ==================== Tag Operations ====================

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn create_tag(&self, slug: String, level: i32) -> Result<Tag, ServiceError> {
        let mut state = self.lock()?;
        let id = Uuid::new_v4();
        state.check_slug_unique(id, &slug)?;

        let now = Utc::now();
        let tag = Tag {
            id,
            slug,
            level,
            created_at: now,
            updated_at: now,
        };
        state.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn get_tag(&self, id: Uuid) -> Result<Tag, ServiceError> {
        self.lock()?
            .tags
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound("tag"))
    }

    async fn list_tags(
        &self,
        query: &CompiledQuery<TagColumn>,
    ) -> Result<(Vec<Tag>, i64), ServiceError> {
        let state = self.lock()?;
        Ok(query.apply(state.tags.values().cloned()))
    }

    async fn update_tag(&self, id: Uuid, slug: String, level: i32) -> Result<Tag, ServiceError> {
        let mut state = self.lock()?;
        state.check_slug_unique(id, &slug)?;
        let tag = state.tags.get_mut(&id).ok_or(ServiceError::NotFound("tag"))?;
        tag.slug = slug;
        tag.level = level;
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        state.tags.remove(&id).ok_or(ServiceError::NotFound("tag"))?;
        state.user_tags.retain(|ut| ut.tag_id != id);
        Ok(())
    }
}

// ==================== Follower Operations ====================

#[async_trait]
impl FollowerRepository for InMemoryStore {
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        state.require_user(follower_id)?;
        state.require_user(following_id)?;

        if state
            .follows
            .iter()
            .any(|e| e.follower_id == follower_id && e.following_id == following_id)
        {
            return Err(ServiceError::UniqueViolation(FOLLOWER_PAIR_UNIQUE.into()));
        }

        let now = Utc::now();
        state.follows.push(FollowEdge {
            id: Uuid::new_v4(),
            follower_id,
            following_id,
            created_at: now,
        });

        let slug = following_id.to_string();
        let tag_id = match state.tag_id_by_slug(&slug) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                state.tags.insert(
                    id,
                    Tag {
                        id,
                        slug,
                        level: FOLLOW_TAG_LEVEL,
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };

        if !state
            .user_tags
            .iter()
            .any(|ut| ut.user_id == follower_id && ut.tag_id == tag_id)
        {
            state.user_tags.push(UserTag {
                id: Uuid::new_v4(),
                user_id: follower_id,
                tag_id,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn remove_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let mut state = self.lock()?;
        let before = state.follows.len();
        state
            .follows
            .retain(|e| !(e.follower_id == follower_id && e.following_id == following_id));
        let removed = (before - state.follows.len()) as u64;

        if let Some(tag_id) = state.tag_id_by_slug(&following_id.to_string()) {
            state
                .user_tags
                .retain(|ut| !(ut.user_id == follower_id && ut.tag_id == tag_id));
        }
        Ok(removed)
    }

    async fn list_followers(
        &self,
        query: &CompiledQuery<FollowerColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError> {
        let state = self.lock()?;
        let rows = state.follows.iter().filter_map(|edge| {
            state.users.get(&edge.follower_id).map(|user| FollowerRow {
                edge: edge.clone(),
                user: user.clone(),
            })
        });
        let (rows, count) = query.apply(rows);
        Ok((rows.into_iter().map(|row| row.user).collect(), count))
    }
}

// ==================== Tweet Operations ====================

#[async_trait]
impl TweetRepository for InMemoryStore {
    async fn create_tweet(
        &self,
        tweet: Tweet,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Tweet, Vec<TweetAttachment>), ServiceError> {
        let mut state = self.lock()?;
        state.require_user(tweet.owner_id)?;
        if state.tweets.contains_key(&tweet.id) {
            return Err(ServiceError::UniqueViolation("tweet_pkey".into()));
        }

        let now = Utc::now();
        let attachments: Vec<_> = attachments
            .into_iter()
            .map(|a| TweetAttachment {
                id: Uuid::new_v4(),
                tweet_id: tweet.id,
                file_path: a.file_path,
                content_type: a.content_type,
                created_at: now,
                updated_at: now,
            })
            .collect();

        state.tweets.insert(tweet.id, tweet.clone());
        state.attachments.extend(attachments.iter().cloned());
        Ok((tweet, attachments))
    }

    async fn get_tweet(&self, id: Uuid) -> Result<TweetDetails, ServiceError> {
        let state = self.lock()?;
        let tweet = state
            .tweets
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound("tweet"))?;
        Ok(state.tweet_details(tweet))
    }

    async fn list_tweets(
        &self,
        query: &CompiledQuery<TweetColumn>,
    ) -> Result<(Vec<TweetDetails>, i64), ServiceError> {
        let state = self.lock()?;
        let (tweets, count) = query.apply(state.tweets.values().cloned());
        Ok((
            tweets.into_iter().map(|t| state.tweet_details(t)).collect(),
            count,
        ))
    }

    async fn update_tweet(
        &self,
        id: Uuid,
        content: String,
        status: String,
    ) -> Result<Tweet, ServiceError> {
        let mut state = self.lock()?;
        let tweet = state.tweets.get_mut(&id).ok_or(ServiceError::NotFound("tweet"))?;
        tweet.content = content;
        tweet.status = status;
        tweet.updated_at = Utc::now();
        Ok(tweet.clone())
    }

    async fn delete_tweet(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut state = self.lock()?;
        if !state.tweets.contains_key(&id) {
            return Err(ServiceError::NotFound("tweet"));
        }
        state.retain_tweets(|t| t.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user_type;
    use crate::query::{Direction, Filter, ListQuery};

    fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            full_name: name.to_uppercase(),
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "hash".to_string(),
            user_type: user_type::USER.to_string(),
            user_role: "user".to_string(),
            status: "active".to_string(),
            avatar_id: None,
            gender: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let store = InMemoryStore::new();
        store.create_user(user("amy")).await.unwrap();

        let mut clash = user("amy");
        clash.email = "other@example.com".into();
        assert!(matches!(
            store.create_user(clash).await,
            Err(ServiceError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ip_address: String::new(),
            user_agent: String::new(),
            is_active: true,
            expires_at: now,
            last_active_at: now,
            platform: "web".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            store.create_session(session).await,
            Err(ServiceError::ForeignKeyViolation)
        ));
    }

    #[tokio::test]
    async fn test_follow_bookkeeping_and_cascade() {
        let store = InMemoryStore::new();
        let a = store.create_user(user("a")).await.unwrap();
        let b = store.create_user(user("b")).await.unwrap();

        store.insert_follow(a.id, b.id).await.unwrap();
        assert!(store.is_following(a.id, b.id).unwrap());
        assert!(store.has_user_tag(a.id, &b.id.to_string()).unwrap());
        assert!(matches!(
            store.insert_follow(a.id, b.id).await,
            Err(ServiceError::UniqueViolation(_))
        ));

        let query = ListQuery::new()
            .filter(Filter::eq(FollowerColumn::FollowingId, b.id).unwrap())
            .order_by(FollowerColumn::FollowedAt, Direction::Desc)
            .compile();
        let (followers, count) = store.list_followers(&query).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(followers[0].id, a.id);

        store.delete_user(a.id).await.unwrap();
        assert!(!store.is_following(a.id, b.id).unwrap());
        assert!(!store.has_user_tag(a.id, &b.id.to_string()).unwrap());
    }

    #[tokio::test]
    async fn test_remove_follow_reports_rows() {
        let store = InMemoryStore::new();
        let a = store.create_user(user("a")).await.unwrap();
        let b = store.create_user(user("b")).await.unwrap();

        assert_eq!(store.remove_follow(a.id, b.id).await.unwrap(), 0);
        store.insert_follow(a.id, b.id).await.unwrap();
        assert_eq!(store.remove_follow(a.id, b.id).await.unwrap(), 1);
        assert!(!store.has_user_tag(a.id, &b.id.to_string()).unwrap());
    }

    #[tokio::test]
    async fn test_delete_tweet_drops_attachments() {
        let store = InMemoryStore::new();
        let owner = store.create_user(user("owner")).await.unwrap();
        let now = Utc::now();
        let tweet = Tweet {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            content: "hello".into(),
            status: "published".into(),
            created_at: now,
            updated_at: now,
        };
        let (tweet, attachments) = store
            .create_tweet(
                tweet,
                vec![NewAttachment {
                    file_path: "a.png".into(),
                    content_type: "image/png".into(),
                }],
            )
            .await
            .unwrap();
        assert_eq!(attachments.len(), 1);

        let details = store.get_tweet(tweet.id).await.unwrap();
        assert_eq!(details.owner.unwrap().id, owner.id);
        assert_eq!(details.attachments.len(), 1);

        store.delete_tweet(tweet.id).await.unwrap();
        assert!(matches!(
            store.get_tweet(tweet.id).await,
            Err(ServiceError::NotFound("tweet"))
        ));
        assert!(store.lock().unwrap().attachments.is_empty());
    }
}
