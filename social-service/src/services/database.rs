//! PostgreSQL implementation of the store contracts.
//!
//! List queries are rendered by [`CompiledQuery`]; every value is a bound
//! parameter.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    repository::{
        FollowerRepository, NewAttachment, SessionStore, SessionUpdate, StoreHealth,
        TagRepository, TweetRepository, UserLookup, UserRepository,
    },
    ServiceError,
};
use crate::{
    models::{
        FollowerColumn, Session, SessionColumn, Tag, TagColumn, Tweet, TweetAttachment,
        TweetColumn, TweetDetails, User, UserColumn, FOLLOW_TAG_LEVEL,
    },
    query::CompiledQuery,
};

const FOLLOWER_JOIN: &str = "follower f JOIN users u ON u.id = f.follower_id";

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count<C: crate::query::Column>(
        &self,
        query: &CompiledQuery<C>,
        from: &str,
    ) -> Result<i64, ServiceError> {
        Ok(query
            .count(from)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    /// Attach owners and attachments to a page of tweets with two queries.
    async fn tweet_details(&self, tweets: Vec<Tweet>) -> Result<Vec<TweetDetails>, ServiceError> {
        if tweets.is_empty() {
            return Ok(Vec::new());
        }

        let tweet_ids: Vec<Uuid> = tweets.iter().map(|t| t.id).collect();
        let owner_ids: Vec<Uuid> = tweets.iter().map(|t| t.owner_id).collect();

        let attachments = sqlx::query_as::<_, TweetAttachment>(
            "SELECT * FROM tweet_attachment WHERE tweet_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(&tweet_ids)
        .fetch_all(&self.pool)
        .await?;

        let owners: HashMap<Uuid, User> =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
                .bind(&owner_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();

        let mut by_tweet: HashMap<Uuid, Vec<TweetAttachment>> = HashMap::new();
        for attachment in attachments {
            by_tweet.entry(attachment.tweet_id).or_default().push(attachment);
        }

        Ok(tweets
            .into_iter()
            .map(|tweet| TweetDetails {
                owner: owners.get(&tweet.owner_id).map(User::sanitized),
                attachments: by_tweet.remove(&tweet.id).unwrap_or_default(),
                tweet,
            })
            .collect())
    }
}

#[async_trait]
impl StoreHealth for Database {
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Database health check failed");
                ServiceError::from(e)
            })?;
        Ok(())
    }
}

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for Database {
    async fn create_user(&self, user: User) -> Result<User, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, full_name, username, email, password, user_type, user_role,
                               status, avatar_id, gender, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.user_type)
        .bind(&user.user_role)
        .bind(&user.status)
        .bind(&user.avatar_id)
        .bind(&user.gender)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, lookup: UserLookup) -> Result<User, ServiceError> {
        let query = match &lookup {
            UserLookup::Id(id) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1").bind(*id)
            }
            UserLookup::Email(email) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1").bind(email.clone())
            }
            UserLookup::Username(name) => {
                sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
                    .bind(name.clone())
            }
        };

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    async fn list_users(
        &self,
        query: &CompiledQuery<UserColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError> {
        let users = query
            .select("SELECT * FROM users")
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        let count = self.count(query, "users").await?;
        Ok((users, count))
    }

    async fn update_user(&self, user: User) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = $2, username = $3, email = $4, password = $5, user_type = $6,
                user_role = $7, status = $8, avatar_id = $9, gender = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.user_type)
        .bind(&user.user_role)
        .bind(&user.status)
        .bind(&user.avatar_id)
        .bind(&user.gender)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("user"))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("user"));
        }
        Ok(())
    }
}

// ==================== Session Operations ====================

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, session: Session) -> Result<Session, ServiceError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO session (id, user_id, ip_address, user_agent, is_active, expires_at,
                                 last_active_at, platform, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.is_active)
        .bind(session.expires_at)
        .bind(session.last_active_at)
        .bind(&session.platform)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> Result<Session, ServiceError> {
        sqlx::query_as::<_, Session>("SELECT * FROM session WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("session"))
    }

    async fn list_sessions(
        &self,
        query: &CompiledQuery<SessionColumn>,
    ) -> Result<(Vec<Session>, i64), ServiceError> {
        let sessions = query
            .select("SELECT * FROM session")
            .build_query_as::<Session>()
            .fetch_all(&self.pool)
            .await?;
        let count = self.count(query, "session").await?;
        Ok((sessions, count))
    }

    async fn update_session(&self, update: SessionUpdate) -> Result<Session, ServiceError> {
        sqlx::query_as::<_, Session>(
            r#"
            UPDATE session
            SET ip_address = $2, is_active = $3, last_active_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(update.id)
        .bind(&update.ip_address)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("session"))
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM session WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("session"));
        }
        Ok(())
    }
}

// ==================== Tag Operations ====================

#[async_trait]
impl TagRepository for Database {
    async fn create_tag(&self, slug: String, level: i32) -> Result<Tag, ServiceError> {
        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tag (id, slug, level) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(level)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn get_tag(&self, id: Uuid) -> Result<Tag, ServiceError> {
        sqlx::query_as::<_, Tag>("SELECT * FROM tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("tag"))
    }

    async fn list_tags(
        &self,
        query: &CompiledQuery<TagColumn>,
    ) -> Result<(Vec<Tag>, i64), ServiceError> {
        let tags = query
            .select("SELECT * FROM tag")
            .build_query_as::<Tag>()
            .fetch_all(&self.pool)
            .await?;
        let count = self.count(query, "tag").await?;
        Ok((tags, count))
    }

    async fn update_tag(&self, id: Uuid, slug: String, level: i32) -> Result<Tag, ServiceError> {
        sqlx::query_as::<_, Tag>(
            "UPDATE tag SET slug = $2, level = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(slug)
        .bind(level)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("tag"))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("tag"));
        }
        Ok(())
    }
}

// ==================== Follower Operations ====================

#[async_trait]
impl FollowerRepository for Database {
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        // A duplicate pair fails here with 23505 and the transaction rolls back on drop.
        sqlx::query("INSERT INTO follower (id, follower_id, following_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await?;

        let slug = following_id.to_string();
        sqlx::query(
            "INSERT INTO tag (id, slug, level) VALUES ($1, $2, $3) ON CONFLICT (slug) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&slug)
        .bind(FOLLOW_TAG_LEVEL)
        .execute(&mut *tx)
        .await?;

        let tag_id: Uuid = sqlx::query_scalar("SELECT id FROM tag WHERE slug = $1")
            .bind(&slug)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO user_tag (id, user_id, tag_id) VALUES ($1, $2, $3)
            ON CONFLICT (user_id, tag_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(follower_id)
        .bind(tag_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM follower WHERE follower_id = $1 AND following_id = $2",
        )
        .bind(follower_id)
        .bind(following_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            DELETE FROM user_tag
            WHERE user_id = $1 AND tag_id IN (SELECT id FROM tag WHERE slug = $2)
            "#,
        )
        .bind(follower_id)
        .bind(following_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    async fn list_followers(
        &self,
        query: &CompiledQuery<FollowerColumn>,
    ) -> Result<(Vec<User>, i64), ServiceError> {
        let users = query
            .select(&format!("SELECT u.* FROM {}", FOLLOWER_JOIN))
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        let count = self.count(query, FOLLOWER_JOIN).await?;
        Ok((users, count))
    }
}

// ==================== Tweet Operations ====================

#[async_trait]
impl TweetRepository for Database {
    async fn create_tweet(
        &self,
        tweet: Tweet,
        attachments: Vec<NewAttachment>,
    ) -> Result<(Tweet, Vec<TweetAttachment>), ServiceError> {
        let mut tx = self.pool.begin().await?;

        let tweet = sqlx::query_as::<_, Tweet>(
            r#"
            INSERT INTO tweet (id, owner_id, content, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tweet.id)
        .bind(tweet.owner_id)
        .bind(&tweet.content)
        .bind(&tweet.status)
        .bind(tweet.created_at)
        .bind(tweet.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut saved = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let row = sqlx::query_as::<_, TweetAttachment>(
                r#"
                INSERT INTO tweet_attachment (id, tweet_id, file_path, content_type)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(tweet.id)
            .bind(attachment.file_path)
            .bind(attachment.content_type)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok((tweet, saved))
    }

    async fn get_tweet(&self, id: Uuid) -> Result<TweetDetails, ServiceError> {
        let tweet = sqlx::query_as::<_, Tweet>("SELECT * FROM tweet WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(ServiceError::NotFound("tweet"))?;

        self.tweet_details(vec![tweet])
            .await?
            .pop()
            .ok_or(ServiceError::NotFound("tweet"))
    }

    async fn list_tweets(
        &self,
        query: &CompiledQuery<TweetColumn>,
    ) -> Result<(Vec<TweetDetails>, i64), ServiceError> {
        let tweets = query
            .select("SELECT * FROM tweet")
            .build_query_as::<Tweet>()
            .fetch_all(&self.pool)
            .await?;
        let count = self.count(query, "tweet").await?;
        Ok((self.tweet_details(tweets).await?, count))
    }

    async fn update_tweet(
        &self,
        id: Uuid,
        content: String,
        status: String,
    ) -> Result<Tweet, ServiceError> {
        sqlx::query_as::<_, Tweet>(
            r#"
            UPDATE tweet SET content = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ServiceError::NotFound("tweet"))
    }

    async fn delete_tweet(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM tweet WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("tweet"));
        }
        Ok(())
    }
}
