use std::sync::Arc;
use uuid::Uuid;

use super::{
    repository::{FollowerRepository, FOLLOWER_PAIR_UNIQUE},
    ServiceError,
};

/// Attempts before a toggle that keeps losing races gives up.
const MAX_TOGGLE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    Unfollowed,
}

impl FollowOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            FollowOutcome::Created => "created",
            FollowOutcome::Unfollowed => "unfollowed",
        }
    }
}

/// Follow/unfollow as one idempotent-per-call toggle.
///
/// The unique `(follower_id, following_id)` pair decides the outcome: the
/// insert either wins, or a violation of that constraint turns the call into
/// a delete. Any other violation is an error. There is no read-then-write window.
#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn FollowerRepository>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn FollowerRepository>) -> Self {
        Self { repo }
    }

    pub async fn toggle(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<FollowOutcome, ServiceError> {
        if follower_id == following_id {
            return Err(ServiceError::BadRequest("You cannot follow yourself".into()));
        }

        for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
            match self.repo.insert_follow(follower_id, following_id).await {
                Ok(()) => return Ok(self.record(FollowOutcome::Created, follower_id, following_id)),
                Err(ServiceError::UniqueViolation(constraint))
                    if constraint == FOLLOWER_PAIR_UNIQUE => {}
                Err(e) => return Err(e),
            }

            if self.repo.remove_follow(follower_id, following_id).await? > 0 {
                return Ok(self.record(FollowOutcome::Unfollowed, follower_id, following_id));
            }

            // Someone else removed the edge between our insert and delete.
            tracing::debug!(
                %follower_id,
                %following_id,
                attempt,
                "Follow toggle lost a race, retrying"
            );
        }

        metrics::counter!("follow_toggles_total", "outcome" => "contended").increment(1);
        Err(ServiceError::Conflict(
            "Follow state is changing concurrently, try again".into(),
        ))
    }

    fn record(&self, outcome: FollowOutcome, follower_id: Uuid, following_id: Uuid) -> FollowOutcome {
        metrics::counter!("follow_toggles_total", "outcome" => outcome.as_str()).increment(1);
        tracing::info!(%follower_id, %following_id, outcome = outcome.as_str(), "Follow toggled");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{user_type, FollowerColumn, User},
        query::CompiledQuery,
        services::{repository::UserRepository, InMemoryStore},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    async fn seeded() -> (Arc<InMemoryStore>, Uuid, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let now = Utc::now();
            let user = store
                .create_user(User {
                    id: Uuid::new_v4(),
                    full_name: name.into(),
                    username: name.into(),
                    email: format!("{}@example.com", name),
                    password: "hash".into(),
                    user_type: user_type::USER.into(),
                    user_role: "user".into(),
                    status: "active".into(),
                    avatar_id: None,
                    gender: None,
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (store, ids[0], ids[1])
    }

    #[tokio::test]
    async fn test_sequential_toggles_alternate() {
        let (store, a, b) = seeded().await;
        let service = FollowService::new(store.clone());

        assert_eq!(service.toggle(a, b).await.unwrap(), FollowOutcome::Created);
        assert!(store.is_following(a, b).unwrap());
        assert!(store.has_user_tag(a, &b.to_string()).unwrap());

        assert_eq!(service.toggle(a, b).await.unwrap(), FollowOutcome::Unfollowed);
        assert!(!store.is_following(a, b).unwrap());
        assert!(!store.has_user_tag(a, &b.to_string()).unwrap());

        assert_eq!(service.toggle(a, b).await.unwrap(), FollowOutcome::Created);
    }

    #[tokio::test]
    async fn test_self_follow_is_rejected() {
        let (store, a, _) = seeded().await;
        let service = FollowService::new(store);
        assert!(matches!(
            service.toggle(a, a).await,
            Err(ServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_account_propagates_store_error() {
        let (store, a, _) = seeded().await;
        let service = FollowService::new(store);
        assert!(matches!(
            service.toggle(a, Uuid::new_v4()).await,
            Err(ServiceError::ForeignKeyViolation)
        ));
    }

    #[tokio::test]
    async fn test_joined_pair_from_unfollowed_cancels_out() {
        let (store, a, b) = seeded().await;
        let service = FollowService::new(store.clone());

        // The in-memory store never suspends, so the two calls complete one
        // after the other.
        let (first, second) = tokio::join!(service.toggle(a, b), service.toggle(a, b));
        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| o.as_str());

        assert_eq!(outcomes, vec![FollowOutcome::Created, FollowOutcome::Unfollowed]);
        assert!(!store.is_following(a, b).unwrap());
    }

    /// Holds the first two inserts until both have failed, so both callers
    /// go on to delete the same edge.
    struct Interleaved {
        inner: Arc<InMemoryStore>,
        gate: Barrier,
        gated: AtomicUsize,
    }

    #[async_trait]
    impl FollowerRepository for Interleaved {
        async fn insert_follow(&self, follower: Uuid, following: Uuid) -> Result<(), ServiceError> {
            let result = self.inner.insert_follow(follower, following).await;
            if self.gated.fetch_add(1, Ordering::SeqCst) < 2 {
                self.gate.wait().await;
            }
            result
        }

        async fn remove_follow(&self, follower: Uuid, following: Uuid) -> Result<u64, ServiceError> {
            self.inner.remove_follow(follower, following).await
        }

        async fn list_followers(
            &self,
            query: &CompiledQuery<FollowerColumn>,
        ) -> Result<(Vec<User>, i64), ServiceError> {
            self.inner.list_followers(query).await
        }
    }

    #[tokio::test]
    async fn test_both_inserts_failing_leaves_one_unfollow_and_one_refollow() {
        let (store, a, b) = seeded().await;
        store.insert_follow(a, b).await.unwrap();
        let service = FollowService::new(Arc::new(Interleaved {
            inner: store.clone(),
            gate: Barrier::new(2),
            gated: AtomicUsize::new(0),
        }));

        let (first, second) = tokio::join!(service.toggle(a, b), service.toggle(a, b));
        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| o.as_str());

        // One delete removes the edge, the other finds nothing and retries
        // its insert.
        assert_eq!(outcomes, vec![FollowOutcome::Created, FollowOutcome::Unfollowed]);
        assert!(store.is_following(a, b).unwrap());
    }

    /// Fails every insert with a violation of some other constraint.
    struct ForeignClash {
        inner: Arc<InMemoryStore>,
    }

    #[async_trait]
    impl FollowerRepository for ForeignClash {
        async fn insert_follow(&self, _: Uuid, _: Uuid) -> Result<(), ServiceError> {
            Err(ServiceError::UniqueViolation("follower_pkey".into()))
        }

        async fn remove_follow(&self, follower: Uuid, following: Uuid) -> Result<u64, ServiceError> {
            self.inner.remove_follow(follower, following).await
        }

        async fn list_followers(
            &self,
            query: &CompiledQuery<FollowerColumn>,
        ) -> Result<(Vec<User>, i64), ServiceError> {
            self.inner.list_followers(query).await
        }
    }

    #[tokio::test]
    async fn test_other_unique_violation_is_not_an_unfollow() {
        let (store, a, b) = seeded().await;
        store.insert_follow(a, b).await.unwrap();
        let service = FollowService::new(Arc::new(ForeignClash {
            inner: store.clone(),
        }));

        match service.toggle(a, b).await {
            Err(ServiceError::UniqueViolation(constraint)) => {
                assert_eq!(constraint, "follower_pkey")
            }
            other => panic!("expected the violation to propagate, got {:?}", other),
        }
        assert!(store.is_following(a, b).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_parallel_toggles_leave_parity_state() {
        let (store, a, b) = seeded().await;
        let service = FollowService::new(store.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.toggle(a, b).await })
            })
            .collect();
        let mut flips = 0;
        for outcome in futures::future::join_all(handles).await {
            match outcome.unwrap() {
                Ok(_) => flips += 1,
                Err(ServiceError::Conflict(_)) => {}
                Err(e) => panic!("unexpected toggle error: {}", e),
            }
        }

        // Every successful toggle flips the state exactly once.
        assert_eq!(store.is_following(a, b).unwrap(), flips % 2 == 1);
    }

    /// Reports a duplicate on insert and a zero-row delete a fixed number of
    /// times before handing over to the real store.
    struct Contended {
        inner: Arc<InMemoryStore>,
        races_left: AtomicUsize,
    }

    #[async_trait]
    impl FollowerRepository for Contended {
        async fn insert_follow(&self, follower: Uuid, following: Uuid) -> Result<(), ServiceError> {
            if self.races_left.load(Ordering::SeqCst) > 0 {
                return Err(ServiceError::UniqueViolation(FOLLOWER_PAIR_UNIQUE.into()));
            }
            self.inner.insert_follow(follower, following).await
        }

        async fn remove_follow(&self, follower: Uuid, following: Uuid) -> Result<u64, ServiceError> {
            if self.races_left.load(Ordering::SeqCst) > 0 {
                self.races_left.fetch_sub(1, Ordering::SeqCst);
                return Ok(0);
            }
            self.inner.remove_follow(follower, following).await
        }

        async fn list_followers(
            &self,
            query: &CompiledQuery<FollowerColumn>,
        ) -> Result<(Vec<User>, i64), ServiceError> {
            self.inner.list_followers(query).await
        }
    }

    #[tokio::test]
    async fn test_lost_race_is_retried() {
        let (store, a, b) = seeded().await;
        let repo = Arc::new(Contended {
            inner: store.clone(),
            races_left: AtomicUsize::new(1),
        });
        let service = FollowService::new(repo);

        assert_eq!(service.toggle(a, b).await.unwrap(), FollowOutcome::Created);
        assert!(store.is_following(a, b).unwrap());
    }

    #[tokio::test]
    async fn test_persistent_contention_is_a_conflict() {
        let (store, a, b) = seeded().await;
        let repo = Arc::new(Contended {
            inner: store,
            races_left: AtomicUsize::new(MAX_TOGGLE_ATTEMPTS),
        });
        let service = FollowService::new(repo);

        assert!(matches!(
            service.toggle(a, b).await,
            Err(ServiceError::Conflict(_))
        ));
    }
}
