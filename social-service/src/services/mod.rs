//! Business logic and storage for social-service.

mod auth;
pub mod cache;
mod database;
mod email;
pub mod error;
mod follow;
pub mod jwt;
mod memory;
pub mod metrics;
pub mod policy;
pub mod repository;

pub use auth::{AuthService, ClientInfo, LoginAttempt, Registration, SignedIn, ADMIN_PLATFORM};
pub use cache::{KeyValueCache, MockCache, RedisCache};
pub use database::Database;
pub use email::{EmailProvider, EmailService, MockEmailService};
pub use error::ServiceError;
pub use follow::{FollowOutcome, FollowService};
pub use jwt::{Claims, CredentialError, JwtService};
pub use memory::InMemoryStore;
pub use policy::{CasbinPolicy, PolicyEngine, PolicyError};
pub use repository::{
    FollowerRepository, NewAttachment, Repositories, SessionStore, SessionUpdate, StoreHealth,
    TagRepository, TweetRepository, UserLookup, UserRepository,
};
