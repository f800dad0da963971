//! Persisted entities and the closed column sets their list queries accept.

mod follower;
mod session;
mod tag;
mod tweet;
mod user;

pub use follower::{FollowEdge, FollowerColumn, FollowerRow};
pub use session::{Session, SessionColumn};
pub use tag::{Tag, TagColumn, UserTag, FOLLOW_TAG_LEVEL};
pub use tweet::{Tweet, TweetAttachment, TweetColumn, TweetDetails};
pub use user::{user_status, user_type, SanitizedUser, User, UserColumn};
