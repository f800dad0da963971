pub mod caller;
pub mod gateway;

pub use caller::Caller;
pub use gateway::{gateway_middleware, AuthGateway, CLAIM_HEADERS, UNAUTHORIZED_ROLE};
