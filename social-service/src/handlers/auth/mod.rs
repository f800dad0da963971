pub mod registration;
pub mod session;

pub use registration::{register, verify_email};
pub use session::{login, logout};
