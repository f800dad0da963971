pub mod otp;
pub mod password;
pub mod validation;

pub use otp::{generate_otp, otp_key};
pub use password::{hash_password, verify_password, Password};
pub use validation::ValidatedJson;
