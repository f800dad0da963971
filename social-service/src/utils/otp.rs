use rand::Rng;

/// Cache key holding the pending verification code for `email`.
pub fn otp_key(email: &str) -> String {
    format!("otp-{}", email)
}

/// Random numeric code of `length` digits (leading zeros kept).
pub fn generate_otp(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
