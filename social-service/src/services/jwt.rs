use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Algorithms a presented token may be signed with.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Invalid credential: {0}")]
    Invalid(String),

    #[error("Failed to issue credential: {0}")]
    Issue(String),
}

/// Claims bound into every access token.
///
/// Unknown claims in a presented token are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub user_role: String,
    pub user_type: String,
    pub platform: String,
    pub session_id: Uuid,
    /// Expiration (Unix timestamp). Only checked when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl Claims {
    pub fn new(
        sub: Uuid,
        user_role: impl Into<String>,
        user_type: impl Into<String>,
        platform: impl Into<String>,
        session_id: Uuid,
    ) -> Self {
        Self {
            sub,
            user_role: user_role.into(),
            user_type: user_type.into(),
            platform: platform.into(),
            session_id,
            exp: None,
        }
    }
}

/// HMAC credential codec. Issues HS256; accepts any HMAC variant signed with
/// the shared secret.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_minutes: Option<i64>,
}

impl JwtService {
    pub fn new(secret: &str, token_ttl_minutes: Option<i64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_minutes,
        }
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, CredentialError> {
        let mut claims = claims.clone();
        if let Some(ttl) = self.token_ttl_minutes {
            claims.exp = Some((Utc::now() + Duration::minutes(ttl)).timestamp());
        }

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::Issue(e.to_string()))
    }

    pub fn parse(&self, token: &str) -> Result<Claims, CredentialError> {
        let header = decode_header(token).map_err(|e| CredentialError::Invalid(e.to_string()))?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(CredentialError::Invalid(format!(
                "unexpected signing method: {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| CredentialError::Invalid(e.to_string()))
    }
}
