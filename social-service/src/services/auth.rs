use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    cache::KeyValueCache,
    email::EmailProvider,
    jwt::{Claims, JwtService},
    repository::{SessionStore, UserLookup, UserRepository},
    ServiceError,
};
use crate::{
    config::OtpConfig,
    models::{user_status, user_type, SanitizedUser, Session, User},
    utils::{generate_otp, hash_password, otp_key, verify_password, Password},
};

/// Sessions are revoked by deletion, not by age.
const SESSION_LIFETIME_HOURS: i64 = 999_999;

/// Platform name reserved for admin accounts.
pub const ADMIN_PLATFORM: &str = "admin";

/// Where a request came from, recorded on new sessions.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: Password,
    pub gender: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Password,
    pub platform: String,
}

/// A freshly opened session and the credential bound to it.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: SanitizedUser,
    pub session: Session,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    cache: Arc<dyn KeyValueCache>,
    email: Arc<dyn EmailProvider>,
    jwt: JwtService,
    otp: OtpConfig,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        cache: Arc<dyn KeyValueCache>,
        email: Arc<dyn EmailProvider>,
        jwt: JwtService,
        otp: OtpConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            cache,
            email,
            jwt,
            otp,
        }
    }

    /// Create an unverified account and mail it a one-time code.
    pub async fn register(&self, registration: Registration) -> Result<SanitizedUser, ServiceError> {
        for lookup in [
            UserLookup::Username(registration.username.clone()),
            UserLookup::Email(registration.email.clone()),
        ] {
            match self.users.find_user(lookup).await {
                Ok(_) => return Err(ServiceError::Conflict("User already exists".into())),
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let now = Utc::now();
        let user = self
            .users
            .create_user(User {
                id: Uuid::new_v4(),
                full_name: registration.full_name,
                username: registration.username,
                email: registration.email,
                password: hash_password(&registration.password)?,
                user_type: user_type::USER.to_string(),
                user_role: user_type::USER.to_string(),
                status: user_status::INVERIFY.to_string(),
                avatar_id: None,
                gender: registration.gender,
                created_at: now,
                updated_at: now,
            })
            .await?;

        // An account whose code never went out could not be verified or
        // registered again, so it is removed.
        if let Err(e) = self.send_verification_code(&user.email).await {
            tracing::warn!(
                user_id = %user.id,
                error = %e,
                "Verification code not delivered, removing account"
            );
            if let Err(cleanup) = self.users.delete_user(user.id).await {
                tracing::error!(
                    user_id = %user.id,
                    error = %cleanup,
                    "Failed to remove undeliverable account"
                );
            }
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "User registered, verification code sent");
        Ok(user.sanitized())
    }

    async fn send_verification_code(&self, email: &str) -> Result<(), ServiceError> {
        let code = generate_otp(self.otp.length);
        self.cache
            .set(&otp_key(email), &code, self.otp.ttl_seconds)
            .await?;
        self.email.send_otp(email, &code).await
    }

    /// Consume the emailed code, activate the account and sign it in.
    pub async fn verify_email(
        &self,
        email: &str,
        otp: &str,
        platform: &str,
        client: ClientInfo,
    ) -> Result<SignedIn, ServiceError> {
        let key = otp_key(email);
        match self.cache.get(&key).await? {
            Some(expected) if expected == otp => {}
            _ => return Err(ServiceError::BadRequest("Incorrect otp".into())),
        }

        let mut user = self.users.find_user(UserLookup::Email(email.to_string())).await?;
        self.cache.delete(&key).await?;

        user.status = user_status::ACTIVE.to_string();
        let user = self.users.update_user(user).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        self.open_session(user, platform, client).await
    }

    pub async fn login(
        &self,
        attempt: LoginAttempt,
        client: ClientInfo,
    ) -> Result<SignedIn, ServiceError> {
        let lookup = match (non_empty(attempt.username), non_empty(attempt.email)) {
            (Some(username), _) => UserLookup::Username(username),
            (None, Some(email)) => UserLookup::Email(email),
            (None, None) => {
                return Err(ServiceError::BadRequest(
                    "username or email is required".into(),
                ))
            }
        };
        let user = self.users.find_user(lookup).await?;

        let admin_platform = attempt.platform == ADMIN_PLATFORM;
        if user.user_type == user_type::USER && admin_platform {
            return Err(ServiceError::BadRequest("User can't login to admin web".into()));
        }
        if user.is_admin() && !admin_platform {
            return Err(ServiceError::BadRequest(
                "Admin can only login to admin web".into(),
            ));
        }

        if !verify_password(&attempt.password, &user.password)? {
            tracing::warn!(user_id = %user.id, "Login failed: incorrect password");
            return Err(ServiceError::InvalidCredentials);
        }

        self.open_session(user, &attempt.platform, client).await
    }

    /// Delete the session; every credential naming it stops working.
    pub async fn logout(&self, session_id: Uuid) -> Result<(), ServiceError> {
        self.sessions.delete_session(session_id).await?;
        tracing::info!(%session_id, "Session closed");
        Ok(())
    }

    async fn open_session(
        &self,
        user: User,
        platform: &str,
        client: ClientInfo,
    ) -> Result<SignedIn, ServiceError> {
        let now = Utc::now();
        let session = self
            .sessions
            .create_session(Session {
                id: Uuid::new_v4(),
                user_id: user.id,
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                is_active: true,
                expires_at: now + Duration::hours(SESSION_LIFETIME_HOURS),
                last_active_at: now,
                platform: platform.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        let claims = Claims::new(
            user.id,
            user.user_role.clone(),
            user.user_type.clone(),
            platform,
            session.id,
        );
        let access_token = self
            .jwt
            .issue(&claims)
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))?;

        tracing::info!(user_id = %user.id, session_id = %session.id, %platform, "Session opened");
        Ok(SignedIn {
            user: user.sanitized(),
            session,
            access_token,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
