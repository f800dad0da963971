use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::{collections::HashMap, sync::Mutex, time::Duration};

use super::ServiceError;
use crate::config::SmtpConfig;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Mail a one-time verification code to `to_email`.
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.email.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Email(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, port = config.port, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.email.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), ServiceError> {
        let from = self
            .from_email
            .parse()
            .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?;
        let to = to_email
            .parse()
            .map_err(|e: lettre::address::AddressError| ServiceError::BadRequest(e.to_string()))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        // SmtpTransport is blocking.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), ServiceError> {
        let html_body = format!(
            r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>Verify your email</h2>
        <p>Use the code below to finish creating your account:</p>
        <p style="font-size: 24px; letter-spacing: 4px;"><strong>{}</strong></p>
        <p style="color: #666; font-size: 12px;">
            The code expires in a few minutes. If you didn't sign up, please ignore this email.
        </p>
    </body>
</html>"###,
            code
        );

        let plain_body = format!(
            "Verify your email\n\nYour verification code is {}\n\nThe code expires in a few minutes. If you didn't sign up, please ignore this email.",
            code
        );

        self.send_email(to_email, "Your verification code", plain_body, html_body)
            .await
    }
}

/// Records codes instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    sent: Mutex<HashMap<String, String>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code mailed to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent.lock().ok()?.get(email).cloned()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_otp(&self, to_email: &str, code: &str) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Mailbox mutex poisoned: {}", e)))?
            .insert(to_email.to_string(), code.to_string());
        Ok(())
    }
}
