use service_core::error::AppError;
use thiserror::Error;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const VALUE_TOO_LONG: &str = "22001";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Duplicate key: {0}")]
    UniqueViolation(String),

    #[error("The record is referenced by, or references, a missing record")]
    ForeignKeyViolation,

    #[error("Value too long for column")]
    ValueTooLong,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Incorrect password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return ServiceError::NotFound("record");
        }

        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        match code.as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let constraint = err
                    .as_database_error()
                    .and_then(|db| db.constraint())
                    .unwrap_or("unique constraint")
                    .to_string();
                ServiceError::UniqueViolation(constraint)
            }
            Some(FOREIGN_KEY_VIOLATION) => ServiceError::ForeignKeyViolation,
            Some(VALUE_TOO_LONG) => ServiceError::ValueTooLong,
            _ => ServiceError::Database(err),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("The requested {} was not found", what))
            }
            ServiceError::UniqueViolation(_) => AppError::Conflict(anyhow::anyhow!(
                "Duplicate key error (unique constraint violation)"
            )),
            ServiceError::ForeignKeyViolation => AppError::Conflict(anyhow::anyhow!(
                "The record is used by, or refers to, other records"
            )),
            ServiceError::ValueTooLong => {
                AppError::BadRequest(anyhow::anyhow!("Value too long for column"))
            }
            ServiceError::BadRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Forbidden(msg) => AppError::Forbidden(anyhow::anyhow!(msg)),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::InvalidCredentials => {
                AppError::BadRequest(anyhow::anyhow!("Incorrect password"))
            }
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Redis(e) => AppError::RedisError(e),
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
