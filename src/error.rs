use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

use crate::auth::CodecError;
use crate::session::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Implement conversion from sqlx::Error
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(DatabaseError::MigrationError(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

// Implement actix_web::ResponseError for AppError
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = self.to_string();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": message
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::MissingToken
                | AuthError::MalformedOrUnsignedToken
                | AuthError::UnsupportedAlgorithm
                | AuthError::RevokedOrUnknownSession
                | AuthError::PrincipalNotFound
                | AuthError::TokenExpired
                | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::DuplicateRegistration(_) => StatusCode::CONFLICT,
                AuthError::StoreUnavailable(_) | AuthError::Directory(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                AuthError::TokenEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failures of the session lifecycle: issuance, validation, rotation and
/// the user directory operations it depends on.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("No authorization token provided")]
    MissingToken,

    #[error("Malformed or unsigned token")]
    MalformedOrUnsignedToken,

    #[error("Unsupported token algorithm")]
    UnsupportedAlgorithm,

    #[error("Token is invalid or session has expired")]
    RevokedOrUnknownSession,

    #[error("The user belonging to this token no longer exists")]
    PrincipalNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("User with this {0} already exists")]
    DuplicateRegistration(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token encoding failed: {0}")]
    TokenEncoding(String),

    #[error("User directory error: {0}")]
    Directory(#[from] DatabaseError),
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidSignature | CodecError::MalformedToken(_) => {
                AuthError::MalformedOrUnsignedToken
            }
            CodecError::UnsupportedAlgorithm(_) => AuthError::UnsupportedAlgorithm,
            CodecError::Encoding(msg) => AuthError::TokenEncoding(msg),
            e @ CodecError::LifetimeOutOfRange(_) => AuthError::TokenEncoding(e.to_string()),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AuthError::RevokedOrUnknownSession,
            StoreError::InvalidTtl(_) | StoreError::Unavailable(_) => {
                AuthError::StoreUnavailable(err.to_string())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DatabaseError::Duplicate,
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}
