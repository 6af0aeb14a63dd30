use derive_more::derive::Display;
use reqwest::StatusCode;

use crate::auth::AuthError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Display)]
pub enum AppError {
    #[display("Not found: {_0}")]
    NotFound(String),
    #[display("Bad request: {_0}")]
    BadRequest(String),
    #[display("Unauthorized: {_0}")]
    Unauthorized(String),
    #[display("Request took too long")]
    RequestTimeout,
    #[display("Too many requests")]
    TooManyRequests,
    #[display("{_0} environment variable is required")]
    MissingCredential(&'static str),
    #[display("Gmail service not available")]
    MailUnavailable,
    #[display("Configuration error: {_0}")]
    Config(config::ConfigError),
    #[display("Could not authenticate with OAuth2: {_0}")]
    Oauth2(AuthError),
    Internal(anyhow::Error),
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        tracing::error!("Reqwest error: {:?}", error);
        match error.status() {
            Some(StatusCode::BAD_REQUEST) => AppError::BadRequest(error.to_string()),
            Some(StatusCode::REQUEST_TIMEOUT) => AppError::RequestTimeout,
            Some(StatusCode::TOO_MANY_REQUESTS) => AppError::TooManyRequests,
            _ if error.is_timeout() => AppError::RequestTimeout,
            _ => AppError::Internal(error.into()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error)
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        AppError::Oauth2(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal(error.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Internal(error.into())
    }
}

impl AppError {
    /// Maps a non-success HTTP status from an upstream API onto an error
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::BAD_REQUEST => AppError::BadRequest(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            StatusCode::REQUEST_TIMEOUT => AppError::RequestTimeout,
            StatusCode::TOO_MANY_REQUESTS => AppError::TooManyRequests,
            _ => AppError::Internal(anyhow::anyhow!("{} ({})", message, status)),
        }
    }
}
