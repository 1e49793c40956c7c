//! Unified application error model and mapping helpers.
//! Every domain failure is expressed as an `AppError` and converted at the
//! HTTP boundary into the uniform response envelope; no storage or internal
//! detail beyond a short message ever leaves the process.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// No credential, or a credential whose signature or expiry check failed.
    Unauthenticated { message: String },
    /// Valid identity, but not entitled to mutate the resource.
    Forbidden { message: String },
    NotFound { message: String },
    AlreadyExists { message: String },
    /// Unknown email or wrong password; deliberately a single kind.
    InvalidCredentials { message: String },
    /// A required field was missing or out of bounds.
    Validation { message: String },
    /// Storage or unexpected failure; the only kind a caller may retry.
    Server { message: String },
}

impl AppError {
    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self {
        AppError::Unauthenticated { message: msg.into() }
    }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        AppError::Forbidden { message: msg.into() }
    }
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        AppError::NotFound { message: msg.into() }
    }
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        AppError::AlreadyExists { message: msg.into() }
    }
    pub fn invalid_credentials() -> Self {
        AppError::InvalidCredentials { message: "Invalid credentials".into() }
    }
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation { message: msg.into() }
    }
    pub fn server<S: Into<String>>(msg: S) -> Self {
        AppError::Server { message: msg.into() }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthenticated { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::AlreadyExists { message }
            | AppError::InvalidCredentials { message }
            | AppError::Validation { message }
            | AppError::Server { message } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::AlreadyExists { .. } => 400,
            AppError::InvalidCredentials { .. } => 400,
            AppError::Validation { .. } => 400,
            AppError::Server { .. } => 500,
        }
    }

    /// Only `Server` failures are possibly transient; everything else is
    /// terminal for the request that produced it.
    pub fn retryable(&self) -> bool {
        matches!(self, AppError::Server { .. })
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Server { message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Server { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::unauthenticated("no token").http_status(), 401);
        assert_eq!(AppError::forbidden("not yours").http_status(), 403);
        assert_eq!(AppError::not_found("missing").http_status(), 404);
        assert_eq!(AppError::already_exists("dup").http_status(), 400);
        assert_eq!(AppError::invalid_credentials().http_status(), 400);
        assert_eq!(AppError::validation("required").http_status(), 400);
        assert_eq!(AppError::server("io").http_status(), 500);
    }

    #[test]
    fn only_server_errors_are_retryable() {
        assert!(AppError::server("io").retryable());
        assert!(!AppError::not_found("missing").retryable());
        assert!(!AppError::unauthenticated("no token").retryable());
    }
}
