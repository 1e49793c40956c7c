//! Process configuration loaded from environment variables at startup.
//! Values are read once and passed down explicitly; nothing here is a
//! mutable global. In particular the token signing secret travels inside
//! `AppConfig` into the `TokenService` rather than living in a module
//! constant.

use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 3000;
pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

/// Upper bound on post content, in bytes. Generous for a short-text board.
pub const MAX_CONTENT_BYTES: usize = 5000;

/// Upper bound on a profile picture upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_port: u16,
    pub data_root: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

impl AppConfig {
    /// Read configuration from `MINIBOARD_*` environment variables,
    /// falling back to development defaults.
    pub fn from_env() -> Self {
        let http_port = std::env::var("MINIBOARD_HTTP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_HTTP_PORT);
        let data_root = std::env::var("MINIBOARD_DATA_ROOT")
            .unwrap_or_else(|_| DEFAULT_DATA_ROOT.to_string());
        let jwt_secret = match std::env::var("MINIBOARD_JWT_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                warn!("MINIBOARD_JWT_SECRET not set; using an insecure development secret");
                "insecure-dev-secret".to_string()
            }
        };
        let token_ttl_days = std::env::var("MINIBOARD_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);
        Self { http_port, data_root, jwt_secret, token_ttl_days }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            data_root: DEFAULT_DATA_ROOT.to_string(),
            jwt_secret: "insecure-dev-secret".to_string(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
        }
    }
}
