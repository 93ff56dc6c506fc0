// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Which store backs the credential and profile collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Firestore,
    Memory,
}

/// Order in which watch history is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// The order of the references stored on the user (append order).
    #[default]
    Stored,
    /// Stored order reversed, latest append first.
    MostRecentFirst,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Allowed CORS origin (credentials enabled)
    pub cors_origin: String,
    pub database_backend: DatabaseBackend,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,

    /// HMAC key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_token_expiry_secs: i64,
    /// HMAC key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry_secs: i64,

    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,

    /// Directory where multipart uploads are staged before forwarding
    pub upload_dir: PathBuf,
    /// Body limit for multipart routes
    pub max_upload_bytes: usize,
    pub history_order: HistoryOrder,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8000,
            cors_origin: "http://localhost:5173".to_string(),
            database_backend: DatabaseBackend::Memory,
            gcp_project_id: "test-project".to_string(),
            access_token_secret: b"test_access_key_32_bytes_minimum".to_vec(),
            access_token_expiry_secs: 24 * 60 * 60,
            refresh_token_secret: b"test_refresh_key_32_bytes_minimu".to_vec(),
            refresh_token_expiry_secs: 10 * 24 * 60 * 60,
            cloudinary_cloud_name: "test-cloud".to_string(),
            cloudinary_api_key: "test_api_key".to_string(),
            cloudinary_api_secret: "test_api_secret".to_string(),
            upload_dir: env::temp_dir().join("video-accounts-test"),
            max_upload_bytes: 10 * 1024 * 1024,
            history_order: HistoryOrder::Stored,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_backend = match env::var("DATABASE_BACKEND").as_deref() {
            Err(_) | Ok("firestore") => DatabaseBackend::Firestore,
            Ok("memory") => DatabaseBackend::Memory,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "DATABASE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let history_order = match env::var("WATCH_HISTORY_ORDER").as_deref() {
            Err(_) | Ok("stored") => HistoryOrder::Stored,
            Ok("recent-first") => HistoryOrder::MostRecentFirst,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "WATCH_HISTORY_ORDER",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_backend,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            access_token_expiry_secs: expiry_from_env("ACCESS_TOKEN_EXPIRY", "1d")?,
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_expiry_secs: expiry_from_env("REFRESH_TOKEN_EXPIRY", "10d")?,

            cloudinary_cloud_name: env::var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
            cloudinary_api_key: env::var("CLOUDINARY_API_KEY")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            cloudinary_api_secret: env::var("CLOUDINARY_API_SECRET")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/temp")),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            history_order,
        })
    }
}

fn expiry_from_env(name: &'static str, default: &str) -> Result<i64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_expiry(&raw).ok_or(ConfigError::Invalid { name, value: raw })
}

/// Parse a lifetime such as `900`, `15m`, `1h`, `10d` into seconds.
pub fn parse_expiry(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let amount: i64 = digits.parse().ok()?;

    let multiplier = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return None,
    };

    let secs = amount.checked_mul(multiplier)?;
    (secs > 0).then_some(secs)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
