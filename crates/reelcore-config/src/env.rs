//! Environment configuration read at process startup.
//!
//! Exact variable names are a deployment concern; these are this
//! implementation's choices, following the `BUILDIT_EXECUTOR`-style naming
//! the rest of the workspace uses.

use crate::error::{ConfigError, ConfigResult};

/// Default workflow context TTL: 7 days (spec §5).
pub const DEFAULT_WORKFLOW_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Default workflow lock TTL: 30 s (spec §4.1, §5).
pub const DEFAULT_LOCK_TTL_SECONDS: u64 = 30;

/// Resolved settings for the orchestration core, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub redis_url: String,
    pub broker_database_url: String,
    pub s3_endpoint: Option<String>,
    pub s3_bucket: String,
    pub s3_region: String,
    pub workflow_ttl_seconds: u64,
    pub lock_ttl_seconds: u64,
    /// Global toggle for §4.3 artifact upload. When disabled, stage output
    /// normalization never adds `<field>_minio_url`.
    pub auto_upload_to_minio: bool,
    /// Root directory under which `shared_storage_path` directories are
    /// created (spec §4.3 path scheme, `<root>`).
    pub storage_root: String,
}

impl Settings {
    /// Load settings from the process environment. Fails fast on a missing
    /// required variable rather than silently defaulting, mirroring the
    /// fail-fast policy the state store itself follows on connection loss.
    pub fn from_env() -> ConfigResult<Self> {
        let redis_url = require_env("REELCORE_REDIS_URL")?;
        let broker_database_url = require_env("REELCORE_BROKER_DATABASE_URL")?;
        let s3_endpoint = std::env::var("REELCORE_S3_ENDPOINT").ok();
        let s3_bucket = std::env::var("REELCORE_S3_BUCKET").unwrap_or_else(|_| "reelcore-artifacts".to_string());
        let s3_region = std::env::var("REELCORE_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let storage_root =
            std::env::var("REELCORE_STORAGE_ROOT").unwrap_or_else(|_| "/share/workflows".to_string());

        let workflow_ttl_seconds = parse_env_u64(
            "REELCORE_WORKFLOW_TTL_SECONDS",
            DEFAULT_WORKFLOW_TTL_SECONDS,
        )?;
        let lock_ttl_seconds = parse_env_u64("REELCORE_LOCK_TTL_SECONDS", DEFAULT_LOCK_TTL_SECONDS)?;
        let auto_upload_to_minio = parse_env_bool("REELCORE_AUTO_UPLOAD_TO_MINIO", true)?;

        Ok(Self {
            redis_url,
            broker_database_url,
            s3_endpoint,
            s3_bucket,
            s3_region,
            workflow_ttl_seconds,
            lock_ttl_seconds,
            auto_upload_to_minio,
            storage_root,
        })
    }
}

fn require_env(name: &str) -> ConfigResult<String> {
    std::env::var(name).map_err(|_| ConfigError::MissingField(name.to_string()))
}

fn parse_env_u64(name: &str, default: u64) -> ConfigResult<u64> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            field: name.to_string(),
            message: format!("expected an integer, got '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> ConfigResult<bool> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                field: name.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        },
        Err(_) => Ok(default),
    }
}
