//! Server configuration.

use serde::{Deserialize, Serialize};

use flora_core::{Error, Result};

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age_seconds: 3600,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Object-storage bucket URL (`s3://...` or `gs://...`). When unset the
    /// server falls back to in-memory storage (debug only).
    pub bucket: Option<String>,
}

/// Server configuration, loaded from `FLORA_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port.
    pub http_port: u16,
    /// Debug mode: pretty logs, in-memory storage fallback allowed.
    pub debug: bool,
    /// CORS settings.
    pub cors: CorsConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Object key of the published catalog snapshot.
    pub snapshot_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: true,
            cors: CorsConfig::default(),
            storage: StorageConfig::default(),
            snapshot_path: "flora/catalog.json".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set but unparsable.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("FLORA_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("FLORA_DEBUG")? {
            config.debug = debug;
        }
        if let Some(origins) = env_string("FLORA_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins =
                origins.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(max_age) = env_u64("FLORA_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }
        if let Some(bucket) = env_string("FLORA_STORAGE_BUCKET") {
            config.storage.bucket = Some(bucket);
        }
        if let Some(path) = env_string("FLORA_CATALOG_SNAPSHOT") {
            config.snapshot_path = path;
        }

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse()
        .map(Some)
        .map_err(|_| Error::InvalidInput(format!("{name} must be a port number (got '{v}')")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse()
        .map(Some)
        .map_err(|_| Error::InvalidInput(format!("{name} must be an integer (got '{v}')")))
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(Some(true)),
        "false" | "0" | "no" => Ok(Some(false)),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be true or false (got '{v}')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_debug_friendly() {
        let config = Config::default();
        assert_eq!(config.http_port, 8080);
        assert!(config.debug);
        assert!(config.storage.bucket.is_none());
        assert_eq!(config.snapshot_path, "flora/catalog.json");
    }

    #[test]
    fn bool_parsing_accepts_common_forms() {
        std::env::set_var("FLORA_TEST_BOOL_OK", "YES");
        assert_eq!(env_bool("FLORA_TEST_BOOL_OK").unwrap(), Some(true));

        std::env::set_var("FLORA_TEST_BOOL_BAD", "maybe");
        assert!(env_bool("FLORA_TEST_BOOL_BAD").is_err());

        std::env::remove_var("FLORA_TEST_BOOL_OK");
        std::env::remove_var("FLORA_TEST_BOOL_BAD");
    }
}
