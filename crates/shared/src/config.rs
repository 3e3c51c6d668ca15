//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Image storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin. Any origin is allowed when unset.
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL. The in-memory store is used when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Raw image storage settings.
///
/// Every credential is optional. Which ones are required depends on
/// `provider`; a provider with missing credentials runs in placeholder mode.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Provider kind: `imagekit`, `s3` or `fs`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// ImageKit public key.
    #[serde(default)]
    pub public_key: Option<String>,
    /// ImageKit private key.
    #[serde(default)]
    pub private_key: Option<String>,
    /// ImageKit URL endpoint, or the S3 API endpoint.
    #[serde(default)]
    pub url_endpoint: Option<String>,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// S3 access key ID.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Filesystem root for the `fs` provider.
    #[serde(default)]
    pub root: Option<String>,
    /// Base URL under which S3/fs objects are publicly served.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Maximum upload attempts, including the first one.
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,
    /// Backoff between upload attempts in milliseconds (multiplied by attempt number).
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Keep a copy of uploaded bytes on the post record.
    #[serde(default = "default_retain_raw_image")]
    pub retain_raw_image: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            public_key: None,
            private_key: None,
            url_endpoint: None,
            bucket: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            root: None,
            public_base_url: None,
            upload_attempts: default_upload_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retain_raw_image: default_retain_raw_image(),
        }
    }
}

fn default_provider() -> String {
    "imagekit".to_string()
}

fn default_upload_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_retain_raw_image() -> bool {
    true
}

/// Plain environment variables accepted for the database URL and the ImageKit
/// secrets, mapped to their config keys. `QUILL__*` variables take precedence.
const ENV_FALLBACKS: [(&str, &str); 4] = [
    ("DATABASE_URL", "database.url"),
    ("IMAGEKIT_PUBLIC_KEY", "storage.public_key"),
    ("IMAGEKIT_PRIVATE_KEY", "storage.private_key"),
    ("IMAGEKIT_URL_ENDPOINT", "storage.url_endpoint"),
];

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder();
        for (var, key) in ENV_FALLBACKS {
            if let Some(value) = std::env::var(var).ok().filter(|v| !v.trim().is_empty()) {
                builder = builder.set_default(key, value)?;
            }
        }

        let config = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("QUILL").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: [(&str, Option<&str>); 6] = [
        ("DATABASE_URL", None),
        ("QUILL__DATABASE__URL", None),
        ("IMAGEKIT_PUBLIC_KEY", None),
        ("IMAGEKIT_PRIVATE_KEY", None),
        ("IMAGEKIT_URL_ENDPOINT", None),
        ("QUILL__STORAGE__PRIVATE_KEY", None),
    ];

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars(CLEAR, || {
            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.storage.provider, "imagekit");
            assert_eq!(config.storage.upload_attempts, 3);
            assert!(config.storage.retain_raw_image);
            assert!(config.storage.private_key.is_none());
            assert!(config.database.url.is_none());
        });
    }

    #[test]
    fn test_database_url_fallback() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/quill_test")),
                ("QUILL__DATABASE__URL", None),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(
                    config.database.url.as_deref(),
                    Some("postgres://localhost/quill_test")
                );
            },
        );
    }

    #[test]
    fn test_prefixed_environment_overrides() {
        temp_env::with_vars(
            [
                ("QUILL__SERVER__PORT", Some("4100")),
                ("QUILL__STORAGE__UPLOAD_ATTEMPTS", Some("5")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.server.port, 4100);
                assert_eq!(config.storage.upload_attempts, 5);
            },
        );
    }

    #[test]
    fn test_imagekit_env_fallbacks() {
        temp_env::with_vars(
            [
                ("IMAGEKIT_PUBLIC_KEY", Some("public_abc")),
                ("IMAGEKIT_PRIVATE_KEY", Some("private_abc")),
                ("IMAGEKIT_URL_ENDPOINT", Some("https://ik.imagekit.io/demo")),
                ("QUILL__STORAGE__PRIVATE_KEY", None),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.storage.public_key.as_deref(), Some("public_abc"));
                assert_eq!(config.storage.private_key.as_deref(), Some("private_abc"));
                assert_eq!(
                    config.storage.url_endpoint.as_deref(),
                    Some("https://ik.imagekit.io/demo")
                );
            },
        );
    }

    #[test]
    fn test_prefixed_variable_beats_imagekit_fallback() {
        temp_env::with_vars(
            [
                ("IMAGEKIT_PRIVATE_KEY", Some("from_plain_env")),
                ("QUILL__STORAGE__PRIVATE_KEY", Some("from_prefixed_env")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(
                    config.storage.private_key.as_deref(),
                    Some("from_prefixed_env")
                );
            },
        );
    }
}
