use serde::Deserialize;

use crate::domain::DomainError;

/// bcrypt accepts work factors in this range
pub const BCRYPT_MIN_COST: u32 = 4;
pub const BCRYPT_MAX_COST: u32 = 31;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Password hashing and credential policy settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bytes of raw entropy per salt, before base64 encoding
    pub salt_key_size: usize,
    /// Work factor handed to the hash algorithm
    pub hash_cost: u32,
    pub algorithm: HashAlgorithm,
    pub status_update_policy: StatusUpdatePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Bcrypt,
    Argon2,
}

/// Whether changing a user's enabled state requires that user's password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusUpdatePolicy {
    /// The supplied password must verify against the target user
    #[default]
    RequirePassword,
    /// The supplied password is ignored
    Unchecked,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL; `DATABASE_URL` is used when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            salt_key_size: 24,
            hash_cost: 12,
            algorithm: HashAlgorithm::default(),
            status_update_policy: StatusUpdatePolicy::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AuthConfig {
    /// Reject settings the hash algorithms would refuse at runtime
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.salt_key_size == 0 {
            return Err(DomainError::configuration(
                "auth.salt_key_size must be greater than zero",
            ));
        }

        match self.algorithm {
            HashAlgorithm::Bcrypt
                if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.hash_cost) =>
            {
                Err(DomainError::configuration(format!(
                    "auth.hash_cost must be between {} and {} for bcrypt, got {}",
                    BCRYPT_MIN_COST, BCRYPT_MAX_COST, self.hash_cost
                )))
            }
            HashAlgorithm::Argon2 if self.hash_cost == 0 => Err(DomainError::configuration(
                "auth.hash_cost must be at least 1 for argon2",
            )),
            _ => Ok(()),
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, falling back to the `DATABASE_URL` environment variable
    pub fn resolve_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
