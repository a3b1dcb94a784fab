mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, DatabaseConfig, HashAlgorithm, LogFormat, LoggingConfig,
    StatusUpdatePolicy, BCRYPT_MAX_COST, BCRYPT_MIN_COST,
};
