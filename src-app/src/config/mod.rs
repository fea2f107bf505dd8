//! Configuration management: defaults, validation, loading from the environment.

pub mod app_config;
pub mod validation;

pub use app_config::AppConfig;

/// A setting that failed validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid setting {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}
