use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

use crate::render::DEFAULT_SIZE;

const DEFAULT_ENVIRONMENT: &str = "production";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Development,
    /// Unset `APP_ENV` lands here so internal error details stay hidden.
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("expected development or production, got {other:?}")),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => f.write_str("development"),
            Environment::Production => f.write_str("production"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub static_dir: PathBuf,
    pub max_body_bytes: usize,
    pub max_qr_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            environment: Environment::default(),
            static_dir: PathBuf::from("public"),
            max_body_bytes: 10 * 1024 * 1024,
            max_qr_size: 2000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self {
            port: try_load("PORT", "3000")?,
            environment: try_load("APP_ENV", DEFAULT_ENVIRONMENT)?,
            static_dir: try_load("STATIC_DIR", "public")?,
            max_body_bytes: try_load("MAX_BODY_BYTES", "10485760")?,
            max_qr_size: try_load("MAX_QR_SIZE", "2000")?,
        };

        if config.max_qr_size < DEFAULT_SIZE {
            return Err(ConfigError::Invalid {
                key: "MAX_QR_SIZE",
                reason: format!("must be at least the default size {DEFAULT_SIZE}"),
            });
        }

        Ok(config)
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    parse_value(
        key,
        &var(key).unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }),
    )
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");

        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 8080 "), Ok(8080));
        assert_eq!(
            parse_value::<Environment>("APP_ENV", "Production"),
            Ok(Environment::Production)
        );
        assert_eq!(
            parse_value::<PathBuf>("STATIC_DIR", "dist"),
            Ok(PathBuf::from("dist"))
        );
    }

    #[test]
    fn test_parse_value_invalid() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = parse_value::<Environment>("APP_ENV", "staging").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid APP_ENV value: expected development or production, got \"staging\""
        );
    }

    #[test]
    fn test_environment() {
        assert!(Environment::Development.is_development());
        assert!(!Environment::Production.is_development());
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_body_bytes, 10_485_760);
        assert_eq!(config.max_qr_size, 2000);
    }

    #[test]
    fn test_unset_environment_hides_details() {
        assert_eq!(
            try_load::<Environment>("QRGEN_TEST_UNSET_APP_ENV", DEFAULT_ENVIRONMENT),
            Ok(Environment::Production)
        );
        assert_eq!(Environment::default(), Environment::Production);
        assert!(!Config::default().environment.is_development());
    }
}
