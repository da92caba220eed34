use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub data_path: String,
    pub log_dir: Option<PathBuf>,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub max_tokens: u32,
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
}

impl Config {
    /// Read settings from the environment after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is normal in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            addr: try_load(&lookup, "FLASHCARDS_ADDR", "0.0.0.0:11111")?,
            data_path: try_load(&lookup, "FLASHCARDS_DATA", "flashcards_data")?,
            log_dir: lookup("FLASHCARDS_LOG_DIR").map(PathBuf::from),
            openai_api_key: required(&lookup, "OPENAI_API_KEY")?,
            openai_base_url: try_load(&lookup, "OPENAI_BASE_URL", "https://api.openai.com/v1")?,
            openai_model: try_load(&lookup, "OPENAI_MODEL", "gpt-4o-mini")?,
            max_tokens: try_load(&lookup, "FLASHCARDS_MAX_TOKENS", "1500")?,
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            jwt_ttl_secs: try_load(&lookup, "JWT_TTL_SECS", "3600")?,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    match value.parse::<T>() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_secrets_set() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("JWT_SECRET", "secret"),
        ]))
        .expect("Config");

        assert_eq!(config.addr, "0.0.0.0:11111".parse().unwrap());
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.jwt_ttl_secs, 3600);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn test_unparsable_value_is_reported() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("JWT_SECRET", "secret"),
            ("FLASHCARDS_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "FLASHCARDS_MAX_TOKENS", .. }));
    }
}
