//! Process configuration read from the environment (after `.env` is loaded by `dotenvy`).

use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::ConfigError;

const DEV_JWT_SECRET: &str = "your-secret-key-change-in-production";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_MESSAGE_LEN: usize = 2000;
const DEFAULT_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: Vec<u8>,
    pub bind_addr: SocketAddr,
    /// Upper bound on a chat body, in grapheme clusters.
    pub max_message_len: usize,
    /// Page size of `GET /api/chat/messages`.
    pub history_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing {
            key: "DATABASE_URL",
        })?;

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.as_bytes().to_vec()
            }
        };

        let bind_addr: SocketAddr = parse_or(&lookup, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;
        let max_message_len = parse_or(&lookup, "CHAT_MAX_MESSAGE_LEN", Some(DEFAULT_MAX_MESSAGE_LEN))?;
        let history_limit = parse_or(&lookup, "CHAT_HISTORY_LIMIT", Some(DEFAULT_HISTORY_LIMIT))?;

        if max_message_len == 0 {
            return Err(ConfigError::Invalid {
                key: "CHAT_MAX_MESSAGE_LEN",
                value: "0".into(),
            });
        }
        if history_limit < 1 {
            return Err(ConfigError::Invalid {
                key: "CHAT_HISTORY_LIMIT",
                value: history_limit.to_string(),
            });
        }

        Ok(Config {
            database_url,
            jwt_secret,
            bind_addr,
            max_message_len,
            history_limit,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => default.ok_or(ConfigError::Missing { key }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/skyline")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_message_len, 2000);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET.as_bytes());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing { key: "DATABASE_URL" }
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://db/skyline"),
            ("JWT_SECRET", "s3cret"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("CHAT_MAX_MESSAGE_LEN", "500"),
            ("CHAT_HISTORY_LIMIT", " 20 "),
        ])
        .unwrap();
        assert_eq!(config.jwt_secret, b"s3cret");
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_message_len, 500);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = config_from(&[
            ("DATABASE_URL", "postgres://db/skyline"),
            ("CHAT_MAX_MESSAGE_LEN", "lots"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "CHAT_MAX_MESSAGE_LEN",
                value: "lots".into()
            }
        );

        let err = config_from(&[
            ("DATABASE_URL", "postgres://db/skyline"),
            ("CHAT_HISTORY_LIMIT", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CHAT_HISTORY_LIMIT", .. }));
    }
}
