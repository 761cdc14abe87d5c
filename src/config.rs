use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_QUESTIONS_FILE: &str = "questions.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TELEGRAM_API_KEY (or TELOXIDE_TOKEN) is not set")]
    MissingToken,
    #[error("QUIZ_SESSION_TTL_SECS must be a positive number of seconds, got '{0}'")]
    InvalidTtl(String),
}

/// Runtime settings, read from the environment after loading `.env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub questions_path: PathBuf,
    pub telegram_token: Option<String>,
    /// Idle sessions older than this are dropped. `None` keeps them forever.
    pub session_ttl: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            log::debug!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let questions_path = non_empty("QUIZ_QUESTIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_QUESTIONS_FILE));

        let telegram_token = non_empty("TELEGRAM_API_KEY").or_else(|| non_empty("TELOXIDE_TOKEN"));

        let session_ttl = match non_empty("QUIZ_SESSION_TTL_SECS") {
            None => None,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => return Err(ConfigError::InvalidTtl(raw)),
            },
        };

        Ok(Self {
            questions_path,
            telegram_token,
            session_ttl,
        })
    }

    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.telegram_token
            .as_deref()
            .ok_or(ConfigError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.questions_path, PathBuf::from(DEFAULT_QUESTIONS_FILE));
        assert_eq!(config.telegram_token, None);
        assert_eq!(config.session_ttl, None);
        assert_eq!(config.require_token(), Err(ConfigError::MissingToken));
    }

    #[test]
    fn telegram_key_wins_over_teloxide_token() {
        let config = load(&[("TELEGRAM_API_KEY", "abc"), ("TELOXIDE_TOKEN", "xyz")]).unwrap();
        assert_eq!(config.require_token(), Ok("abc"));

        let config = load(&[("TELEGRAM_API_KEY", " "), ("TELOXIDE_TOKEN", "xyz")]).unwrap();
        assert_eq!(config.require_token(), Ok("xyz"));
    }

    #[test]
    fn reads_path_and_ttl() {
        let config = load(&[
            ("QUIZ_QUESTIONS_FILE", "data/sase.json"),
            ("QUIZ_SESSION_TTL_SECS", "3600"),
        ])
        .unwrap();
        assert_eq!(config.questions_path, PathBuf::from("data/sase.json"));
        assert_eq!(config.session_ttl, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn rejects_bad_ttl() {
        assert_eq!(
            load(&[("QUIZ_SESSION_TTL_SECS", "0")]),
            Err(ConfigError::InvalidTtl("0".to_string()))
        );
        assert!(load(&[("QUIZ_SESSION_TTL_SECS", "soon")]).is_err());
    }
}
