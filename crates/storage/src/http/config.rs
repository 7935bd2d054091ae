use std::env;
use std::time::Duration;

use crate::repository::AuthToken;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SUBMIT_RETRIES: u32 = 2;
const DEFAULT_SUBMIT_RETRY_DELAY_MS: u64 = 500;

/// Connection settings for the quiz backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub auth_token: Option<AuthToken>,
    pub timeout: Duration,
    pub submit_retries: u32,
    pub submit_retry_delay: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            auth_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            submit_retries: DEFAULT_SUBMIT_RETRIES,
            submit_retry_delay: Duration::from_millis(DEFAULT_SUBMIT_RETRY_DELAY_MS),
        }
    }
}

impl BackendConfig {
    /// Read `QUIZ_API_URL`, `QUIZ_AUTH_TOKEN`, `QUIZ_HTTP_TIMEOUT_SECS`,
    /// `QUIZ_SUBMIT_RETRIES` and `QUIZ_SUBMIT_RETRY_DELAY_MS`, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let base_url = lookup("QUIZ_API_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.base_url, |v| v.trim().trim_end_matches('/').to_owned());
        let auth_token = lookup("QUIZ_AUTH_TOKEN").and_then(AuthToken::new);
        let timeout = parsed("QUIZ_HTTP_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map_or(defaults.timeout, Duration::from_secs);
        let submit_retries = parsed("QUIZ_SUBMIT_RETRIES")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.submit_retries);
        let submit_retry_delay = parsed("QUIZ_SUBMIT_RETRY_DELAY_MS")
            .map_or(defaults.submit_retry_delay, Duration::from_millis);

        Self {
            base_url,
            auth_token,
            timeout,
            submit_retries,
            submit_retry_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let config = BackendConfig::from_lookup(lookup(&[]));
        assert_eq!(config.base_url, DEFAULT_API_URL);
        assert!(config.auth_token.is_none());
        assert_eq!(config.submit_retries, 2);
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let config = BackendConfig::from_lookup(lookup(&[
            ("QUIZ_API_URL", "https://quiz.example.com/api/"),
            ("QUIZ_AUTH_TOKEN", "jwt"),
            ("QUIZ_HTTP_TIMEOUT_SECS", "soon"),
            ("QUIZ_SUBMIT_RETRIES", "0"),
        ]));
        assert_eq!(config.base_url, "https://quiz.example.com/api");
        assert_eq!(config.auth_token.as_ref().map(AuthToken::as_str), Some("jwt"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.submit_retries, 0);
    }
}
