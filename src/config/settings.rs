//! Shared defaults read from the environment, and per-channel resolution of
//! credentials against them.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::consts::{
    AMADEUS_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MODEL, OPENAI_API_URL,
    TELEGRAM_API_URL, TRAVELPAYOUTS_API_URL, UNSPLASH_API_URL, WIKIPEDIA_API_URL,
};
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

use super::channel::ChannelConfig;

/// Base URLs of every external API. Overridden in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub travelpayouts: String,
    pub amadeus: String,
    pub openai: String,
    pub telegram: String,
    pub unsplash: String,
    pub wikipedia: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            travelpayouts: TRAVELPAYOUTS_API_URL.to_string(),
            amadeus: AMADEUS_API_URL.to_string(),
            openai: OPENAI_API_URL.to_string(),
            telegram: TELEGRAM_API_URL.to_string(),
            unsplash: UNSPLASH_API_URL.to_string(),
            wikipedia: WIKIPEDIA_API_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointed at one base URL (a mock server).
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            travelpayouts: base.clone(),
            amadeus: base.clone(),
            openai: base.clone(),
            telegram: base.clone(),
            unsplash: base.clone(),
            wikipedia: base,
        }
    }
}

/// Process-wide settings: default credentials plus tunables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<SecretString>,
    pub openai_key: Option<SecretString>,
    pub travelpayouts_token: Option<SecretString>,
    pub travelpayouts_marker: Option<String>,
    pub unsplash_key: Option<SecretString>,
    pub model: String,
    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            amadeus_client_id: None,
            amadeus_client_secret: None,
            openai_key: None,
            travelpayouts_token: None,
            travelpayouts_marker: None,
            unsplash_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, so tests don't touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_env(&get, "RETRY_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts),
            min_wait: parse_env(&get, "RETRY_MIN_WAIT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.min_wait),
            max_wait: parse_env(&get, "RETRY_MAX_WAIT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_wait),
        };
        let http_timeout = Duration::from_secs(
            parse_env(&get, "HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        let mut endpoints = Endpoints::default();
        if let Some(url) = get("AMADEUS_BASE_URL") {
            endpoints.amadeus = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            endpoints.openai = url.trim_end_matches('/').to_string();
        }

        Ok(Self {
            amadeus_client_id: get("AMADEUS_CLIENT_ID"),
            amadeus_client_secret: get("AMADEUS_CLIENT_SECRET").map(SecretString::from),
            openai_key: get("OPENAI_API_KEY").map(SecretString::from),
            travelpayouts_token: get("TRAVELPAYOUTS_TOKEN").map(SecretString::from),
            travelpayouts_marker: get("TRAVELPAYOUTS_MARKER"),
            unsplash_key: get("UNSPLASH_ACCESS_KEY").map(SecretString::from),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoints,
            retry,
            http_timeout,
        })
    }

    /// Credentials for one channel: its own override when set, else ours.
    pub fn credentials_for(&self, channel: &ChannelConfig) -> Credentials {
        fn pick(own: &Option<SecretString>, shared: &Option<SecretString>) -> Option<SecretString> {
            own.as_ref()
                .filter(|v| !v.expose_secret().trim().is_empty())
                .or(shared.as_ref())
                .cloned()
        }
        fn pick_plain(own: &Option<String>, shared: &Option<String>) -> Option<String> {
            own.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| shared.clone())
        }

        Credentials {
            amadeus_client_id: pick_plain(&channel.amadeus_client_id, &self.amadeus_client_id),
            amadeus_client_secret: pick(&channel.amadeus_client_secret, &self.amadeus_client_secret),
            openai_key: pick(&channel.openai_key, &self.openai_key),
            travelpayouts_token: pick(&channel.travelpayouts_token, &self.travelpayouts_token),
            travelpayouts_marker: pick_plain(&channel.travelpayouts_marker, &self.travelpayouts_marker),
            unsplash_key: pick(&channel.unsplash_key, &self.unsplash_key),
        }
    }
}

/// The credential set one channel runs with.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub amadeus_client_id: Option<String>,
    pub amadeus_client_secret: Option<SecretString>,
    pub openai_key: Option<SecretString>,
    pub travelpayouts_token: Option<SecretString>,
    pub travelpayouts_marker: Option<String>,
    pub unsplash_key: Option<SecretString>,
}

fn parse_env<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let s = settings(&[]).unwrap();
        assert!(s.openai_key.is_none());
        assert_eq!(s.model, DEFAULT_MODEL);
        assert_eq!(s.retry, RetryPolicy::default());
        assert_eq!(s.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(s.endpoints, Endpoints::default());
    }

    #[test]
    fn reads_credentials_and_tunables() {
        let s = settings(&[
            ("OPENAI_API_KEY", "sk-shared"),
            ("TRAVELPAYOUTS_MARKER", "12345"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("RETRY_MIN_WAIT_SECS", "2"),
            ("RETRY_MAX_WAIT_SECS", "20"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("OPENAI_BASE_URL", "http://localhost:8080/"),
        ])
        .unwrap();
        assert_eq!(s.openai_key.unwrap().expose_secret(), "sk-shared");
        assert_eq!(s.travelpayouts_marker.as_deref(), Some("12345"));
        assert_eq!(s.retry.max_attempts, 5);
        assert_eq!(s.retry.min_wait, Duration::from_secs(2));
        assert_eq!(s.retry.max_wait, Duration::from_secs(20));
        assert_eq!(s.http_timeout, Duration::from_secs(5));
        assert_eq!(s.endpoints.openai, "http://localhost:8080");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = settings(&[("OPENAI_API_KEY", "   ")]).unwrap();
        assert!(s.openai_key.is_none());
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = settings(&[("RETRY_MAX_ATTEMPTS", "lots")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: "RETRY_MAX_ATTEMPTS",
                ..
            }
        ));
    }

    #[test]
    fn channel_override_wins() {
        let s = settings(&[("OPENAI_API_KEY", "sk-shared"), ("TRAVELPAYOUTS_TOKEN", "tp-shared")])
            .unwrap();
        let mut channel = ChannelConfig::new("t", "c", "NYC");
        channel.openai_key = Some(SecretString::from("sk-own".to_string()));

        let creds = s.credentials_for(&channel);
        assert_eq!(creds.openai_key.unwrap().expose_secret(), "sk-own");
        assert_eq!(creds.travelpayouts_token.unwrap().expose_secret(), "tp-shared");
        assert!(creds.amadeus_client_id.is_none());
    }

    #[test]
    fn empty_override_falls_back() {
        let s = settings(&[("OPENAI_API_KEY", "sk-shared")]).unwrap();
        let mut channel = ChannelConfig::new("t", "c", "NYC");
        channel.openai_key = Some(SecretString::from(String::new()));
        assert_eq!(
            s.credentials_for(&channel).openai_key.unwrap().expose_secret(),
            "sk-shared"
        );
    }

    #[test]
    fn overrides_do_not_leak_between_channels() {
        let s = settings(&[("OPENAI_API_KEY", "sk-shared")]).unwrap();
        let mut first = ChannelConfig::new("t", "a", "NYC");
        first.openai_key = Some(SecretString::from("sk-first".to_string()));
        let second = ChannelConfig::new("t", "b", "LON");

        let key = |c: &ChannelConfig| {
            s.credentials_for(c)
                .openai_key
                .map(|k| k.expose_secret().to_string())
        };
        assert_eq!(key(&first).as_deref(), Some("sk-first"));
        assert_eq!(key(&second).as_deref(), Some("sk-shared"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let s = settings(&[("OPENAI_API_KEY", "sk-super-secret")]).unwrap();
        let creds = Credentials {
            openai_key: Some(SecretString::from("sk-super-secret".to_string())),
            travelpayouts_marker: Some("12345".to_string()),
            ..Credentials::default()
        };
        let out = format!("{creds:?} {s:?}");
        assert!(!out.contains("sk-super-secret"), "{out}");
        assert!(out.contains("12345"));
    }
}
