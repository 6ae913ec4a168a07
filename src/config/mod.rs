//! Channel configuration loading.
//!
//! Accepts either a bare JSON array of channels or an object with a
//! `channels` array and an optional `cron` expression. The cron expression
//! belongs to the deployment wrapper; it is validated here and exposed via
//! `--print-cron`, never scheduled by this process.

pub mod channel;
pub mod settings;

use std::path::Path;

use serde_json::Value;

use crate::consts::CHANNELS_ENV;
use crate::error::ConfigError;

pub use channel::{ChannelConfig, FlightProvider};
pub use settings::{Credentials, Endpoints, Settings};

/// Everything loaded from a channel file or payload.
#[derive(Debug, Clone)]
pub struct ChannelsFile {
    pub channels: Vec<ChannelConfig>,
    pub cron: Option<String>,
}

impl ChannelsFile {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Load from the `CHANNELS_CONFIG` environment variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from `CHANNELS_CONFIG` as returned by `lookup`. Blank counts as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let payload = lookup(CHANNELS_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEnv(CHANNELS_ENV))?;
        Self::parse(&payload)
    }

    /// Parse and validate a JSON payload.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;

        let (raw_channels, cron) = match value {
            Value::Array(_) => (value, None),
            Value::Object(mut obj) => {
                let channels = obj.remove("channels").ok_or(ConfigError::InvalidFormat)?;
                if !channels.is_array() {
                    return Err(ConfigError::InvalidFormat);
                }
                let cron = match obj.remove("cron") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(expr)) => Some(validate_cron(&expr)?),
                    Some(other) => {
                        return Err(ConfigError::InvalidCron {
                            expr: other.to_string(),
                            found: 0,
                        });
                    }
                };
                (channels, cron)
            }
            _ => return Err(ConfigError::InvalidFormat),
        };

        let channels: Vec<ChannelConfig> = serde_json::from_value(raw_channels)?;
        if channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        let channels = channels
            .into_iter()
            .enumerate()
            .map(|(i, channel)| channel.normalize(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { channels, cron })
    }
}

/// Standard five-field cron: minute, hour, day of month, month, day of week.
pub fn validate_cron(expr: &str) -> Result<String, ConfigError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(ConfigError::InvalidCron {
            expr: expr.to_string(),
            found: fields.len(),
        });
    }
    Ok(fields.join(" "))
}
