use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::{DEFAULT_CURRENCY, DEFAULT_IDEAS, DEFAULT_LANGUAGE, MAX_IDEAS};
use crate::error::ConfigError;

/// Which flight-price API a channel searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightProvider {
    Travelpayouts,
    Amadeus,
}

/// One destination channel: where to post and what to search for.
///
/// Tokens and keys are `SecretString`, so `Debug` output never shows them.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(deserialize_with = "deserialize_secret_string")]
    pub telegram_bot_token: SecretString,
    #[serde(deserialize_with = "string_or_number")]
    pub telegram_channel_id: String,
    /// IATA code of the departure city.
    pub origin: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Posts per run.
    #[serde(default = "default_ideas")]
    pub ideas: u8,
    #[serde(default)]
    pub flight_provider: Option<FlightProvider>,
    /// Look up hotels at the destination when Amadeus credentials resolve.
    #[serde(default = "default_true")]
    pub hotels: bool,

    // Per-channel overrides of the shared environment credentials.
    #[serde(default)]
    pub amadeus_client_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_secret_string")]
    pub amadeus_client_secret: Option<SecretString>,
    #[serde(default, deserialize_with = "deserialize_option_secret_string")]
    pub openai_key: Option<SecretString>,
    #[serde(default, deserialize_with = "deserialize_option_secret_string")]
    pub travelpayouts_token: Option<SecretString>,
    #[serde(default)]
    pub travelpayouts_marker: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_secret_string")]
    pub unsplash_key: Option<SecretString>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_ideas() -> u8 {
    DEFAULT_IDEAS
}

fn default_true() -> bool {
    true
}

fn deserialize_secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(SecretString::from(s))
}

fn deserialize_option_secret_string<'de, D>(
    deserializer: D,
) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(SecretString::from))
}

/// Channel ids are often written as bare numbers (`-1001234567890`).
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Trimmed secret, or `None` when blank.
fn non_blank(secret: Option<SecretString>) -> Option<SecretString> {
    secret
        .map(|s| s.expose_secret().trim().to_string())
        .filter(|s| !s.is_empty())
        .map(SecretString::from)
}

impl ChannelConfig {
    /// A channel with defaults for everything but the required fields.
    pub fn new(bot_token: &str, channel_id: &str, origin: &str) -> Self {
        Self {
            telegram_bot_token: SecretString::from(bot_token.to_string()),
            telegram_channel_id: channel_id.to_string(),
            origin: origin.to_string(),
            language: default_language(),
            currency: default_currency(),
            ideas: DEFAULT_IDEAS,
            flight_provider: None,
            hotels: true,
            amadeus_client_id: None,
            amadeus_client_secret: None,
            openai_key: None,
            travelpayouts_token: None,
            travelpayouts_marker: None,
            unsplash_key: None,
        }
    }

    /// Trim and upper-case codes, then check the required fields. Blank
    /// overrides become `None`.
    /// `index` is the 1-based position in the file, used in error messages.
    pub fn normalize(mut self, index: usize) -> Result<Self, ConfigError> {
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidField {
            index,
            field,
            reason: reason.to_string(),
        };

        let bot_token = self.telegram_bot_token.expose_secret().trim().to_string();
        if bot_token.is_empty() {
            return Err(invalid("telegram_bot_token", "must not be empty"));
        }
        self.telegram_bot_token = SecretString::from(bot_token);

        self.telegram_channel_id = self.telegram_channel_id.trim().to_string();
        self.origin = self.origin.trim().to_ascii_uppercase();
        self.currency = self.currency.trim().to_ascii_uppercase();
        self.language = self.language.trim().to_string();

        self.amadeus_client_secret = non_blank(self.amadeus_client_secret);
        self.openai_key = non_blank(self.openai_key);
        self.travelpayouts_token = non_blank(self.travelpayouts_token);
        self.unsplash_key = non_blank(self.unsplash_key);
        self.amadeus_client_id = self
            .amadeus_client_id
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        self.travelpayouts_marker = self
            .travelpayouts_marker
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        if self.telegram_channel_id.is_empty() {
            return Err(invalid("telegram_channel_id", "must not be empty"));
        }
        if !is_code(&self.origin) {
            return Err(invalid("origin", "expected a 3-letter IATA code"));
        }
        if !is_code(&self.currency) {
            return Err(invalid("currency", "expected a 3-letter currency code"));
        }
        if self.language.is_empty() {
            return Err(invalid("language", "must not be empty"));
        }
        if self.ideas == 0 || self.ideas > MAX_IDEAS {
            return Err(ConfigError::InvalidField {
                index,
                field: "ideas",
                reason: format!("must be between 1 and {MAX_IDEAS}"),
            });
        }
        Ok(self)
    }
}

fn is_code(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_channel_gets_defaults() {
        let json = r#"{
            "telegram_bot_token": "123:abc",
            "telegram_channel_id": "@deals",
            "origin": "tlv"
        }"#;
        let channel: ChannelConfig = serde_json::from_str(json).unwrap();
        let channel = channel.normalize(1).unwrap();
        assert_eq!(channel.origin, "TLV");
        assert_eq!(channel.language, "English");
        assert_eq!(channel.currency, "EUR");
        assert_eq!(channel.ideas, DEFAULT_IDEAS);
        assert!(channel.hotels);
        assert!(channel.flight_provider.is_none());
        assert!(channel.openai_key.is_none());
    }

    #[test]
    fn numeric_channel_id_is_accepted() {
        let json = r#"{
            "telegram_bot_token": "t",
            "telegram_channel_id": -1001234567890,
            "origin": "NYC"
        }"#;
        let channel: ChannelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(channel.telegram_channel_id, "-1001234567890");
    }

    #[test]
    fn provider_parses_lowercase() {
        let json = r#"{
            "telegram_bot_token": "t",
            "telegram_channel_id": "c",
            "origin": "NYC",
            "flight_provider": "amadeus",
            "hotels": false
        }"#;
        let channel: ChannelConfig = serde_json::from_str(json).unwrap();
        assert_eq!(channel.flight_provider, Some(FlightProvider::Amadeus));
        assert!(!channel.hotels);
    }

    #[test]
    fn missing_origin_is_a_parse_error() {
        let json = r#"{"telegram_bot_token": "t", "telegram_channel_id": "c"}"#;
        assert!(serde_json::from_str::<ChannelConfig>(json).is_err());
    }

    #[test]
    fn debug_output_hides_tokens() {
        let json = r#"{
            "telegram_bot_token": "123:SECRET_BOT",
            "telegram_channel_id": "@deals",
            "origin": "TLV",
            "openai_key": "sk-SECRET",
            "travelpayouts_token": "tp-SECRET",
            "amadeus_client_secret": "am-SECRET",
            "unsplash_key": "un-SECRET"
        }"#;
        let channel: ChannelConfig = serde_json::from_str(json).unwrap();
        let out = format!("{channel:?}");

        assert!(!out.contains("SECRET"), "{out}");
        assert!(out.contains("@deals"));
        assert_eq!(channel.openai_key.unwrap().expose_secret(), "sk-SECRET");
    }

    #[test]
    fn blank_overrides_become_none() {
        let mut channel = ChannelConfig::new(" 123:abc ", "c", "NYC");
        channel.openai_key = Some(SecretString::from("   ".to_string()));
        channel.travelpayouts_token = Some(SecretString::from(" tp ".to_string()));
        channel.travelpayouts_marker = Some(String::new());

        let channel = channel.normalize(1).unwrap();
        assert!(channel.openai_key.is_none());
        assert_eq!(channel.travelpayouts_token.unwrap().expose_secret(), "tp");
        assert!(channel.travelpayouts_marker.is_none());
        assert_eq!(channel.telegram_bot_token.expose_secret(), "123:abc");
    }

    #[test]
    fn rejects_bad_origin() {
        let err = ChannelConfig::new("t", "c", "NEW YORK").normalize(2).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("channel #2"));
        assert!(msg.contains("origin"));
    }

    #[test]
    fn rejects_empty_token() {
        let err = ChannelConfig::new("  ", "c", "NYC").normalize(1).unwrap_err();
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn rejects_out_of_range_ideas() {
        let mut channel = ChannelConfig::new("t", "c", "NYC");
        channel.ideas = 0;
        assert!(channel.clone().normalize(1).is_err());
        channel.ideas = MAX_IDEAS + 1;
        assert!(channel.normalize(1).is_err());
    }

    #[test]
    fn currency_is_uppercased() {
        let mut channel = ChannelConfig::new("t", "c", "NYC");
        channel.currency = "usd".to_string();
        assert_eq!(channel.normalize(1).unwrap().currency, "USD");
    }
}
