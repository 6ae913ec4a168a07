//! Per-channel wiring of the API clients.

use secrecy::SecretString;

use crate::clients::amadeus::AmadeusClient;
use crate::clients::console::ConsolePublisher;
use crate::clients::openai::OpenAiCopywriter;
use crate::clients::telegram::TelegramPublisher;
use crate::clients::travelpayouts::TravelpayoutsClient;
use crate::clients::unsplash::UnsplashPhotos;
use crate::clients::wikipedia::WikipediaPhotos;
use crate::clients::{
    Copywriter, FlightSource, HotelSource, PhotoSource, Publisher, http_client,
};
use crate::config::{ChannelConfig, Credentials, FlightProvider, Settings};
use crate::error::ChannelError;

/// Everything one channel talks to.
pub struct Services {
    pub flights: Box<dyn FlightSource>,
    pub copywriter: Box<dyn Copywriter>,
    pub photos: Option<Box<dyn PhotoSource>>,
    /// Hotel lookups; `None` leaves hotels out of the posts.
    pub hotels: Option<Box<dyn HotelSource>>,
    pub publisher: Box<dyn Publisher>,
    /// Affiliate marker appended to booking links.
    pub marker: Option<String>,
}

/// Builds a fresh set of [`Services`] for each channel.
pub trait ServiceFactory: Send + Sync {
    fn build(&self, channel: &ChannelConfig) -> Result<Services, ChannelError>;
}

/// Real HTTP clients configured from [`Settings`] and channel overrides.
pub struct LiveServices {
    settings: Settings,
    dry_run: bool,
}

impl LiveServices {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            dry_run: false,
        }
    }

    /// Print posts instead of sending them to Telegram.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// An Amadeus client when both client id and secret resolve.
    fn amadeus(&self, creds: &Credentials, http: &reqwest::Client) -> Option<AmadeusClient> {
        let id = creds.amadeus_client_id.as_deref()?;
        let secret = creds.amadeus_client_secret.clone()?;
        Some(AmadeusClient::new(
            http.clone(),
            &self.settings.endpoints.amadeus,
            id,
            secret,
            self.settings.retry,
        ))
    }

    fn flight_source(
        &self,
        channel: &ChannelConfig,
        creds: &Credentials,
        amadeus: Option<&AmadeusClient>,
        http: &reqwest::Client,
    ) -> Result<Box<dyn FlightSource>, ChannelError> {
        let travelpayouts = |token: SecretString| -> Box<dyn FlightSource> {
            Box::new(TravelpayoutsClient::new(
                http.clone(),
                &self.settings.endpoints.travelpayouts,
                token,
                self.settings.retry,
            ))
        };
        let token = creds.travelpayouts_token.clone();

        match channel.flight_provider {
            Some(FlightProvider::Travelpayouts) => token
                .map(travelpayouts)
                .ok_or(ChannelError::MissingCredential("TRAVELPAYOUTS_TOKEN")),
            Some(FlightProvider::Amadeus) => {
                if creds.amadeus_client_id.is_none() {
                    return Err(ChannelError::MissingCredential("AMADEUS_CLIENT_ID"));
                }
                amadeus
                    .map(|client| Box::new(client.clone()) as Box<dyn FlightSource>)
                    .ok_or(ChannelError::MissingCredential("AMADEUS_CLIENT_SECRET"))
            }
            None => match (token, amadeus) {
                (Some(token), _) => Ok(travelpayouts(token)),
                (None, Some(client)) => Ok(Box::new(client.clone())),
                (None, None) => Err(ChannelError::MissingCredential(
                    "TRAVELPAYOUTS_TOKEN or AMADEUS_CLIENT_ID/AMADEUS_CLIENT_SECRET",
                )),
            },
        }
    }
}

impl ServiceFactory for LiveServices {
    fn build(&self, channel: &ChannelConfig) -> Result<Services, ChannelError> {
        let creds = self.settings.credentials_for(channel);
        tracing::debug!(channel = %channel.telegram_channel_id, credentials = ?creds, "building services");

        let endpoints = &self.settings.endpoints;
        let retry = self.settings.retry;
        let http = http_client(self.settings.http_timeout)?;

        let amadeus = self.amadeus(&creds, &http);
        let flights = self.flight_source(channel, &creds, amadeus.as_ref(), &http)?;
        let hotels = amadeus
            .filter(|_| channel.hotels)
            .map(|client| Box::new(client) as Box<dyn HotelSource>);

        let openai_key = creds
            .openai_key
            .clone()
            .ok_or(ChannelError::MissingCredential("OPENAI_API_KEY"))?;
        let copywriter = Box::new(OpenAiCopywriter::new(
            http.clone(),
            &endpoints.openai,
            openai_key,
            &self.settings.model,
            retry,
        ));

        let photos: Box<dyn PhotoSource> = match creds.unsplash_key.clone() {
            Some(key) => Box::new(UnsplashPhotos::new(
                http.clone(),
                &endpoints.unsplash,
                key,
                retry,
            )),
            None => Box::new(WikipediaPhotos::new(
                http.clone(),
                &endpoints.wikipedia,
                retry,
            )),
        };

        let publisher: Box<dyn Publisher> = if self.dry_run {
            Box::new(ConsolePublisher::new(&channel.telegram_channel_id))
        } else {
            Box::new(TelegramPublisher::new(
                http,
                &endpoints.telegram,
                channel.telegram_bot_token.clone(),
                &channel.telegram_channel_id,
                retry,
            ))
        };

        Ok(Services {
            flights,
            copywriter,
            photos: Some(photos),
            hotels,
            publisher,
            marker: creds.travelpayouts_marker,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn settings() -> Settings {
        Settings {
            openai_key: Some(secret("sk-test")),
            ..Settings::default()
        }
    }

    fn channel() -> ChannelConfig {
        ChannelConfig::new("123:abc", "@deals", "TLV")
    }

    #[test]
    fn travelpayouts_is_preferred_when_both_resolve() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            amadeus_client_id: Some("id".to_string()),
            amadeus_client_secret: Some(secret("secret")),
            ..settings()
        };
        let services = LiveServices::new(settings).build(&channel()).unwrap();
        assert_eq!(services.flights.name(), "travelpayouts");
    }

    #[test]
    fn amadeus_when_only_amadeus_resolves() {
        let settings = Settings {
            amadeus_client_id: Some("id".to_string()),
            amadeus_client_secret: Some(secret("secret")),
            ..settings()
        };
        let services = LiveServices::new(settings).build(&channel()).unwrap();
        assert_eq!(services.flights.name(), "amadeus");
    }

    #[test]
    fn explicit_provider_wins() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            amadeus_client_id: Some("id".to_string()),
            amadeus_client_secret: Some(secret("secret")),
            ..settings()
        };
        let mut channel = channel();
        channel.flight_provider = Some(FlightProvider::Amadeus);
        let services = LiveServices::new(settings).build(&channel).unwrap();
        assert_eq!(services.flights.name(), "amadeus");
    }

    #[test]
    fn explicit_provider_without_credentials_fails() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            ..settings()
        };
        let mut channel = channel();
        channel.flight_provider = Some(FlightProvider::Amadeus);
        let err = LiveServices::new(settings).build(&channel).err().unwrap();
        assert!(matches!(err, ChannelError::MissingCredential("AMADEUS_CLIENT_ID")));
    }

    #[test]
    fn missing_flight_credentials_fail() {
        let err = LiveServices::new(settings()).build(&channel()).err().unwrap();
        assert!(matches!(err, ChannelError::MissingCredential(_)));
    }

    #[test]
    fn missing_openai_key_fails() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            ..Settings::default()
        };
        let err = LiveServices::new(settings).build(&channel()).err().unwrap();
        assert!(matches!(err, ChannelError::MissingCredential("OPENAI_API_KEY")));
    }

    #[test]
    fn channel_override_supplies_missing_credential() {
        let mut channel = channel();
        channel.travelpayouts_token = Some(secret("own-token"));
        channel.travelpayouts_marker = Some("555".to_string());
        let services = LiveServices::new(settings()).build(&channel).unwrap();
        assert_eq!(services.flights.name(), "travelpayouts");
        assert_eq!(services.marker.as_deref(), Some("555"));
    }

    #[test]
    fn hotels_follow_amadeus_credentials_and_channel_flag() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            amadeus_client_id: Some("id".to_string()),
            amadeus_client_secret: Some(secret("secret")),
            ..settings()
        };
        let factory = LiveServices::new(settings);

        let services = factory.build(&channel()).unwrap();
        assert_eq!(services.flights.name(), "travelpayouts");
        assert!(services.hotels.is_some());

        let mut opted_out = channel();
        opted_out.hotels = false;
        assert!(factory.build(&opted_out).unwrap().hotels.is_none());
    }

    #[test]
    fn no_hotels_without_amadeus_credentials() {
        let settings = Settings {
            travelpayouts_token: Some(secret("tp")),
            ..settings()
        };
        let services = LiveServices::new(settings).build(&channel()).unwrap();
        assert!(services.hotels.is_none());
    }
}
