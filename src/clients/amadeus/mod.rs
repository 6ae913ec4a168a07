mod hotels;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

use super::{FlightOffer, FlightSource, SearchRequest, parse_date, parse_price, read_json};

const SERVICE: &str = "amadeus";
const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const DESTINATIONS_PATH: &str = "/v1/shopping/flight-destinations";

/// Amadeus Self-Service APIs behind an OAuth2 client-credentials token.
///
/// Clones share one cached token, so the flight and hotel searches of a
/// channel exchange credentials once.
#[derive(Clone)]
pub struct AmadeusClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
    retry: RetryPolicy,
    token: Arc<Mutex<Option<SecretString>>>,
}

impl AmadeusClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        client_id: &str,
        client_secret: SecretString,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret,
            retry,
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// The cached bearer token, exchanging the client credentials for one
    /// on first use.
    async fn access_token(&self) -> Result<SecretString, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }

        let url = self.url(TOKEN_PATH);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
        ];

        let http = &self.http;
        let url = url.as_str();
        let form = &form;
        let token: TokenResponse = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .post(url)
                    .form(form)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
            .map_err(|err| match err {
                // Amadeus answers bad client credentials with 400 invalid_client.
                ApiError::Rejected { status: 400, detail, .. } => ApiError::Authentication {
                    service: SERVICE,
                    detail,
                },
                other => other,
            })?;

        tracing::debug!("obtained amadeus access token");
        let token = SecretString::from(token.access_token);
        *cached = Some(token.clone());
        Ok(token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticated GET returning parsed JSON.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let token = self.access_token().await?;
        let url = self.url(path);
        let http = &self.http;
        let url = url.as_str();
        let token = token.expose_secret();
        self.retry
            .run(SERVICE, move || async move {
                let response = http
                    .get(url)
                    .bearer_auth(token)
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }

    fn to_offer(raw: &RawDestination, currency: &str) -> Option<FlightOffer> {
        Some(FlightOffer {
            origin: raw.origin.as_deref()?.trim().to_ascii_uppercase(),
            destination: raw.destination.as_deref()?.trim().to_ascii_uppercase(),
            price: parse_price(raw.price.as_ref()?.get("total")?)?,
            currency: currency.to_string(),
            departure_date: parse_date(raw.departure_date.as_deref()?)?,
            return_date: raw.return_date.as_deref().and_then(parse_date),
            airline: None,
            flight_number: None,
            link: None,
        })
    }
}

#[async_trait]
impl FlightSource for AmadeusClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, ApiError> {
        tracing::info!(
            origin = %request.origin,
            departure = %request.departure_date,
            "searching flight destinations"
        );

        let duration = (request.return_date - request.departure_date).num_days();
        let query = [
            ("origin", request.origin.clone()),
            ("departureDate", request.departure_date.to_string()),
            ("oneWay", "false".to_string()),
            ("nonStop", "false".to_string()),
            ("duration", duration.to_string()),
            ("viewBy", "DESTINATION".to_string()),
        ];
        let body: DestinationsResponse = self.get(DESTINATIONS_PATH, &query).await?;

        let currency = body
            .meta
            .and_then(|m| m.currency)
            .unwrap_or_else(|| request.currency.clone())
            .to_ascii_uppercase();

        let mut offers: Vec<FlightOffer> = body
            .data
            .iter()
            .filter_map(|raw| Self::to_offer(raw, &currency))
            .collect();
        offers.sort_by(|a, b| a.price.cmp(&b.price));
        offers.truncate(request.limit as usize);

        tracing::info!(count = offers.len(), %currency, "found flight offers");
        Ok(offers)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct DestinationsResponse {
    #[serde(default)]
    data: Vec<RawDestination>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Deserialize)]
struct Meta {
    currency: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDestination {
    origin: Option<String>,
    destination: Option<String>,
    departure_date: Option<String>,
    return_date: Option<String>,
    price: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn destination_becomes_offer() {
        let raw: RawDestination = serde_json::from_value(serde_json::json!({
            "type": "flight-destination",
            "origin": "MAD",
            "destination": "OPO",
            "departureDate": "2024-06-01",
            "returnDate": "2024-06-08",
            "price": {"total": "56.34"}
        }))
        .unwrap();
        let offer = AmadeusClient::to_offer(&raw, "EUR").unwrap();
        assert_eq!(offer.destination, "OPO");
        assert_eq!(offer.price, Decimal::from_str("56.34").unwrap());
        assert_eq!(offer.currency, "EUR");
        assert!(offer.return_date.is_some());
    }

    #[test]
    fn destination_without_total_is_skipped() {
        let raw: RawDestination = serde_json::from_value(serde_json::json!({
            "origin": "MAD",
            "destination": "OPO",
            "departureDate": "2024-06-01",
            "price": {}
        }))
        .unwrap();
        assert!(AmadeusClient::to_offer(&raw, "EUR").is_none());
    }
}
