use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

use super::{FlightOffer, FlightSource, SearchRequest, parse_date, parse_label, parse_price, read_json};

const SERVICE: &str = "travelpayouts";
const PRICES_PATH: &str = "/aviasales/v3/prices_for_dates";

/// Aviasales "prices for dates": cheapest tickets seen in the last 48 hours.
pub struct TravelpayoutsClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    retry: RetryPolicy,
}

impl TravelpayoutsClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: SecretString, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            retry,
        }
    }

    fn to_offer(raw: &RawTicket, fallback_currency: &str) -> Option<FlightOffer> {
        let origin = raw.origin.as_deref()?.trim().to_ascii_uppercase();
        let destination = raw.destination.as_deref()?.trim().to_ascii_uppercase();
        let price = parse_price(raw.price.as_ref().or(raw.value.as_ref())?)?;
        let departure_date = parse_date(raw.departure_at.as_deref()?)?;
        Some(FlightOffer {
            origin,
            destination,
            price,
            currency: fallback_currency.to_string(),
            departure_date,
            return_date: raw.return_at.as_deref().and_then(parse_date),
            airline: raw.airline.clone().filter(|a| !a.is_empty()),
            flight_number: raw.flight_number.as_ref().and_then(parse_label),
            link: raw.link.clone().filter(|l| !l.is_empty()),
        })
    }
}

#[async_trait]
impl FlightSource for TravelpayoutsClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, ApiError> {
        tracing::info!(
            origin = %request.origin,
            departure = %request.departure_date,
            "searching flight prices"
        );

        let url = format!("{}{}", self.base_url, PRICES_PATH);
        let query = [
            ("origin", request.origin.clone()),
            ("departure_at", request.departure_date.to_string()),
            ("return_at", request.return_date.to_string()),
            ("currency", request.currency.to_ascii_lowercase()),
            ("sorting", "price".to_string()),
            ("direct", "false".to_string()),
            ("one_way", "false".to_string()),
            ("unique", "true".to_string()),
            ("limit", request.limit.to_string()),
            ("page", "1".to_string()),
        ];

        let http = &self.http;
        let token = self.token.expose_secret();
        let url = url.as_str();
        let query = &query;
        let body: PricesResponse = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .get(url)
                    .header("X-Access-Token", token)
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await?;

        if !body.success {
            return Err(ApiError::invalid(
                SERVICE,
                body.error.unwrap_or_else(|| "request unsuccessful".to_string()),
            ));
        }

        let currency = body
            .currency
            .as_deref()
            .unwrap_or(request.currency.as_str())
            .to_ascii_uppercase();

        let raw = body.data.unwrap_or_default();
        let total = raw.len();
        let offers: Vec<FlightOffer> = raw
            .iter()
            .filter_map(|ticket| Self::to_offer(ticket, &currency))
            .collect();

        if offers.len() < total {
            tracing::debug!(skipped = total - offers.len(), "skipped incomplete tickets");
        }
        tracing::info!(count = offers.len(), "found flight offers");
        Ok(offers)
    }
}

#[derive(Deserialize)]
struct PricesResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    data: Option<Vec<RawTicket>>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Deserialize)]
struct RawTicket {
    origin: Option<String>,
    destination: Option<String>,
    price: Option<Value>,
    /// Older endpoints call the price `value`.
    value: Option<Value>,
    departure_at: Option<String>,
    return_at: Option<String>,
    airline: Option<String>,
    flight_number: Option<Value>,
    link: Option<String>,
}
