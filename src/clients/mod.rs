//! External API clients and the traits the runner sees them through.
//!
//! Every live client makes one authenticated request per attempt and leaves
//! retrying to [`RetryPolicy`](crate::retry::RetryPolicy).

pub mod amadeus;
pub mod console;
pub mod mock;
pub mod openai;
pub mod telegram;
pub mod travelpayouts;
pub mod unsplash;
pub mod wikipedia;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::consts::{DEPARTURE_OFFSET_DAYS, OFFER_LIMIT, RETURN_OFFSET_DAYS};
use crate::error::ApiError;

/// One priced round trip from a flight-price API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightOffer {
    pub origin: String,
    pub destination: String,
    pub price: Decimal,
    pub currency: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    /// Provider deep link, absolute or relative to the booking site.
    #[serde(skip)]
    pub link: Option<String>,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub origin: String,
    pub currency: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub limit: u32,
}

impl SearchRequest {
    /// A week-long trip leaving a week after `today`.
    pub fn next_week(origin: &str, currency: &str, today: NaiveDate) -> Self {
        Self {
            origin: origin.to_string(),
            currency: currency.to_string(),
            departure_date: today + TimeDelta::days(DEPARTURE_OFFSET_DAYS),
            return_date: today + TimeDelta::days(RETURN_OFFSET_DAYS),
            limit: OFFER_LIMIT,
        }
    }
}

/// Marketing copy the model wrote for one offer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdeaCopy {
    /// IATA code of the offer this copy is about.
    pub destination_code: String,
    pub title: String,
    #[serde(default)]
    pub motivation: String,
    pub description: String,
    #[serde(default)]
    pub origin_city: String,
    #[serde(default)]
    pub destination_city: String,
    /// English name of the destination, for photo lookups.
    #[serde(default)]
    pub destination_name_en: String,
}

/// A priced stay from a hotel-offers API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotelOffer {
    pub name: String,
    /// Star rating as reported, e.g. `"4"`.
    pub rating: Option<String>,
    pub total_price: Decimal,
    pub currency: String,
}

/// What the copywriter is asked for.
#[derive(Debug, Clone, Copy)]
pub struct CopyRequest<'a> {
    pub offers: &'a [FlightOffer],
    pub language: &'a str,
    pub currency: &'a str,
    pub count: u8,
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub text: String,
    pub photo_url: Option<String>,
}

/// Finds priced flights from an origin.
#[async_trait]
pub trait FlightSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, request: &SearchRequest) -> Result<Vec<FlightOffer>, ApiError>;
}

/// Writes travel copy about a set of offers.
#[async_trait]
pub trait Copywriter: Send + Sync {
    async fn write(&self, request: &CopyRequest<'_>) -> Result<Vec<IdeaCopy>, ApiError>;
}

/// Finds hotel offers in a city for the trip's dates.
#[async_trait]
pub trait HotelSource: Send + Sync {
    async fn find(
        &self,
        city_code: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<HotelOffer>, ApiError>;
}

/// Finds a picture of a place. `Ok(None)` means nothing suitable.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn find(&self, place: &str) -> Result<Option<String>, ApiError>;
}

/// Delivers posts to one channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<(), ApiError>;
    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ApiError>;
}

/// Build the HTTP client one channel's API clients share.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION"),
            " (",
            env!("CARGO_PKG_REPOSITORY"),
            ")"
        ))
        .build()
        .map_err(|e| ApiError::Network {
            service: "http",
            detail: e.to_string(),
        })
}

/// Read a response body, classify non-success statuses, and parse JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::from_reqwest(service, e))?;

    tracing::debug!(service, %status, bytes = body.len(), "response received");

    if !status.is_success() {
        return Err(ApiError::from_status(service, status, body));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::invalid(service, e.to_string()))
}

/// Dates arrive as `2024-06-01` or `2024-06-01T10:00:00+03:00`.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Prices arrive as JSON numbers or decimal strings.
pub(crate) fn parse_price(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Flight numbers arrive as strings or bare numbers.
pub(crate) fn parse_label(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
