use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::clients::{HotelOffer, HotelSource, parse_price, read_json};
use crate::consts::{HOTEL_ID_LIMIT, HOTEL_LIMIT};
use crate::error::ApiError;

use super::{AmadeusClient, SERVICE};

const HOTELS_BY_CITY_PATH: &str = "/v1/reference-data/locations/hotels/by-city";
const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";

impl AmadeusClient {
    /// Rated hotels within 5 km of the city centre, as `(id, rating)`.
    async fn hotels_in(&self, city_code: &str) -> Result<Vec<(String, Option<String>)>, ApiError> {
        let query = [
            ("cityCode", city_code.to_string()),
            ("radius", "5".to_string()),
            ("radiusUnit", "KM".to_string()),
            ("ratings", "2,3,4".to_string()),
            ("hotelSource", "ALL".to_string()),
        ];
        let body: HotelListResponse = self.get(HOTELS_BY_CITY_PATH, &query).await?;
        Ok(body
            .data
            .into_iter()
            .filter(|h| !h.hotel_id.trim().is_empty())
            .take(HOTEL_ID_LIMIT)
            .map(|h| (h.hotel_id, h.rating.as_ref().and_then(rating_label)))
            .collect())
    }

    fn to_hotel(raw: RawHotelOffers, ratings: &[(String, Option<String>)]) -> Option<HotelOffer> {
        if !raw.available.unwrap_or(true) {
            return None;
        }
        let offer = raw.offers.into_iter().next()?;
        let price = offer.price?;
        let name = raw.hotel.name.trim();
        if name.is_empty() {
            return None;
        }
        let rating = ratings
            .iter()
            .find(|(id, _)| *id == raw.hotel.hotel_id)
            .and_then(|(_, rating)| rating.clone());
        Some(HotelOffer {
            name: name.to_string(),
            rating,
            total_price: parse_price(price.total.as_ref()?)?,
            currency: price.currency?.trim().to_ascii_uppercase(),
        })
    }
}

#[async_trait]
impl HotelSource for AmadeusClient {
    async fn find(
        &self,
        city_code: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<HotelOffer>, ApiError> {
        tracing::info!(city = city_code, %check_in, %check_out, "searching hotel offers");

        let ratings = self.hotels_in(city_code).await?;
        if ratings.is_empty() {
            tracing::info!(city = city_code, "no hotels listed for city");
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = ratings.iter().map(|(id, _)| id.as_str()).collect();
        let query = [
            ("hotelIds", ids.join(",")),
            ("checkInDate", check_in.to_string()),
            ("checkOutDate", check_out.to_string()),
            ("adults", "2".to_string()),
            ("paymentPolicy", "NONE".to_string()),
            ("includeClosed", "false".to_string()),
            ("bestRateOnly", "true".to_string()),
        ];
        let body: HotelOffersResponse = self.get(HOTEL_OFFERS_PATH, &query).await?;

        let mut hotels: Vec<HotelOffer> = body
            .data
            .into_iter()
            .filter_map(|raw| Self::to_hotel(raw, &ratings))
            .collect();
        hotels.sort_by(|a, b| a.total_price.cmp(&b.total_price));
        hotels.dedup_by(|a, b| a.name == b.name);
        hotels.truncate(HOTEL_LIMIT);

        tracing::info!(city = city_code, count = hotels.len(), "found hotel offers");
        Ok(hotels)
    }
}

/// Ratings arrive as `"4"` or `4`.
fn rating_label(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Deserialize)]
struct HotelListResponse {
    #[serde(default)]
    data: Vec<ListedHotel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedHotel {
    #[serde(default)]
    hotel_id: String,
    rating: Option<Value>,
}

#[derive(Deserialize)]
struct HotelOffersResponse {
    #[serde(default)]
    data: Vec<RawHotelOffers>,
}

#[derive(Deserialize)]
struct RawHotelOffers {
    hotel: RawHotel,
    available: Option<bool>,
    #[serde(default)]
    offers: Vec<RawOffer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHotel {
    #[serde(default)]
    hotel_id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct RawOffer {
    price: Option<RawPrice>,
}

#[derive(Deserialize)]
struct RawPrice {
    currency: Option<String>,
    total: Option<Value>,
}
