//! Scripted stand-ins for the external APIs, for tests and offline runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ApiError;

use super::{
    CopyRequest, Copywriter, FlightOffer, FlightSource, HotelOffer, HotelSource, IdeaCopy,
    PhotoSource, Post, Publisher, SearchRequest,
};

/// A round trip TLV → `destination`, 2024-06-01 to 2024-06-08.
pub fn sample_offer(destination: &str, price: i64) -> FlightOffer {
    FlightOffer {
        origin: "TLV".to_string(),
        destination: destination.to_string(),
        price: Decimal::from(price),
        currency: "EUR".to_string(),
        departure_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
        return_date: NaiveDate::from_ymd_opt(2024, 6, 8),
        airline: None,
        flight_number: None,
        link: None,
    }
}

/// Copy for `destination` with predictable text.
pub fn sample_copy(destination: &str) -> IdeaCopy {
    IdeaCopy {
        destination_code: destination.to_string(),
        title: format!("Escape to {destination}"),
        motivation: "Because you deserve it".to_string(),
        description: format!("{destination} is lovely this time of year."),
        origin_city: "Tel Aviv".to_string(),
        destination_city: format!("City of {destination}"),
        destination_name_en: String::new(),
    }
}

/// Returns the same offers (or error) on every search, optionally after a delay.
pub struct MockFlights {
    result: Result<Vec<FlightOffer>, ApiError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockFlights {
    pub fn new(result: Result<Vec<FlightOffer>, ApiError>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightSource for MockFlights {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, _request: &SearchRequest) -> Result<Vec<FlightOffer>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

/// A hotel in `currency` costing `price` for the whole stay.
pub fn sample_hotel(name: &str, price: i64) -> HotelOffer {
    HotelOffer {
        name: name.to_string(),
        rating: Some("4".to_string()),
        total_price: Decimal::from(price),
        currency: "EUR".to_string(),
    }
}

/// Returns the same copy (or error) every time and remembers the
/// requested idea count.
pub struct MockCopywriter {
    result: Result<Vec<IdeaCopy>, ApiError>,
    requested: AtomicUsize,
}

impl MockCopywriter {
    pub fn new(result: Result<Vec<IdeaCopy>, ApiError>) -> Self {
        Self {
            result,
            requested: AtomicUsize::new(0),
        }
    }

    /// `count` of the last request, 0 before the first.
    pub fn requested(&self) -> usize {
        self.requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Copywriter for MockCopywriter {
    async fn write(&self, request: &CopyRequest<'_>) -> Result<Vec<IdeaCopy>, ApiError> {
        self.requested.store(request.count as usize, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Returns the same hotels (or error) for every city and records which
/// cities were asked for.
pub struct MockHotels {
    result: Result<Vec<HotelOffer>, ApiError>,
    cities: Mutex<Vec<String>>,
}

impl MockHotels {
    pub fn new(result: Result<Vec<HotelOffer>, ApiError>) -> Self {
        Self {
            result,
            cities: Mutex::new(Vec::new()),
        }
    }

    pub fn cities(&self) -> Vec<String> {
        self.cities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HotelSource for MockHotels {
    async fn find(
        &self,
        city_code: &str,
        _check_in: NaiveDate,
        _check_out: NaiveDate,
    ) -> Result<Vec<HotelOffer>, ApiError> {
        self.cities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(city_code.to_string());
        self.result.clone()
    }
}

/// Returns the same photo lookup result every time.
pub struct MockPhotos {
    result: Result<Option<String>, ApiError>,
}

impl MockPhotos {
    pub fn new(result: Result<Option<String>, ApiError>) -> Self {
        Self { result }
    }
}

#[async_trait]
impl PhotoSource for MockPhotos {
    async fn find(&self, _place: &str) -> Result<Option<String>, ApiError> {
        self.result.clone()
    }
}

/// Shared log of posts a [`RecordingPublisher`] delivered.
pub type Outbox = Arc<Mutex<Vec<Post>>>;

/// Records delivered posts; can be told to reject photos or everything.
pub struct RecordingPublisher {
    outbox: Outbox,
    reject_photos: Option<ApiError>,
    reject_all: Option<ApiError>,
}

impl RecordingPublisher {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            outbox,
            reject_photos: None,
            reject_all: None,
        }
    }

    pub fn rejecting_photos(mut self, err: ApiError) -> Self {
        self.reject_photos = Some(err);
        self
    }

    pub fn rejecting_all(mut self, err: ApiError) -> Self {
        self.reject_all = Some(err);
        self
    }

    fn record(&self, post: Post) {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(post);
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn send_text(&self, text: &str) -> Result<(), ApiError> {
        if let Some(err) = &self.reject_all {
            return Err(err.clone());
        }
        self.record(Post {
            text: text.to_string(),
            photo_url: None,
        });
        Ok(())
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ApiError> {
        if let Some(err) = self.reject_all.as_ref().or(self.reject_photos.as_ref()) {
            return Err(err.clone());
        }
        self.record(Post {
            text: caption.to_string(),
            photo_url: Some(photo_url.to_string()),
        });
        Ok(())
    }
}
