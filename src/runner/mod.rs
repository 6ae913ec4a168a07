//! Running the pipeline for one channel, and for many.
//!
//! A channel never fails the run by itself: every outcome, including a
//! panic inside its task, ends up as a [`ChannelResult`] in the report.

pub mod services;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tracing::Instrument;

use crate::clients::{CopyRequest, HotelSource, Post, Publisher, SearchRequest};
use crate::compose::{TravelIdea, compose, to_post};
use crate::config::ChannelConfig;
use crate::consts::CANDIDATE_IDEAS;
use crate::error::{ApiError, ChannelError};

pub use services::{LiveServices, ServiceFactory, Services};

/// Outcome of one channel's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelResult {
    pub channel_id: String,
    pub success: bool,
    pub posts_sent: usize,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl ChannelResult {
    fn succeeded(channel_id: &str, posts_sent: usize, elapsed: Duration) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            success: true,
            posts_sent,
            error: None,
            elapsed,
        }
    }

    fn failed(channel_id: &str, posts_sent: usize, error: String, elapsed: Duration) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            success: false,
            posts_sent,
            error: Some(error),
            elapsed,
        }
    }
}

/// How [`run_all`] schedules channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Every channel's result, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<ChannelResult>,
    pub elapsed: Duration,
}

impl RunReport {
    /// True when there was at least one channel and all of them succeeded.
    pub fn succeeded(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.success)
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Run the whole pipeline for one channel.
pub async fn run_channel(channel: &ChannelConfig, factory: &dyn ServiceFactory) -> ChannelResult {
    let started = Instant::now();
    let span = tracing::info_span!(
        "channel",
        id = %channel.telegram_channel_id,
        origin = %channel.origin,
    );

    let mut sent = 0;
    let outcome = AssertUnwindSafe(process(channel, factory, &mut sent))
        .catch_unwind()
        .instrument(span.clone())
        .await;
    let elapsed = started.elapsed();

    span.in_scope(|| match outcome {
        Ok(Ok(())) => {
            tracing::info!(posts = sent, elapsed_ms = elapsed.as_millis() as u64, "channel done");
            ChannelResult::succeeded(&channel.telegram_channel_id, sent, elapsed)
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, posts = sent, "channel failed");
            ChannelResult::failed(&channel.telegram_channel_id, sent, err.to_string(), elapsed)
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            tracing::error!(panic = %reason, posts = sent, "channel panicked");
            ChannelResult::failed(
                &channel.telegram_channel_id,
                sent,
                format!("channel panicked: {reason}"),
                elapsed,
            )
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

async fn process(
    channel: &ChannelConfig,
    factory: &dyn ServiceFactory,
    sent: &mut usize,
) -> Result<(), ChannelError> {
    let services = factory.build(channel)?;

    let today = chrono::Utc::now().date_naive();
    let request = SearchRequest::next_week(&channel.origin, &channel.currency, today);
    tracing::info!(
        provider = services.flights.name(),
        departure = %request.departure_date,
        "searching flights"
    );
    let offers = services.flights.search(&request).await?;
    if offers.is_empty() {
        return Err(ChannelError::NoOffers {
            origin: channel.origin.clone(),
        });
    }
    tracing::info!(offers = offers.len(), "offers found");

    let copies = services
        .copywriter
        .write(&CopyRequest {
            offers: &offers,
            language: &channel.language,
            currency: &channel.currency,
            count: channel.ideas.max(CANDIDATE_IDEAS),
        })
        .await?;
    tracing::debug!(copies = copies.len(), "copy received");

    let mut ideas = compose(
        &offers,
        copies,
        services.marker.as_deref(),
        usize::from(channel.ideas),
    );
    if ideas.is_empty() {
        return Err(ChannelError::NoIdeas);
    }

    if let Some(photos) = &services.photos {
        for idea in &mut ideas {
            match photos.find(idea.photo_query()).await {
                Ok(found) => idea.photo_url = found,
                Err(err) => {
                    tracing::warn!(place = idea.photo_query(), error = %err, "photo lookup failed")
                }
            }
        }
    }

    if let Some(hotels) = &services.hotels {
        for idea in &mut ideas {
            attach_hotels(hotels.as_ref(), idea, &request).await;
        }
    }

    for idea in &ideas {
        let post = to_post(idea);
        tracing::info!(
            destination = %idea.offer.destination,
            price = %idea.offer.price,
            photo = post.photo_url.is_some(),
            "delivering post"
        );
        deliver(services.publisher.as_ref(), &post).await?;
        *sent += 1;
    }

    Ok(())
}

/// Look up hotels for the trip. A failed lookup is logged and shown as
/// "no offers" rather than failing the channel.
async fn attach_hotels(hotels: &dyn HotelSource, idea: &mut TravelIdea, request: &SearchRequest) {
    let offer = &idea.offer;
    let check_out = offer.return_date.unwrap_or(request.return_date);
    let found = match hotels
        .find(&offer.destination, offer.departure_date, check_out)
        .await
    {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(city = %offer.destination, error = %err, "hotel lookup failed");
            Vec::new()
        }
    };
    if found.is_empty() {
        tracing::info!(city = %offer.destination, "no hotel offers");
    }
    idea.hotels = Some(found);
}

/// Send a post, falling back to plain text when the photo is refused.
async fn deliver(publisher: &dyn Publisher, post: &Post) -> Result<(), ApiError> {
    if let Some(photo) = &post.photo_url {
        match publisher.send_photo(photo, &post.text).await {
            Ok(()) => return Ok(()),
            Err(err @ ApiError::Authentication { .. }) => return Err(err),
            Err(err) => tracing::warn!(error = %err, "photo post failed, sending text instead"),
        }
    }
    publisher.send_text(&post.text).await
}

/// Run every channel and collect the results in input order.
pub async fn run_all(
    channels: Vec<ChannelConfig>,
    mode: ExecutionMode,
    factory: Arc<dyn ServiceFactory>,
) -> RunReport {
    let started = Instant::now();
    tracing::info!(channels = channels.len(), ?mode, "starting run");

    let results = match mode {
        ExecutionMode::Sequential => {
            let mut results = Vec::with_capacity(channels.len());
            for channel in &channels {
                results.push(run_channel(channel, factory.as_ref()).await);
            }
            results
        }
        ExecutionMode::Parallel => {
            let (ids, handles): (Vec<_>, Vec<_>) = channels
                .into_iter()
                .map(|channel| {
                    let factory = Arc::clone(&factory);
                    let id = channel.telegram_channel_id.clone();
                    let handle = tokio::spawn(async move {
                        run_channel(&channel, factory.as_ref()).await
                    });
                    (id, handle)
                })
                .unzip();

            join_all(handles)
                .await
                .into_iter()
                .zip(ids)
                .map(|(joined, id)| {
                    joined.unwrap_or_else(|err| {
                        tracing::error!(channel = %id, error = %err, "channel task died");
                        ChannelResult::failed(
                            &id,
                            0,
                            format!("channel task failed: {err}"),
                            started.elapsed(),
                        )
                    })
                })
                .collect()
        }
    };

    let report = RunReport {
        results,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        succeeded = report.success_count(),
        failed = report.failure_count(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run finished"
    );
    report
}
