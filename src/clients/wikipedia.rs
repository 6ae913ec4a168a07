use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

use super::{PhotoSource, read_json};

const SERVICE: &str = "wikipedia";
const THUMB_SIZE: &str = "800";

/// Lead image of the place's Wikipedia article. Needs no key.
pub struct WikipediaPhotos {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl WikipediaPhotos {
    pub fn new(http: reqwest::Client, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }
}

/// Whether Telegram can fetch the URL as a photo: it must point at a
/// jpg/png/webp file, not an SVG or an HTML page.
pub fn is_direct_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".webp"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

#[async_trait]
impl PhotoSource for WikipediaPhotos {
    async fn find(&self, place: &str) -> Result<Option<String>, ApiError> {
        tracing::debug!(place, "searching wikipedia");
        let url = format!("{}/w/api.php", self.base_url);
        let query = [
            ("action", "query"),
            ("format", "json"),
            ("prop", "pageimages"),
            ("pithumbsize", THUMB_SIZE),
            ("redirects", "1"),
            ("titles", place),
        ];

        let http = &self.http;
        let url = url.as_str();
        let query = &query;
        let body: QueryResponse = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .get(url)
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await?;

        let found = body
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .filter_map(|page| page.thumbnail.map(|t| t.source))
            .find(|src| is_direct_image_url(src));

        match &found {
            Some(src) => tracing::debug!(place, src = %src, "found wikipedia image"),
            None => tracing::debug!(place, "no usable wikipedia image"),
        }
        Ok(found)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    thumbnail: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    source: String,
}
