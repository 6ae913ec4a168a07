use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::ApiError;
use crate::retry::RetryPolicy;

use super::{PhotoSource, read_json};

const SERVICE: &str = "unsplash";

/// Landscape photo search on Unsplash.
pub struct UnsplashPhotos {
    http: reqwest::Client,
    base_url: String,
    access_key: SecretString,
    retry: RetryPolicy,
}

impl UnsplashPhotos {
    pub fn new(http: reqwest::Client, base_url: &str, access_key: SecretString, retry: RetryPolicy) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key,
            retry,
        }
    }
}

#[async_trait]
impl PhotoSource for UnsplashPhotos {
    async fn find(&self, place: &str) -> Result<Option<String>, ApiError> {
        tracing::debug!(place, "searching unsplash");
        let url = format!("{}/search/photos", self.base_url);
        let auth = format!("Client-ID {}", self.access_key.expose_secret());
        let query = [
            ("query", place),
            ("per_page", "1"),
            ("orientation", "landscape"),
        ];

        let http = &self.http;
        let url = url.as_str();
        let auth = auth.as_str();
        let query = &query;
        let body: SearchResponse = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .get(url)
                    .header("Authorization", auth)
                    .header("Accept-Version", "v1")
                    .query(query)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await?;

        Ok(body.results.into_iter().next().map(|photo| photo.urls.regular))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}
