use std::io::Write;

use async_trait::async_trait;

use crate::error::ApiError;

use super::Publisher;

/// Dry-run publisher: prints posts to stdout instead of delivering them.
pub struct ConsolePublisher {
    channel: String,
}

impl ConsolePublisher {
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
        }
    }

    fn print(&self, photo: Option<&str>, text: &str) -> Result<(), ApiError> {
        let mut out = std::io::stdout().lock();
        let result = (|| {
            writeln!(out, "\n--- [dry run] {} ---", self.channel)?;
            if let Some(photo) = photo {
                writeln!(out, "[photo] {}", photo)?;
            }
            writeln!(out, "{}", text)?;
            out.flush()
        })();
        result.map_err(|e| ApiError::Network {
            service: "console",
            detail: e.to_string(),
        })
    }
}

#[async_trait]
impl Publisher for ConsolePublisher {
    async fn send_text(&self, text: &str) -> Result<(), ApiError> {
        self.print(None, text)
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), ApiError> {
        self.print(Some(photo_url), caption)
    }
}
