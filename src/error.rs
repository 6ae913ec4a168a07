//! Error taxonomy.
//!
//! Configuration errors abort the whole run before any channel starts.
//! Everything else is scoped to the channel that produced it and ends up as
//! the error text of its [`ChannelResult`](crate::runner::ChannelResult).

use std::path::PathBuf;

/// Missing or malformed configuration. Fatal for the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration format: expected an array or an object with a `channels` key")]
    InvalidFormat,

    #[error("no channel configurations found")]
    NoChannels,

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("channel #{index}: invalid `{field}`: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("invalid cron expression {expr:?}: expected 5 fields, found {found}")]
    InvalidCron { expr: String, found: usize },
}

/// Failure of a single external API call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// 401/403 or a rejected credential exchange. Never retried.
    #[error("{service}: authentication failed ({detail})")]
    Authentication { service: &'static str, detail: String },

    /// Network or server errors that outlived every retry.
    #[error("{service}: gave up after {attempts} attempt(s): {last}")]
    TransientNetwork {
        service: &'static str,
        attempts: u32,
        last: String,
    },

    /// The payload did not have the expected shape.
    #[error("{service}: invalid response: {detail}")]
    InvalidResponse { service: &'static str, detail: String },

    /// A 4xx other than auth/429, or an API-level refusal. Never retried.
    #[error("{service}: request rejected ({status}): {detail}")]
    Rejected {
        service: &'static str,
        status: u16,
        detail: String,
    },

    /// Connection-level failure of one attempt. Retryable.
    #[error("{service}: network error: {detail}")]
    Network { service: &'static str, detail: String },

    /// 5xx or 429 on one attempt. Retryable.
    #[error("{service}: server error ({status}): {detail}")]
    Server {
        service: &'static str,
        status: u16,
        detail: String,
    },
}

impl ApiError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Server { .. })
    }

    pub fn service(&self) -> &'static str {
        match self {
            ApiError::Authentication { service, .. }
            | ApiError::TransientNetwork { service, .. }
            | ApiError::InvalidResponse { service, .. }
            | ApiError::Rejected { service, .. }
            | ApiError::Network { service, .. }
            | ApiError::Server { service, .. } => service,
        }
    }

    pub fn invalid(service: &'static str, detail: impl Into<String>) -> Self {
        ApiError::InvalidResponse {
            service,
            detail: detail.into(),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(service: &'static str, status: reqwest::StatusCode, body: String) -> Self {
        let code = status.as_u16();
        let detail = truncate(&body, 300);
        match code {
            401 | 403 => ApiError::Authentication { service, detail },
            429 => ApiError::Server {
                service,
                status: code,
                detail,
            },
            500..=599 => ApiError::Server {
                service,
                status: code,
                detail,
            },
            _ => ApiError::Rejected {
                service,
                status: code,
                detail,
            },
        }
    }

    /// Classify a transport error from reqwest.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        // URLs can carry tokens (Telegram paths, Travelpayouts query).
        let err = err.without_url();
        if err.is_decode() {
            return ApiError::invalid(service, err.to_string());
        }
        ApiError::Network {
            service,
            detail: err.to_string(),
        }
    }
}

/// Why a single channel could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no flight offers found from {origin}")]
    NoOffers { origin: String },

    #[error("AI response contained no usable ideas for the fetched offers")]
    NoIdeas,
}

fn truncate(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{cut}…")
}
