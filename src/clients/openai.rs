use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::prompts::copywriter::{build_copywriter_system_prompt, build_copywriter_user_prompt};
use crate::retry::RetryPolicy;

use super::{CopyRequest, Copywriter, IdeaCopy, read_json};

const SERVICE: &str = "openai";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const TEMPERATURE: f32 = 0.8;

/// A copywriter backed by an OpenAI-compatible Chat Completions endpoint.
pub struct OpenAiCopywriter {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiCopywriter {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: SecretString,
        model: &str,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            retry,
        }
    }

    fn parse_response(text: &str) -> Result<Vec<IdeaCopy>, ApiError> {
        let json_str = json_payload(text);
        let parsed: IdeasEnvelope = serde_json::from_str(json_str).map_err(|e| {
            ApiError::invalid(SERVICE, format!("model output is not ideas JSON: {e}"))
        })?;
        Ok(parsed
            .ideas
            .into_iter()
            .map(|mut idea| {
                idea.destination_code = idea.destination_code.trim().to_ascii_uppercase();
                idea
            })
            .collect())
    }
}

#[async_trait]
impl Copywriter for OpenAiCopywriter {
    async fn write(&self, request: &CopyRequest<'_>) -> Result<Vec<IdeaCopy>, ApiError> {
        tracing::info!(
            model = %self.model,
            offers = request.offers.len(),
            count = request.count,
            language = request.language,
            "requesting travel copy"
        );

        let system = build_copywriter_system_prompt(request.language, request.count);
        let user = build_copywriter_user_prompt(request);
        let messages = [
            Message {
                role: "system",
                content: &system,
            },
            Message {
                role: "user",
                content: &user,
            },
        ];
        let body = ApiRequest {
            model: &self.model,
            messages: &messages,
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}{}", self.base_url, COMPLETIONS_PATH);
        let http = &self.http;
        let url = url.as_str();
        let api_key = self.api_key.expose_secret();
        let body = &body;
        let response: ApiResponse = self
            .retry
            .run(SERVICE, move || async move {
                let response = http
                    .post(url)
                    .bearer_auth(api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| ApiError::from_reqwest(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                input = usage.prompt_tokens,
                output = usage.completion_tokens,
                "token usage"
            );
        }

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::invalid(SERVICE, "empty completion"))?;

        let ideas = Self::parse_response(&text)?;
        tracing::info!(count = ideas.len(), "received travel copy");
        Ok(ideas)
    }
}

/// The JSON object in a model reply.
///
/// Takes the body of the first closed markdown fence (any language tag),
/// otherwise the span from the first `{` to the last `}`. Models in JSON
/// mode still sometimes lead with a sentence or wrap the object in a fence.
fn json_payload(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(open) = trimmed.find("```") {
        let after = &trimmed[open + 3..];
        let body = match after.find('\n') {
            Some(nl) if after[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &after[nl + 1..]
            }
            _ => after,
        };
        if let Some(close) = body.find("```") {
            return body[..close].trim();
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message<'a>],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct IdeasEnvelope {
    ideas: Vec<IdeaCopy>,
}
