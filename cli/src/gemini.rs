use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use pantry_core::recipe_ai::AiError;
use pantry_core::service::RecipeGenerator;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("pantry-chef/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // The key travels in a header so it never shows up in URLs or error text.
    fn endpoint(&self) -> String {
        format!("{API_BASE_URL}/models/{}:generateContent", self.model)
    }

    /// Send one prompt and return the first candidate's text.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn generate_content(&self, prompt: &str) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
        };

        debug!("sending request to Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let is_timeout = e.is_timeout();
                error!(error = %e.without_url(), "Gemini request failed");
                AiError::Provider(if is_timeout {
                    "request timed out".to_string()
                } else {
                    "could not reach Gemini".to_string()
                })
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                AiError::Provider(format!("failed to read response: {}", e.without_url()))
            })?;

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            error!(%status, error = %e, "unexpected Gemini response body");
            AiError::Provider(format!("unexpected response (HTTP {status})"))
        })?;

        if !status.is_success() {
            let message = parsed
                .error
                .map_or_else(|| "unknown error".to_string(), |e| e.message);
            error!(%status, %message, "Gemini API error");
            return Err(AiError::Provider(format!("HTTP {status}: {message}")));
        }

        let reply = extract_text(parsed).ok_or(AiError::EmptyResponse)?;
        debug!(reply_len = reply.len(), "received Gemini response");
        Ok(reply)
    }
}

impl RecipeGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AiError>> + Send {
        self.generate_content(prompt)
    }
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .reduce(|mut acc, part| {
            acc.push_str(&part);
            acc
        })
        .filter(|text| !text.trim().is_empty())
}
