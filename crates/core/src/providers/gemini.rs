use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::prompts::{care_tips_prompt, question_prompt, DIAGNOSIS_PROMPT};
use super::traits::AdvisoryProvider;
use crate::errors::CoreError;
use crate::models::advisory::{CareTips, CareTipsRequest, Diagnosis, ImageDataUri};
use crate::models::settings::AdvisorSettings;

const PROVIDER: &str = "Gemini";

/// Google Gemini `generateContent` provider.
///
/// - **Requires**: API key (settings `advisor.apiKey` or `FARM_ADVISOR_API_KEY`).
/// - **Output**: JSON mode; the first candidate's text is parsed into the
///   expected structure.
///
/// The key travels in the `x-goog-api-key` header and never appears in
/// URLs or error messages.
pub struct GeminiProvider {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(settings: &AdvisorSettings) -> Result<Self, CoreError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::Config("Advisor API key is not configured".into()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CoreError::Config(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: generate_content_url(&settings.endpoint, &settings.model),
            api_key,
        })
    }

    async fn generate<T: DeserializeOwned>(&self, op: &str, body: Value) -> Result<T, CoreError> {
        let started_at = Instant::now();
        let result = self.send(body).await;
        match &result {
            Ok(_) => info!(
                "event=advisory module=gemini status=ok op={op} duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=advisory module=gemini status=error op={op} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        parse_model_json(&extract_text(&result?)?)
    }

    async fn send(&self, body: Value) -> Result<Value, CoreError> {
        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let payload: Value = resp.json().await.map_err(|e| api_error(format!(
            "Failed to parse response (HTTP {}): {e}",
            status.as_u16()
        )))?;

        if !status.is_success() {
            let message = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("request rejected");
            return Err(api_error(format!("HTTP {}: {message}", status.as_u16())));
        }
        Ok(payload)
    }
}

#[async_trait]
impl AdvisoryProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate_care_tips(&self, request: &CareTipsRequest) -> Result<CareTips, CoreError> {
        self.generate("care_tips", text_body(&care_tips_prompt(request)))
            .await
    }

    async fn answer_question(&self, question: &str) -> Result<CareTips, CoreError> {
        self.generate("question", text_body(&question_prompt(question)))
            .await
    }

    async fn diagnose(&self, image: &ImageDataUri) -> Result<Diagnosis, CoreError> {
        self.generate("diagnose", image_body(DIAGNOSIS_PROMPT, image))
            .await
    }
}

// ── Request / response helpers ──────────────────────────────────────

/// `{endpoint}/models/{model}:generateContent`
pub fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model
    )
}

/// Request body for a text-only prompt with JSON output.
pub fn text_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

/// Request body for a prompt with one inline image.
pub fn image_body(prompt: &str, image: &ImageDataUri) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": prompt },
                { "inlineData": { "mimeType": image.mime_type, "data": image.data } }
            ]
        }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String, CoreError> {
    let parsed: GenerateResponse = serde_json::from_value(response.clone())
        .map_err(|e| api_error(format!("Unexpected response shape: {e}")))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(api_error("Response contained no text".into()));
    }
    Ok(text)
}

/// Parse the model's JSON answer, tolerating a surrounding ```json fence.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, CoreError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(unfenced)
        .map_err(|e| api_error(format!("Model output did not match the expected format: {e}")))
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}
