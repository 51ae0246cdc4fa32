//! Gemini backend for quiz generation
//!
//! Calls the `generateContent` endpoint of the Generative Language API with a
//! response schema that forces the model to answer with a JSON array of
//! questions.

use std::time::Duration;

use async_trait::async_trait;
use qg_core::{
    GenerationError, GenerationRequest, Prompt, QuizData, QuizGenerator,
    generate::parse_quiz_data,
};
use reqwest::Client;
use serde_json::{Value, json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// [`QuizGenerator`] backed by the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key, base_url))
    }

    /// Use an existing HTTP client
    pub fn with_client(
        client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into().trim().to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

/// Schema of the expected answer: an array of fully populated questions
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "question": { "type": "STRING" },
                "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                "correctAnswer": { "type": "STRING" },
                "explanation": { "type": "STRING" },
            },
            "required": ["question", "options", "correctAnswer", "explanation"],
        }
    })
}

/// JSON body of a `generateContent` call
pub fn request_body(request: &GenerationRequest) -> Value {
    let parts: Vec<Value> = match &request.prompt {
        Prompt::Text(text) => vec![json!({ "text": text })],
        Prompt::Parts { text, files } => std::iter::once(json!({ "text": text }))
            .chain(files.iter().map(|file| {
                json!({
                    "inlineData": {
                        "mimeType": file.mime_type,
                        "data": file.data,
                    }
                })
            }))
            .collect(),
    };

    let mut generation_config = json!({
        "responseMimeType": "application/json",
        "responseSchema": response_schema(),
    });
    if let Some(seed) = request.seed {
        generation_config["seed"] = json!(seed);
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

/// Text of the first part of the first candidate
pub fn extract_text(response: &Value) -> Result<&str, GenerationError> {
    response["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|c| c["content"]["parts"].as_array())
        .and_then(|parts| parts.first())
        .and_then(|p| p["text"].as_str())
        .ok_or_else(|| GenerationError::InvalidResponse("missing candidate text".to_string()))
}

#[async_trait]
impl QuizGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<QuizData, GenerationError> {
        let body = request_body(request);
        let start = std::time::Instant::now();

        let resp = self
            .client
            .post(self.endpoint(&request.model))
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = resp.status();
        tracing::debug!(
            model = %request.model,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini responded"
        );

        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parse_quiz_data(extract_text(&json)?)
    }
}
