//! Gemini REST client implementing [`GenerativeModel`].

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use communitywatch_common::{AppError, AppResult, config::AiConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::ai::{EmbeddingTask, GenerativeModel, ImageInput};

/// Gemini `generateContent` / `embedContent` client.
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    generation_model: String,
    embedding_model: String,
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

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Deserialize)]
struct Embedding {
    values: Vec<f64>,
}

impl GeminiClient {
    /// Build a client from configuration.
    pub fn new(config: &AiConfig, api_key: String) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn post(&self, url: &str, body: &Value) -> AppResult<reqwest::Response> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Gemini request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Gemini API error: {status} - {body}"
            )));
        }

        Ok(response)
    }

    async fn generate(&self, parts: Vec<Value>) -> AppResult<String> {
        let body = json!({
            "contents": [{ "parts": parts }],
        });
        let url = self.endpoint(&self.generation_model, "generateContent");
        debug!(model = %self.generation_model, "Calling Gemini generateContent");

        let response: GenerateResponse = self.post(&url, &body).await?.json().await.map_err(
            |e| AppError::ExternalService(format!("Failed to parse Gemini response: {e}")),
        )?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::ExternalService(
                "Gemini returned no text".to_string(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> AppResult<String> {
        self.generate(vec![json!({ "text": prompt })]).await
    }

    async fn generate_with_image(&self, prompt: &str, image: &ImageInput) -> AppResult<String> {
        self.generate(vec![
            json!({ "text": prompt }),
            json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": STANDARD.encode(&image.data),
                }
            }),
        ])
        .await
    }

    async fn embed(&self, text: &str, task: EmbeddingTask) -> AppResult<Vec<f64>> {
        let body = json!({
            "model": format!("models/{}", self.embedding_model),
            "content": { "parts": [{ "text": text }] },
            "taskType": task.as_str(),
        });
        let url = self.endpoint(&self.embedding_model, "embedContent");
        debug!(model = %self.embedding_model, task = task.as_str(), "Calling Gemini embedContent");

        let response: EmbedResponse = self.post(&url, &body).await?.json().await.map_err(
            |e| AppError::ExternalService(format!("Failed to parse Gemini embedding: {e}")),
        )?;

        Ok(response.embedding.values)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = AiConfig {
            base_url: "https://example.com/v1beta/".to_string(),
            ..AiConfig::default()
        };
        let client = GeminiClient::new(&config, "key".to_string()).unwrap();

        assert_eq!(
            client.endpoint("gemini-1.5-flash", "generateContent"),
            "https://example.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_generate_response() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        assert_eq!(text, "{\"a\":1}");
    }

    #[test]
    fn test_parse_embed_response() {
        let raw = r#"{"embedding":{"values":[0.1,-0.2,0.3]}}"#;
        let parsed: EmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embedding.values, vec![0.1, -0.2, 0.3]);
    }
}
