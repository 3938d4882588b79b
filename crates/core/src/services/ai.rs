//! Generative AI capability and the fail-soft service built on it.
//!
//! [`GenerativeModel`] is the injected seam: production wires in the Gemini
//! client, tests wire in stubs. [`AiService`] owns the prompts and turns every
//! model failure into the documented fallback instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use communitywatch_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Categories the image classifier may answer with.
pub const IMAGE_CATEGORIES: &[&str] = &[
    "Pothole",
    "Waste Dumping",
    "Broken Streetlight",
    "Fallen Tree",
    "Graffiti",
    "Damaged Public Property",
    "Other",
];

/// Severities the image classifier may answer with.
pub const SEVERITIES: &[&str] = &["Low", "Medium", "High"];

/// Returned by [`AiService::summarize`] when the model is unavailable.
pub const REPORT_FALLBACK: &str = "Error: Could not generate the weekly report";

/// What an embedding will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Stored alongside an issue.
    Document,
    /// Compared against stored documents.
    Query,
}

impl EmbeddingTask {
    /// Wire name understood by the embedding endpoint.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "RETRIEVAL_DOCUMENT",
            Self::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Inline image sent to a vision model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImageInput {
    /// Decode a base64 payload, tolerating a `data:<mime>;base64,` prefix.
    pub fn from_base64(encoded: &str, mime_type: Option<&str>) -> AppResult<Self> {
        let (prefix_mime, payload) = match encoded.split_once(";base64,") {
            Some((head, payload)) => (head.strip_prefix("data:"), payload),
            None => (None, encoded),
        };
        let mime_type = mime_type
            .or(prefix_mime)
            .filter(|m| m.starts_with("image/"))
            .ok_or_else(|| AppError::field("mime_type", "An image MIME type is required."))?;
        let data = STANDARD
            .decode(payload.trim())
            .map_err(|_| AppError::field("image", "Image must be base64 encoded."))?;
        if data.is_empty() {
            return Err(AppError::field("image", "Image is empty."));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }
}

/// Text/vision generation and embedding provider.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate text from a prompt.
    async fn generate_text(&self, prompt: &str) -> AppResult<String>;

    /// Generate text from a prompt and an image.
    async fn generate_with_image(&self, prompt: &str, image: &ImageInput) -> AppResult<String>;

    /// Embed text into a fixed-length vector.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> AppResult<Vec<f64>>;
}

/// Model used when no API key is configured. Every call fails.
pub struct UnconfiguredModel;

#[async_trait]
impl GenerativeModel for UnconfiguredModel {
    async fn generate_text(&self, _prompt: &str) -> AppResult<String> {
        Err(AppError::ExternalService("AI model not configured".to_string()))
    }

    async fn generate_with_image(&self, _prompt: &str, _image: &ImageInput) -> AppResult<String> {
        Err(AppError::ExternalService("AI model not configured".to_string()))
    }

    async fn embed(&self, _text: &str, _task: EmbeddingTask) -> AppResult<Vec<f64>> {
        Err(AppError::ExternalService("AI model not configured".to_string()))
    }
}

/// Result of classifying an issue photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageClassification {
    /// One of [`IMAGE_CATEGORIES`].
    pub category: String,
    /// One of [`SEVERITIES`].
    pub severity: String,
}

/// AI service with prompts and fallbacks.
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn GenerativeModel>,
}

impl AiService {
    /// Create a new AI service.
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// The underlying model.
    #[must_use]
    pub fn model(&self) -> Arc<dyn GenerativeModel> {
        Arc::clone(&self.model)
    }

    /// Classify a photo into a category and severity.
    ///
    /// Unknown categories collapse to `Other`. Any other failure is an
    /// `ExternalService` error for the caller to render.
    pub async fn classify_image(&self, image: &ImageInput) -> AppResult<ImageClassification> {
        let prompt = format!(
            "You are an expert at identifying municipal issues from images. \
             Analyze this image and return a single, minified JSON object with two keys: \
             'category' (choose one from: {}), and 'severity' (choose one from: {}). \
             Do not provide any other text or explanation.",
            quoted_list(IMAGE_CATEGORIES),
            quoted_list(SEVERITIES),
        );

        let raw = self
            .model
            .generate_with_image(&prompt, image)
            .await
            .inspect_err(|e| error!(error = %e, "Image classification failed"))?;

        let mut parsed: ImageClassification = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| {
                warn!(error = %e, "Unparseable image classification");
                AppError::ExternalService(format!("Unparseable classification: {e}"))
            })?;

        if !SEVERITIES.contains(&parsed.severity.as_str()) {
            return Err(AppError::ExternalService(format!(
                "Unknown severity: {}",
                parsed.severity
            )));
        }
        if !IMAGE_CATEGORIES.contains(&parsed.category.as_str()) {
            parsed.category = "Other".to_string();
        }

        Ok(parsed)
    }

    /// Turn a data summary into a Markdown briefing.
    pub async fn summarize(&self, data_summary: &str) -> String {
        let prompt = format!(
            "You are an analyst for a city council. Based ONLY on the provided data summary, \
             write a concise, professional briefing in Markdown format. The title MUST be \
             'Civic Issue Report' followed by the exact 'Date Range' from the data. Highlight \
             key trends and the most critical issue. Do not add unprovided information.\n\n\
             DATA:\n{data_summary}"
        );

        match self.model.generate_text(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Report generation failed");
                REPORT_FALLBACK.to_string()
            }
        }
    }

    /// Embed text, or `None` if the model fails or returns an empty vector.
    pub async fn embed(&self, text: &str, task: EmbeddingTask) -> Option<Vec<f64>> {
        match self.model.embed(text, task).await {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => {
                warn!(task = task.as_str(), "Model returned an empty embedding");
                None
            }
            Err(e) => {
                error!(error = %e, task = task.as_str(), "Embedding failed");
                None
            }
        }
    }
}

/// Strip Markdown code fences that models like to wrap JSON in.
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn quoted_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::StubModel;

    fn image() -> ImageInput {
        ImageInput {
            mime_type: "image/png".to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_embedding_task_names() {
        assert_eq!(EmbeddingTask::Document.as_str(), "RETRIEVAL_DOCUMENT");
        assert_eq!(EmbeddingTask::Query.as_str(), "RETRIEVAL_QUERY");
    }

    #[test]
    fn test_image_from_base64() {
        let plain = ImageInput::from_base64("iVBORw==", Some("image/png")).unwrap();
        assert_eq!(plain.data, vec![0x89, 0x50, 0x4e, 0x47]);

        let data_url = ImageInput::from_base64("data:image/jpeg;base64,iVBORw==", None).unwrap();
        assert_eq!(data_url.mime_type, "image/jpeg");

        assert!(ImageInput::from_base64("iVBORw==", None).is_err());
        assert!(ImageInput::from_base64("iVBORw==", Some("text/plain")).is_err());
        assert!(ImageInput::from_base64("not base64!", Some("image/png")).is_err());
    }

    #[tokio::test]
    async fn test_classify_image_parses_fenced_json() {
        let model = StubModel::with_text("```json\n{\"category\":\"Graffiti\",\"severity\":\"Low\"}\n```");
        let service = AiService::new(Arc::new(model));

        let result = service.classify_image(&image()).await.unwrap();

        assert_eq!(result.category, "Graffiti");
        assert_eq!(result.severity, "Low");
    }

    #[tokio::test]
    async fn test_classify_image_unknown_category_becomes_other() {
        let model = StubModel::with_text(r#"{"category":"Volcano","severity":"High"}"#);
        let service = AiService::new(Arc::new(model));

        let result = service.classify_image(&image()).await.unwrap();

        assert_eq!(result.category, "Other");
    }

    #[tokio::test]
    async fn test_classify_image_failure() {
        let service = AiService::new(Arc::new(UnconfiguredModel));
        assert!(service.classify_image(&image()).await.is_err());

        let garbage = AiService::new(Arc::new(StubModel::with_text("a pothole, probably")));
        assert!(garbage.classify_image(&image()).await.is_err());
    }

    #[tokio::test]
    async fn test_summarize_fallback() {
        let service = AiService::new(Arc::new(UnconfiguredModel));
        assert_eq!(service.summarize("DATA").await, REPORT_FALLBACK);
    }

    #[tokio::test]
    async fn test_embed_failure_is_none() {
        let service = AiService::new(Arc::new(UnconfiguredModel));
        assert!(service.embed("text", EmbeddingTask::Query).await.is_none());

        let empty = AiService::new(Arc::new(StubModel::with_embedding(vec![])));
        assert!(empty.embed("text", EmbeddingTask::Query).await.is_none());
    }
}
