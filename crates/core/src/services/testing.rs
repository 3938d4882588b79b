//! Stub capabilities for service tests.

use std::collections::HashMap;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use communitywatch_common::{AppError, AppResult, GeoPoint};

use super::ai::{EmbeddingTask, GenerativeModel, ImageInput};
use super::geocoding::Geocoder;

/// Generative model returning canned answers and counting calls.
#[derive(Default)]
pub struct StubModel {
    text: Option<String>,
    embeddings: HashMap<String, Vec<f64>>,
    default_embedding: Option<Vec<f64>>,
    calls: Arc<AtomicUsize>,
}

impl StubModel {
    /// Answer every generation call with `text`.
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    /// Answer every embedding call with `vector`.
    pub fn with_embedding(vector: Vec<f64>) -> Self {
        Self {
            default_embedding: Some(vector),
            ..Self::default()
        }
    }

    /// Answer embedding calls for `text` with `vector`.
    pub fn embedding_for(mut self, text: &str, vector: Vec<f64>) -> Self {
        self.embeddings.insert(text.to_string(), vector);
        self
    }

    /// Shared call counter.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn answer(&self) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| AppError::ExternalService("stub has no text".to_string()))
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn generate_text(&self, _prompt: &str) -> AppResult<String> {
        self.answer()
    }

    async fn generate_with_image(&self, _prompt: &str, _image: &ImageInput) -> AppResult<String> {
        self.answer()
    }

    async fn embed(&self, text: &str, _task: EmbeddingTask) -> AppResult<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.embeddings
            .get(text)
            .or(self.default_embedding.as_ref())
            .cloned()
            .ok_or_else(|| AppError::ExternalService("stub has no embedding".to_string()))
    }
}

/// Geocoder backed by fixed tables.
#[derive(Default)]
pub struct StubGeocoder {
    places: HashMap<String, GeoPoint>,
    address: Option<String>,
    fail: bool,
}

impl StubGeocoder {
    /// Resolve `name` to `point`.
    pub fn place(mut self, name: &str, point: GeoPoint) -> Self {
        self.places.insert(name.to_string(), point);
        self
    }

    /// Answer every reverse lookup with `address`.
    pub fn address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    /// Make every lookup fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn forward(&self, query: &str) -> AppResult<Option<GeoPoint>> {
        if self.fail {
            return Err(AppError::ExternalService("geocoder down".to_string()));
        }
        Ok(self.places.get(query).copied())
    }

    async fn reverse(&self, _point: GeoPoint) -> AppResult<Option<String>> {
        if self.fail {
            return Err(AppError::ExternalService("geocoder down".to_string()));
        }
        Ok(self.address.clone())
    }
}
