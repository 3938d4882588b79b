//! Forward and reverse geocoding.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use communitywatch_common::{AppError, AppResult, GeoPoint, config::GeocodingConfig};
use serde::Deserialize;
use tracing::{error, warn};
use url::Url;

/// Shown when a reverse lookup finds nothing.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Shown when a reverse lookup fails.
pub const ADDRESS_UNAVAILABLE: &str = "Could not determine address";

/// Name to coordinates and back.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a place name. `Ok(None)` means no match.
    async fn forward(&self, query: &str) -> AppResult<Option<GeoPoint>>;

    /// Describe a coordinate. `Ok(None)` means no match.
    async fn reverse(&self, point: GeoPoint) -> AppResult<Option<String>>;
}

/// Nominatim REST client.
pub struct NominatimGeocoder {
    http_client: reqwest::Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

#[derive(Deserialize)]
struct ReverseResult {
    display_name: Option<String>,
    error: Option<String>,
}

impl NominatimGeocoder {
    /// Build a client from configuration.
    pub fn new(config: &GeocodingConfig) -> AppResult<Self> {
        let mut raw = config.base_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = Url::parse(&raw)
            .map_err(|e| AppError::Config(format!("Invalid geocoding base URL: {e}")))?;
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| AppError::Internal(format!("Invalid geocoding URL: {e}")))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, url: Url) -> AppResult<T> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Nominatim request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Nominatim error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse Nominatim response: {e}")))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, query: &str) -> AppResult<Option<GeoPoint>> {
        let url = self.url("search", &[("q", query), ("format", "json"), ("limit", "1")])?;
        let results: Vec<SearchResult> = self.get(url).await?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };
        let lat = first
            .lat
            .parse::<f64>()
            .map_err(|e| AppError::ExternalService(format!("Bad latitude from Nominatim: {e}")))?;
        let lng = first
            .lon
            .parse::<f64>()
            .map_err(|e| AppError::ExternalService(format!("Bad longitude from Nominatim: {e}")))?;

        GeoPoint::new(lat, lng).map(Some)
    }

    async fn reverse(&self, point: GeoPoint) -> AppResult<Option<String>> {
        let lat = point.lat.to_string();
        let lng = point.lng.to_string();
        let url = self.url("reverse", &[("lat", &lat), ("lon", &lng), ("format", "json")])?;
        let result: ReverseResult = self.get(url).await?;

        if result.error.is_some() {
            return Ok(None);
        }
        Ok(result.display_name)
    }
}

/// Geocoding with failures absorbed into fallbacks.
#[derive(Clone)]
pub struct GeocodingService {
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodingService {
    /// Create a new geocoding service.
    #[must_use]
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve a place name, or `None` when unknown or on failure.
    pub async fn resolve(&self, location: &str) -> Option<GeoPoint> {
        match self.geocoder.forward(location).await {
            Ok(Some(point)) => Some(point),
            Ok(None) => {
                warn!(location = %location, "Geocoding found no match");
                None
            }
            Err(e) => {
                error!(location = %location, error = %e, "Geocoding failed");
                None
            }
        }
    }

    /// Human-readable address for a coordinate. Never fails.
    pub async fn describe(&self, point: GeoPoint) -> String {
        match self.geocoder.reverse(point).await {
            Ok(Some(address)) if !address.trim().is_empty() => address,
            Ok(_) => {
                warn!(lat = point.lat, lng = point.lng, "Reverse geocoding found no match");
                UNKNOWN_LOCATION.to_string()
            }
            Err(e) => {
                error!(lat = point.lat, lng = point.lng, error = %e, "Reverse geocoding failed");
                ADDRESS_UNAVAILABLE.to_string()
            }
        }
    }
}
