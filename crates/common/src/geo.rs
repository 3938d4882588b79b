//! Geographic primitives: coordinates and axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a coordinate, rejecting values outside the valid ranges.
    pub fn new(lat: f64, lng: f64) -> AppResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::field(
                "latitude",
                "Latitude must be between -90 and 90",
            ));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::field(
                "longitude",
                "Longitude must be between -180 and 180",
            ));
        }
        Ok(Self { lat, lng })
    }

    /// Build a coordinate from optional request fields.
    ///
    /// Either side missing yields the "Missing coordinates" error.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> AppResult<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng),
            _ => Err(AppError::BadRequest("Missing coordinates".to_string())),
        }
    }

    /// Axis-aligned box of `radius` degrees around this point.
    #[must_use]
    pub fn bounding_box(&self, radius: f64) -> BoundingBox {
        BoundingBox {
            min_lat: self.lat - radius,
            max_lat: self.lat + radius,
            min_lng: self.lng - radius,
            max_lng: self.lng + radius,
        }
    }
}

/// Axis-aligned latitude/longitude box. Both edges are inclusive.
///
/// This is deliberately not a circle: "nearby" means within the radius on
/// each axis independently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Whether the coordinate lies inside the box, boundaries included.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.1).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_from_parts_missing() {
        let err = GeoPoint::from_parts(Some(1.0), None).unwrap_err();
        assert_eq!(err.to_string(), "Missing coordinates");
    }

    #[test]
    fn test_bounding_box_inclusive_edges() {
        let bbox = GeoPoint { lat: 10.0, lng: 20.0 }.bounding_box(0.5);

        assert!(bbox.contains(10.0, 20.0));
        assert!(bbox.contains(10.5, 20.5));
        assert!(bbox.contains(9.5, 19.5));
        assert!(bbox.contains(10.5, 19.5));
        assert!(!bbox.contains(10.51, 20.0));
        assert!(!bbox.contains(10.0, 19.49));
    }

    #[test]
    fn test_bounding_box_is_square_not_circle() {
        // The corner is further than `radius` from the center but still inside.
        let bbox = GeoPoint { lat: 0.0, lng: 0.0 }.bounding_box(0.05);
        assert!(bbox.contains(0.05, 0.05));
    }
}
