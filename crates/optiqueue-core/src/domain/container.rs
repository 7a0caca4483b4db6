//! Waste containers: the domain objects a layout is made of.

use serde::{Deserialize, Serialize};

/// Geographic position. Field order follows the map convention (lat first);
/// the job service itself speaks `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a service coordinate pair (`[lng, lat]`).
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lng: pair[0],
            lat: pair[1],
        }
    }
}

/// A container placed at a location, either from the current dataset or
/// from an optimized layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteContainer {
    pub id: String,
    pub location: LatLng,
}

impl WasteContainer {
    pub fn new(id: impl Into<String>, location: LatLng) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }
}
