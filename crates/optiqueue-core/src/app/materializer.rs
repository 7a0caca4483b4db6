//! Materializer - turns job results into domain objects
//!
//! The service returns a bare list of `[lng, lat]` pairs. Each pair becomes
//! a [`WasteContainer`] with a fresh identifier.

use std::sync::Arc;

use crate::domain::{LatLng, WasteContainer};
use crate::error::MaterializeError;
use crate::ports::IdGenerator;

#[derive(Clone)]
pub struct Materializer {
    ids: Arc<dyn IdGenerator>,
}

impl Materializer {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// One container per pair, same order, same count.
    pub fn materialize(&self, pairs: &[[f64; 2]]) -> Vec<WasteContainer> {
        pairs
            .iter()
            .map(|&pair| {
                WasteContainer::new(
                    self.ids.generate_container_id().to_string(),
                    LatLng::from_lng_lat(pair),
                )
            })
            .collect()
    }

    /// Decode a raw `SUCCESS` payload and materialize it.
    pub fn decode(&self, raw: &serde_json::Value) -> Result<Vec<WasteContainer>, MaterializeError> {
        let pairs: Vec<[f64; 2]> = serde_json::from_value(raw.clone())?;
        Ok(self.materialize(&pairs))
    }
}
