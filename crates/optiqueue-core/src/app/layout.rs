//! Current layout - parsing of the container dataset
//!
//! The dataset endpoint returns a list of JSON-encoded strings, one per
//! container entity. Entries are parsed independently: a bad entry is logged
//! and dropped, never fatal.

use serde::Deserialize;
use tracing::warn;

use crate::domain::{LatLng, WasteContainer};
use crate::ports::IdGenerator;

/// The slice of a container entity we care about.
///
/// ```json
/// {"id": "urn:ngsi-ld:WasteContainer:1",
///  "location": {"type": "GeoProperty",
///               "value": {"type": "Point", "coordinates": [-0.37, 39.47]}}}
/// ```
#[derive(Debug, Deserialize)]
struct ContainerEntity {
    id: Option<String>,
    location: Option<GeoProperty>,
}

#[derive(Debug, Deserialize)]
struct GeoProperty {
    value: GeoPoint,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    /// `[lng, lat]`, optionally followed by altitude.
    coordinates: Vec<f64>,
}

/// Parse dataset entries into containers, dropping malformed entries and
/// entries without a location. Output keeps input order.
pub fn parse_layout(entries: &[String], ids: &dyn IdGenerator) -> Vec<WasteContainer> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| parse_entry(i, raw, ids))
        .collect()
}

fn parse_entry(index: usize, raw: &str, ids: &dyn IdGenerator) -> Option<WasteContainer> {
    let entity: ContainerEntity = match serde_json::from_str(raw) {
        Ok(entity) => entity,
        Err(e) => {
            warn!(index, error = %e, "dropping malformed container entry");
            return None;
        }
    };

    let Some(location) = entity.location else {
        warn!(index, id = entity.id.as_deref(), "dropping container entry without location");
        return None;
    };

    let &[lng, lat, ..] = location.value.coordinates.as_slice() else {
        warn!(index, id = entity.id.as_deref(), "dropping container entry with incomplete coordinates");
        return None;
    };

    let id = entity
        .id
        .unwrap_or_else(|| ids.generate_container_id().to_string());
    Some(WasteContainer::new(id, LatLng::from_lng_lat([lng, lat])))
}
