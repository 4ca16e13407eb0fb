//! State hashing for determinism verification.
//!
//! Two encounters driven by the same seed must leave identical maps behind.
//! The hash walks occupants and markers in sorted cell order so the result is
//! independent of `HashMap` iteration order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::{Marker, OccupancyMap};

/// Compute a deterministic hash of an occupancy map.
///
/// Covers every occupied cell with its occupant and every static marker.
/// Path traces are transient and excluded.
#[must_use]
pub fn hash_occupancy<K: Copy + Eq + Hash>(map: &OccupancyMap<K>) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_occupancy_into(map, &mut hasher);
    hasher.finish()
}

/// Feed the map state into an existing hasher.
pub fn hash_occupancy_into<K: Copy + Eq + Hash, H: Hasher>(map: &OccupancyMap<K>, hasher: &mut H) {
    let bounds = map.bounds();
    bounds.min.to_array().hash(hasher);
    bounds.max.to_array().hash(hasher);

    let cells = map.sorted_cells();
    cells.len().hash(hasher);
    for (pos, key) in cells {
        pos.to_array().hash(hasher);
        key.hash(hasher);
    }

    let mut marked: Vec<_> = map.markers().collect();
    marked.sort_by_key(|(pos, _)| pos.to_array());
    marked.len().hash(hasher);
    for (pos, marker) in marked {
        pos.to_array().hash(hasher);
        match marker {
            Marker::Corpse => 0u8.hash(hasher),
        }
    }
}
