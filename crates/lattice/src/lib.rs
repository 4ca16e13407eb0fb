//! # Lattice
//!
//! Integer 3-D grid substrate for tabletop-style skirmishes.
//!
//! Lattice models the battlefield as a sparse set of unit cells addressed by
//! [`GridPos`]. Each cell is five feet across. The crate provides:
//!
//! - **Distance metric**: rounded Euclidean distance reported in feet
//! - **Neighbourhoods**: the 26 cells surrounding a position
//! - **Straight-line paths**: per-axis ranges stretched to a common length
//! - **Occupancy**: at most one occupant per cell, plus static markers and
//!   transient path traces
//!
//! ## Quick Start
//!
//! ```
//! use lattice::{distance_ft, line, GridBounds, GridPos, OccupancyMap};
//!
//! let mut map: OccupancyMap<u32> = OccupancyMap::new(GridBounds::default());
//! map.place(1, GridPos::new(0, 0, 0)).unwrap();
//!
//! let path = line(GridPos::new(0, 0, 0), GridPos::new(4, 2, 0));
//! assert_eq!(path.len(), 5);
//! assert_eq!(distance_ft(GridPos::ZERO, GridPos::new(3, 4, 0)), 25);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod hash;
pub mod metric;
pub mod occupancy;
pub mod path;
pub mod render;

// Re-exports for convenience
pub use hash::{hash_occupancy, hash_occupancy_into};
pub use metric::{distance_ft, is_adjacent, neighbors, step_away, FEET_PER_CELL, NEIGHBOR_OFFSETS};
pub use occupancy::{Marker, OccupancyError, OccupancyMap};
pub use path::line;
pub use render::render_layer;

/// A cell address on the grid. `z` grows upward; `z == 0` is the ground.
pub type GridPos = glam::IVec3;

/// Inclusive axis-aligned box of legal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridBounds {
    /// Minimum corner (inclusive)
    pub min: GridPos,
    /// Maximum corner (inclusive)
    pub max: GridPos,
}

impl GridBounds {
    /// Create bounds from two corners, normalising their order per axis.
    #[must_use]
    pub fn new(a: GridPos, b: GridPos) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Check whether a cell lies inside the bounds.
    #[must_use]
    pub fn contains(&self, pos: GridPos) -> bool {
        pos.cmpge(self.min).all() && pos.cmple(self.max).all()
    }

    /// Clamp a cell to the nearest legal cell.
    #[must_use]
    pub fn clamp(&self, pos: GridPos) -> GridPos {
        pos.clamp(self.min, self.max)
    }
}

impl Default for GridBounds {
    /// A 201 x 201 ground plane with twenty cells of airspace.
    fn default() -> Self {
        Self {
            min: GridPos::new(-100, -100, 0),
            max: GridPos::new(100, 100, 20),
        }
    }
}
