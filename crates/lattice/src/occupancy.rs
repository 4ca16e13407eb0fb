//! Cell occupancy for a single encounter.
//!
//! The map holds three independent layers:
//!
//! - **Occupants**: at most one occupant key per cell, with a reverse index
//!   so an occupant is never in two cells at once
//! - **Markers**: static decorations such as corpses, which never block
//! - **Traces**: cells walked this round, cleared by the owner each round
//!
//! The map is owned by whoever runs the encounter and passed by reference;
//! there is no global grid.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metric::{neighbors, NEIGHBOR_OFFSETS};
use crate::{GridBounds, GridPos};

/// Static marker left on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// Something died here.
    Corpse,
}

/// Rejected occupancy changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OccupancyError {
    /// The cell already holds a different occupant.
    #[error("cell {pos} is already occupied")]
    Occupied {
        /// The contested cell
        pos: GridPos,
    },
    /// The occupant is already on the map and must be removed first.
    #[error("occupant is already placed at {pos}")]
    AlreadyPlaced {
        /// Where the occupant currently stands
        pos: GridPos,
    },
    /// The cell lies outside the map bounds.
    #[error("cell {pos} is out of bounds")]
    OutOfBounds {
        /// The rejected cell
        pos: GridPos,
    },
}

/// Occupancy, markers and path traces for one encounter.
///
/// # Note on `HashMap` Usage
///
/// Lookups are always by known cell or key. Any search that iterates
/// candidates walks [`NEIGHBOR_OFFSETS`] in its fixed order, and
/// [`hash_occupancy`](crate::hash_occupancy) sorts before hashing, so hash
/// iteration order never leaks into results.
#[derive(Debug, Clone)]
pub struct OccupancyMap<K> {
    bounds: GridBounds,
    cells: HashMap<GridPos, K>,
    positions: HashMap<K, GridPos>,
    markers: HashMap<GridPos, Marker>,
    traces: HashSet<GridPos>,
}

impl<K: Copy + Eq + Hash> OccupancyMap<K> {
    /// Create an empty map restricted to `bounds`.
    #[must_use]
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            cells: HashMap::new(),
            positions: HashMap::new(),
            markers: HashMap::new(),
            traces: HashSet::new(),
        }
    }

    /// The legal region of the map.
    #[must_use]
    pub const fn bounds(&self) -> &GridBounds {
        &self.bounds
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cell is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    // -------------------------------------------------------------------------
    // Occupants
    // -------------------------------------------------------------------------

    /// Put `key` on `pos`.
    ///
    /// # Errors
    ///
    /// Fails if the cell is out of bounds, held by another occupant, or if
    /// `key` already stands somewhere else. Re-placing a key on its own cell
    /// is accepted.
    pub fn place(&mut self, key: K, pos: GridPos) -> Result<(), OccupancyError> {
        if !self.bounds.contains(pos) {
            return Err(OccupancyError::OutOfBounds { pos });
        }
        if let Some(current) = self.positions.get(&key) {
            if *current == pos {
                return Ok(());
            }
            return Err(OccupancyError::AlreadyPlaced { pos: *current });
        }
        if self.cells.contains_key(&pos) {
            return Err(OccupancyError::Occupied { pos });
        }
        self.cells.insert(pos, key);
        self.positions.insert(key, pos);
        Ok(())
    }

    /// Take `key` off the map, returning the cell it stood on.
    pub fn remove(&mut self, key: K) -> Option<GridPos> {
        let pos = self.positions.remove(&key)?;
        self.cells.remove(&pos);
        Some(pos)
    }

    /// Move `key` to `pos`, vacating its old cell first.
    ///
    /// # Errors
    ///
    /// Fails if the destination is out of bounds or held by another occupant.
    /// On failure the map is unchanged.
    pub fn relocate(&mut self, key: K, pos: GridPos) -> Result<(), OccupancyError> {
        if !self.bounds.contains(pos) {
            return Err(OccupancyError::OutOfBounds { pos });
        }
        match self.cells.get(&pos) {
            Some(other) if *other != key => return Err(OccupancyError::Occupied { pos }),
            _ => {}
        }
        let from = self.remove(key);
        tracing::trace!(?from, to = %pos, "relocate occupant");
        self.place(key, pos)
    }

    /// The occupant of `pos`, if any.
    #[must_use]
    pub fn occupant(&self, pos: GridPos) -> Option<K> {
        self.cells.get(&pos).copied()
    }

    /// True when `pos` holds an occupant.
    #[must_use]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Where `key` stands, if it is on the map.
    #[must_use]
    pub fn position_of(&self, key: K) -> Option<GridPos> {
        self.positions.get(&key).copied()
    }

    /// True when `pos` is inside the bounds and unoccupied.
    #[must_use]
    pub fn is_free(&self, pos: GridPos) -> bool {
        self.bounds.contains(pos) && !self.is_occupied(pos)
    }

    /// Occupants of the cells surrounding `pos`, in neighbourhood order.
    pub fn occupants_around(&self, pos: GridPos) -> impl Iterator<Item = K> + '_ {
        neighbors(pos).filter_map(|n| self.occupant(n))
    }

    /// The free cell adjacent to `target` that is closest to `from`.
    ///
    /// Candidates are the 26 neighbours of `target` that are in bounds,
    /// unoccupied and accepted by `accept`. Ties keep the first candidate in
    /// [`NEIGHBOR_OFFSETS`] order. `None` means the target cannot be reached.
    pub fn free_adjacent_by(
        &self,
        target: GridPos,
        from: GridPos,
        mut accept: impl FnMut(GridPos) -> bool,
    ) -> Option<GridPos> {
        let mut best: Option<(i32, GridPos)> = None;
        for offset in NEIGHBOR_OFFSETS {
            let cell = target + offset;
            if !self.is_free(cell) || !accept(cell) {
                continue;
            }
            let d = (cell - from).length_squared();
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, cell));
            }
        }
        best.map(|(_, cell)| cell)
    }

    /// [`free_adjacent_by`](Self::free_adjacent_by) accepting every free cell.
    #[must_use]
    pub fn free_adjacent(&self, target: GridPos, from: GridPos) -> Option<GridPos> {
        self.free_adjacent_by(target, from, |_| true)
    }

    /// Occupied cells sorted by (x, y, z).
    #[must_use]
    pub fn sorted_cells(&self) -> Vec<(GridPos, K)> {
        let mut out: Vec<_> = self.cells.iter().map(|(p, k)| (*p, *k)).collect();
        out.sort_by_key(|(p, _)| p.to_array());
        out
    }

    // -------------------------------------------------------------------------
    // Markers
    // -------------------------------------------------------------------------

    /// Leave a static marker on `pos`, replacing any previous one.
    pub fn set_marker(&mut self, pos: GridPos, marker: Marker) {
        self.markers.insert(pos, marker);
    }

    /// The marker on `pos`, if any.
    #[must_use]
    pub fn marker(&self, pos: GridPos) -> Option<Marker> {
        self.markers.get(&pos).copied()
    }

    /// Number of marked cells.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Every marked cell, in no particular order.
    pub fn markers(&self) -> impl Iterator<Item = (GridPos, Marker)> + '_ {
        self.markers.iter().map(|(p, m)| (*p, *m))
    }

    // -------------------------------------------------------------------------
    // Traces
    // -------------------------------------------------------------------------

    /// Record that a path crossed `pos` this round.
    pub fn mark_trace(&mut self, pos: GridPos) {
        self.traces.insert(pos);
    }

    /// True when a path crossed `pos` this round.
    #[must_use]
    pub fn has_trace(&self, pos: GridPos) -> bool {
        self.traces.contains(&pos)
    }

    /// Forget every path trace.
    pub fn clear_traces(&mut self) {
        self.traces.clear();
    }
}

impl<K: Copy + Eq + Hash> Default for OccupancyMap<K> {
    fn default() -> Self {
        Self::new(GridBounds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> OccupancyMap<u32> {
        OccupancyMap::default()
    }

    mod placement_tests {
        use super::*;

        #[test]
        fn place_and_lookup() {
            let mut m = map();
            let p = GridPos::new(1, 2, 0);
            m.place(7, p).unwrap();
            assert_eq!(m.occupant(p), Some(7));
            assert_eq!(m.position_of(7), Some(p));
            assert_eq!(m.len(), 1);
        }

        #[test]
        fn double_occupancy_rejected() {
            let mut m = map();
            let p = GridPos::ZERO;
            m.place(1, p).unwrap();
            assert_eq!(m.place(2, p), Err(OccupancyError::Occupied { pos: p }));
            assert_eq!(m.occupant(p), Some(1));
        }

        #[test]
        fn occupant_cannot_stand_in_two_cells() {
            let mut m = map();
            m.place(1, GridPos::ZERO).unwrap();
            assert_eq!(
                m.place(1, GridPos::new(1, 0, 0)),
                Err(OccupancyError::AlreadyPlaced { pos: GridPos::ZERO })
            );
            assert!(m.place(1, GridPos::ZERO).is_ok());
        }

        #[test]
        fn out_of_bounds_rejected() {
            let mut m = map();
            let p = GridPos::new(0, 0, -1);
            assert_eq!(m.place(1, p), Err(OccupancyError::OutOfBounds { pos: p }));
            assert!(m.is_empty());
        }

        #[test]
        fn relocate_vacates_old_cell() {
            let mut m = map();
            m.place(1, GridPos::ZERO).unwrap();
            m.relocate(1, GridPos::new(0, 3, 0)).unwrap();
            assert!(!m.is_occupied(GridPos::ZERO));
            assert_eq!(m.position_of(1), Some(GridPos::new(0, 3, 0)));
        }

        #[test]
        fn relocate_onto_other_leaves_map_unchanged() {
            let mut m = map();
            m.place(1, GridPos::ZERO).unwrap();
            m.place(2, GridPos::new(1, 0, 0)).unwrap();
            assert!(m.relocate(1, GridPos::new(1, 0, 0)).is_err());
            assert_eq!(m.position_of(1), Some(GridPos::ZERO));
        }

        #[test]
        fn remove_frees_cell() {
            let mut m = map();
            m.place(3, GridPos::ZERO).unwrap();
            assert_eq!(m.remove(3), Some(GridPos::ZERO));
            assert_eq!(m.remove(3), None);
            assert!(m.is_free(GridPos::ZERO));
        }
    }

    mod adjacency_tests {
        use super::*;

        #[test]
        fn picks_cell_nearest_the_mover() {
            let mut m = map();
            let target = GridPos::new(0, 5, 0);
            m.place(9, target).unwrap();
            let cell = m.free_adjacent(target, GridPos::ZERO).unwrap();
            assert_eq!(cell, GridPos::new(0, 4, 0));
        }

        #[test]
        fn skips_occupied_and_rejected_cells() {
            let mut m = map();
            let target = GridPos::new(0, 5, 0);
            m.place(9, target).unwrap();
            m.place(1, GridPos::new(0, 4, 0)).unwrap();
            let cell = m
                .free_adjacent_by(target, GridPos::ZERO, |c| c.z == 0)
                .unwrap();
            assert_eq!(cell.z, 0);
            assert_ne!(cell, GridPos::new(0, 4, 0));
            assert_eq!(cell.y, 4);
        }

        #[test]
        fn surrounded_target_is_unreachable() {
            let mut m = map();
            let target = GridPos::new(0, 0, 5);
            m.place(0, target).unwrap();
            for (i, n) in neighbors(target).enumerate() {
                m.place(u32::try_from(i).unwrap() + 1, n).unwrap();
            }
            assert_eq!(m.free_adjacent(target, GridPos::new(9, 9, 0)), None);
        }

        #[test]
        fn occupants_around_lists_neighbours() {
            let mut m = map();
            m.place(1, GridPos::new(1, 0, 0)).unwrap();
            m.place(2, GridPos::new(3, 0, 0)).unwrap();
            let around: Vec<u32> = m.occupants_around(GridPos::ZERO).collect();
            assert_eq!(around, vec![1]);
        }
    }

    mod layer_tests {
        use super::*;

        #[test]
        fn markers_do_not_block() {
            let mut m = map();
            m.set_marker(GridPos::ZERO, Marker::Corpse);
            assert!(m.is_free(GridPos::ZERO));
            assert_eq!(m.marker(GridPos::ZERO), Some(Marker::Corpse));
            assert_eq!(m.marker_count(), 1);
        }

        #[test]
        fn traces_clear() {
            let mut m = map();
            m.mark_trace(GridPos::new(2, 2, 0));
            assert!(m.has_trace(GridPos::new(2, 2, 0)));
            m.clear_traces();
            assert!(!m.has_trace(GridPos::new(2, 2, 0)));
        }

        #[test]
        fn sorted_cells_are_ordered() {
            let mut m = map();
            m.place(1, GridPos::new(2, 0, 0)).unwrap();
            m.place(2, GridPos::new(-1, 5, 0)).unwrap();
            m.place(3, GridPos::new(-1, 0, 0)).unwrap();
            let keys: Vec<u32> = m.sorted_cells().into_iter().map(|(_, k)| k).collect();
            assert_eq!(keys, vec![3, 2, 1]);
        }
    }
}
