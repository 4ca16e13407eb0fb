//! Distance metric and neighbourhood helpers.
//!
//! Distances are the Euclidean norm between cell centres, rounded to whole
//! cells and reported in feet. Diagonals are therefore cheaper than a
//! Manhattan walk and dearer than a Chebyshev step: one diagonal on the
//! ground plane rounds to 5 ft, a full 3-D diagonal rounds to 10 ft.

use glam::DVec3;

use crate::GridPos;

/// Width of one cell in feet.
pub const FEET_PER_CELL: i32 = 5;

/// Offsets of the 26 cells surrounding a position, in a fixed order.
///
/// The order is lexicographic over (z, y, x), which keeps every search over
/// a neighbourhood deterministic.
pub const NEIGHBOR_OFFSETS: [GridPos; 26] = neighbor_offsets();

const fn neighbor_offsets() -> [GridPos; 26] {
    let mut out = [GridPos::ZERO; 26];
    let mut i = 0;
    let mut z = -1;
    while z <= 1 {
        let mut y = -1;
        while y <= 1 {
            let mut x = -1;
            while x <= 1 {
                if !(x == 0 && y == 0 && z == 0) {
                    out[i] = GridPos::new(x, y, z);
                    i += 1;
                }
                x += 1;
            }
            y += 1;
        }
        z += 1;
    }
    out
}

/// Distance between two cells in feet.
///
/// # Example
///
/// ```
/// use lattice::{distance_ft, GridPos};
///
/// assert_eq!(distance_ft(GridPos::ZERO, GridPos::new(1, 1, 0)), 5);
/// assert_eq!(distance_ft(GridPos::ZERO, GridPos::new(1, 1, 1)), 10);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn distance_ft(a: GridPos, b: GridPos) -> i32 {
    let cells = (a - b).as_dvec3().length().round();
    cells as i32 * FEET_PER_CELL
}

/// True when `b` is one of the 26 cells surrounding `a`.
#[must_use]
pub fn is_adjacent(a: GridPos, b: GridPos) -> bool {
    let d = (a - b).abs();
    a != b && d.max_element() <= 1
}

/// The 26 cells surrounding `pos`, in [`NEIGHBOR_OFFSETS`] order.
pub fn neighbors(pos: GridPos) -> impl Iterator<Item = GridPos> {
    NEIGHBOR_OFFSETS.into_iter().map(move |offset| pos + offset)
}

/// The cell `cells` steps from `from`, heading directly away from `away_from`.
///
/// When both positions coincide there is no direction to flee along, so the
/// step is taken along +y.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn step_away(from: GridPos, away_from: GridPos, cells: i32) -> GridPos {
    let delta = (from - away_from).as_dvec3();
    let dir = if delta == DVec3::ZERO {
        DVec3::Y
    } else {
        delta.normalize()
    };
    from + (dir * f64::from(cells)).round().as_ivec3()
}
