//! ASCII snapshots of one horizontal layer.

use std::fmt::Write as _;
use std::hash::Hash;

use crate::{GridPos, Marker, OccupancyMap};

/// Render the `z` layer of the map as a character grid.
///
/// Only the rectangle spanning occupied cells, markers and traces on that
/// layer (padded by one cell) is drawn, with +y at the top. Occupants are
/// drawn with `glyph`, corpses as `x`, traces as `.` and empty cells as a
/// space. Returns an empty string when the layer is blank.
pub fn render_layer<K: Copy + Eq + Hash>(
    map: &OccupancyMap<K>,
    z: i32,
    mut glyph: impl FnMut(K) -> char,
) -> String {
    let on_layer: Vec<GridPos> = map
        .sorted_cells()
        .into_iter()
        .map(|(p, _)| p)
        .chain(map.markers().map(|(p, _)| p))
        .filter(|p| p.z == z)
        .collect();
    let Some(first) = on_layer.first() else {
        return String::new();
    };
    let (mut lo, mut hi) = (*first, *first);
    for p in &on_layer {
        lo = lo.min(*p);
        hi = hi.max(*p);
    }
    lo -= GridPos::new(1, 1, 0);
    hi += GridPos::new(1, 1, 0);

    let mut out = String::new();
    for y in (lo.y..=hi.y).rev() {
        let _ = write!(out, "{y:>4} |");
        for x in lo.x..=hi.x {
            let cell = GridPos::new(x, y, z);
            let c = if let Some(k) = map.occupant(cell) {
                glyph(k)
            } else if let Some(Marker::Corpse) = map.marker(cell) {
                'x'
            } else if map.has_trace(cell) {
                '.'
            } else {
                ' '
            };
            out.push(c);
        }
        out.push_str("|\n");
    }
    out
}
