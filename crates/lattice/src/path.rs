//! Straight-line path generation.
//!
//! Paths are not rasterised lines. Each axis gets its own inclusive integer
//! range from start to end, the longest range sets the path length, and the
//! shorter ranges are stretched to that length by nearest-index sampling.
//! The result always starts at `from` and ends at `to`.

use crate::GridPos;

/// Inclusive integer range from `a` to `b`, stepping by one in either direction.
fn axis_range(a: i32, b: i32) -> Vec<i32> {
    if a <= b {
        (a..=b).collect()
    } else {
        (b..=a).rev().collect()
    }
}

/// Sample `axis` at `len` evenly spaced indices.
fn stretch(axis: &[i32], len: usize) -> impl Iterator<Item = i32> + '_ {
    (0..len).map(move |i| axis[i * axis.len() / len])
}

/// Build the cell sequence from `from` to `to`, both inclusive.
///
/// # Example
///
/// ```
/// use lattice::{line, GridPos};
///
/// let path = line(GridPos::new(0, 0, 0), GridPos::new(3, 1, 0));
/// assert_eq!(path.first(), Some(&GridPos::new(0, 0, 0)));
/// assert_eq!(path.last(), Some(&GridPos::new(3, 1, 0)));
/// assert_eq!(path.len(), 4);
/// ```
#[must_use]
pub fn line(from: GridPos, to: GridPos) -> Vec<GridPos> {
    let xs = axis_range(from.x, to.x);
    let ys = axis_range(from.y, to.y);
    let zs = axis_range(from.z, to.z);
    let len = xs.len().max(ys.len()).max(zs.len());

    stretch(&xs, len)
        .zip(stretch(&ys, len))
        .zip(stretch(&zs, len))
        .map(|((x, y), z)| GridPos::new(x, y, z))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_adjacent;
    use proptest::prelude::*;

    mod line_tests {
        use super::*;

        #[test]
        fn single_cell() {
            let p = GridPos::new(2, -3, 1);
            assert_eq!(line(p, p), vec![p]);
        }

        #[test]
        fn axis_aligned_runs_backwards() {
            let path = line(GridPos::new(3, 0, 0), GridPos::ZERO);
            assert_eq!(
                path,
                vec![
                    GridPos::new(3, 0, 0),
                    GridPos::new(2, 0, 0),
                    GridPos::new(1, 0, 0),
                    GridPos::ZERO,
                ]
            );
        }

        #[test]
        fn shorter_axis_is_stretched() {
            let path = line(GridPos::ZERO, GridPos::new(3, 1, 0));
            let ys: Vec<i32> = path.iter().map(|p| p.y).collect();
            // indices 0*2/4, 1*2/4, 2*2/4, 3*2/4 -> 0, 0, 1, 1
            assert_eq!(ys, vec![0, 0, 1, 1]);
        }

        #[test]
        fn climbs_in_three_dimensions() {
            let path = line(GridPos::ZERO, GridPos::new(2, 2, 2));
            assert_eq!(path, vec![GridPos::ZERO, GridPos::splat(1), GridPos::splat(2)]);
        }
    }

    proptest! {
        #[test]
        fn endpoints_and_contiguity(
            ax in -20i32..20, ay in -20i32..20, az in 0i32..6,
            bx in -20i32..20, by in -20i32..20, bz in 0i32..6,
        ) {
            let a = GridPos::new(ax, ay, az);
            let b = GridPos::new(bx, by, bz);
            let path = line(a, b);
            prop_assert_eq!(path[0], a);
            prop_assert_eq!(*path.last().unwrap(), b);
            let longest = (a - b).abs().max_element() + 1;
            prop_assert_eq!(path.len(), usize::try_from(longest).unwrap());
            for pair in path.windows(2) {
                prop_assert!(is_adjacent(pair[0], pair[1]));
            }
        }
    }
}
