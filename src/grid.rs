//! Lattice coordinates of the 3x3x3 cube and text rendering of its layout.
//!
//! Cells are addressed by centered integer coordinates in `-1..=1` on each
//! axis, so the cube's center piece sits at `(0, 0, 0)`.

/// A lattice cell, in centered coordinates.
pub type Coord = (i32, i32, i32);

/// Pieces per axis.
pub const DIM: usize = 3;

/// Total cells in the cube.
pub const GRID_SIZE: usize = DIM * DIM * DIM;

/// Pieces in one layer.
pub const LAYER_SIZE: usize = DIM * DIM;

const HALF: i32 = (DIM as i32 - 1) / 2;

/// Which piece (by assembly index) occupies each cell.
pub type Layout = [Option<usize>; GRID_SIZE];

/// Returns whether a coordinate lies inside the cube.
#[inline]
pub fn in_bounds((x, y, z): Coord) -> bool {
    [x, y, z].iter().all(|c| (-HALF..=HALF).contains(c))
}

/// Converts centered coordinates to a linear cell index.
///
/// Index order is x-major: `idx = x * DIM * DIM + y * DIM + z` after shifting
/// each coordinate to start at zero.
#[inline(always)]
pub const fn coord_to_idx((x, y, z): Coord) -> usize {
    ((x + HALF) as usize) * DIM * DIM + ((y + HALF) as usize) * DIM + ((z + HALF) as usize)
}

/// Converts a linear cell index to centered coordinates.
#[inline(always)]
pub const fn idx_to_coord(cell_index: usize) -> Coord {
    (
        (cell_index / (DIM * DIM)) as i32 - HALF,
        ((cell_index / DIM) % DIM) as i32 - HALF,
        (cell_index % DIM) as i32 - HALF,
    )
}

/// Display character for a piece index: `0-9`, then `A-Z`.
fn piece_char(piece_index: usize) -> char {
    char::from_digit(piece_index as u32 % 36, 36)
        .unwrap_or('?')
        .to_ascii_uppercase()
}

/// Formats a layout as a human-readable string.
///
/// Displays the z-slices side by side, rows from top (`y = 1`) to bottom,
/// columns from `x = -1` to `x = 1`. Empty cells show as '.'.
pub fn format_layout(layout: &Layout) -> String {
    // each slice is DIM characters wide, followed by a gap
    const GAP: &str = "    ";
    let column_width = DIM + GAP.len();

    let mut header = String::new();
    for z in -HALF..=HALF {
        header.push_str(&format!("{:<column_width$}", format!("z={z}")));
    }
    let mut output = header.trim_end().to_owned();
    output.push('\n');

    for y in (-HALF..=HALF).rev() {
        for z in -HALF..=HALF {
            if z > -HALF {
                output.push_str(GAP);
            }
            for x in -HALF..=HALF {
                let display_char = layout[coord_to_idx((x, y, z))].map_or('.', piece_char);
                output.push(display_char);
            }
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_conversion_roundtrip() {
        for idx in 0..GRID_SIZE {
            let coord = idx_to_coord(idx);
            assert!(in_bounds(coord), "idx_to_coord({idx}) produced {coord:?}");
            assert_eq!(coord_to_idx(coord), idx, "Roundtrip failed for index {idx}");
        }
        assert_eq!(idx_to_coord(0), (-1, -1, -1));
        assert_eq!(coord_to_idx((0, 0, 0)), 13);
        assert!(!in_bounds((2, 0, 0)));
    }

    #[test]
    fn test_format_layout() {
        let mut layout: Layout = [None; GRID_SIZE];
        for (idx, cell) in layout.iter_mut().enumerate() {
            *cell = Some(idx);
        }
        layout[coord_to_idx((0, 0, 0))] = None;

        insta::assert_snapshot!(format_layout(&layout), @r"
        z=-1   z=0    z=1
        6FO    7GP    8HQ
        3CL    4.M    5EN
        09I    1AJ    2BK
        ");
    }
}
