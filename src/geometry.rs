//! Cube-aligned rotations and settling of piece poses.
//!
//! A cube has 24 possible orientations in 3D space (the rotation group of a cube).
//! These are the 6 ways to choose which face points up, times 4 rotations around
//! the vertical axis. After every turn each piece must sit on one of them, at a
//! lattice position, or later turns pick up floating-point drift.

use glam::{Mat3, Quat, Vec3};

use crate::grid::Coord;
use crate::scene::Transform;

/// All 24 rotations of a cube, as maps on integer coordinates.
///
/// Organized as 6 face-up choices x 4 rotations around vertical:
/// - Rotations 0-3: +Z face up
/// - Rotations 4-7: +Y face up
/// - Rotations 8-11: -Z face up
/// - Rotations 12-15: -Y face up
/// - Rotations 16-19: +X face up
/// - Rotations 20-23: -X face up
pub const ROTATIONS: [fn(Coord) -> Coord; 24] = [
    // +Z face up (identity orientation), rotate around Z axis
    |(x, y, z)| (x, y, z),      // 0 degrees
    |(x, y, z)| (-y, x, z),     // 90 degrees
    |(x, y, z)| (-x, -y, z),    // 180 degrees
    |(x, y, z)| (y, -x, z),     // 270 degrees
    // +Y face up, rotate around Y axis
    |(x, y, z)| (x, -z, y),
    |(x, y, z)| (z, x, y),
    |(x, y, z)| (-x, z, y),
    |(x, y, z)| (-z, -x, y),
    // -Z face up, rotate around Z axis
    |(x, y, z)| (x, -y, -z),
    |(x, y, z)| (y, x, -z),
    |(x, y, z)| (-x, y, -z),
    |(x, y, z)| (-y, -x, -z),
    // -Y face up, rotate around Y axis
    |(x, y, z)| (x, z, -y),
    |(x, y, z)| (-z, x, -y),
    |(x, y, z)| (-x, -z, -y),
    |(x, y, z)| (z, -x, -y),
    // +X face up, rotate around X axis
    |(x, y, z)| (z, y, -x),
    |(x, y, z)| (-y, z, -x),
    |(x, y, z)| (-z, -y, -x),
    |(x, y, z)| (y, -z, -x),
    // -X face up, rotate around X axis
    |(x, y, z)| (-z, y, x),
    |(x, y, z)| (-y, -z, x),
    |(x, y, z)| (z, -y, x),
    |(x, y, z)| (y, z, x),
];

/// Converts a coordinate map from [`ROTATIONS`] into a quaternion.
fn rotation_to_quat(rotate: fn(Coord) -> Coord) -> Quat {
    let column = |basis: Coord| {
        let (x, y, z) = rotate(basis);
        Vec3::new(x as f32, y as f32, z as f32)
    };
    Quat::from_mat3(&Mat3::from_cols(
        column((1, 0, 0)),
        column((0, 1, 0)),
        column((0, 0, 1)),
    ))
}

/// Returns the 24 cube rotations as quaternions, in [`ROTATIONS`] order.
pub fn cube_rotations() -> [Quat; 24] {
    ROTATIONS.map(rotation_to_quat)
}

/// Returns the cube rotation closest to `rotation`.
pub fn nearest_cube_rotation(rotation: Quat) -> Quat {
    let rotation = rotation.normalize();
    let mut best = Quat::IDENTITY;
    let mut best_alignment = f32::NEG_INFINITY;
    for candidate in cube_rotations() {
        // q and -q are the same rotation
        let alignment = candidate.dot(rotation).abs();
        if alignment > best_alignment {
            best = candidate;
            best_alignment = alignment;
        }
    }
    best
}

/// Returns whether `rotation` is within `tolerance` radians of a cube rotation.
pub fn is_cube_aligned(rotation: Quat, tolerance: f32) -> bool {
    rotation.angle_between(nearest_cube_rotation(rotation)) <= tolerance
}

/// Rounds a position to the nearest lattice point.
pub fn snap_to_lattice(position: Vec3, spacing: f32) -> Vec3 {
    (position / spacing).round() * spacing
}

/// Returns the lattice cell of a position.
pub fn lattice_coord(position: Vec3, spacing: f32) -> Coord {
    let cell = (position / spacing).round();
    (cell.x as i32, cell.y as i32, cell.z as i32)
}

/// Moves a local pose onto the nearest lattice point and cube rotation.
pub fn settle(local: Transform, spacing: f32) -> Transform {
    Transform {
        translation: snap_to_lattice(local.translation, spacing),
        rotation: nearest_cube_rotation(local.rotation),
    }
}
