//! Finding the pieces of the layer a drag should turn.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::config::RotatorConfig;
use crate::controller::Orientation;
use crate::grid::LAYER_SIZE;
use crate::scene::{LayerMask, NodeId, SpatialQuery};

/// Most pieces a single layer can hold.
pub const MAX_LAYER_PIECES: usize = LAYER_SIZE;

/// Pieces of one layer, in query order. Never heap-allocates for a full layer.
pub type Slice = SmallVec<[NodeId; MAX_LAYER_PIECES]>;

/// Selects layers with one thin box query per orientation.
///
/// The query box is thin along the rotation axis and spans a little more than
/// the cube across the other two, so a full layer is caught despite jitter
/// without reaching into the neighboring layers.
#[derive(Debug, Clone)]
pub struct SliceLocator {
    horizontal_half_extents: Vec3,
    vertical_half_extents: Vec3,
    mask: LayerMask,
    /// Reused on every call; only the prefix written by the latest query is
    /// ever read.
    buffer: [NodeId; MAX_LAYER_PIECES],
}

impl SliceLocator {
    pub fn new(config: &RotatorConfig) -> Self {
        Self {
            horizontal_half_extents: config.horizontal_half_extents(),
            vertical_half_extents: config.vertical_half_extents(),
            mask: config.piece_mask(),
            buffer: [NodeId::DANGLING; MAX_LAYER_PIECES],
        }
    }

    /// Returns the half-extents of the query box for an orientation.
    pub fn half_extents(&self, orientation: Orientation) -> Vec3 {
        match orientation {
            Orientation::Horizontal => self.horizontal_half_extents,
            Orientation::Vertical => self.vertical_half_extents,
        }
    }

    /// Returns the pieces in the layer through `anchor` (world space) for
    /// `orientation`. `rotation` is the cube's world rotation, which the query
    /// box follows.
    ///
    /// Fewer than a full layer is returned as-is; that only happens when the
    /// query extents do not match the cube.
    pub fn locate(
        &mut self,
        query: &impl SpatialQuery,
        anchor: Vec3,
        rotation: Quat,
        orientation: Orientation,
    ) -> Slice {
        let half_extents = self.half_extents(orientation);
        let count = query.overlap_box(anchor, half_extents, rotation, self.mask, &mut self.buffer);

        let mut slice = Slice::new();
        for &node in &self.buffer[..count.min(MAX_LAYER_PIECES)] {
            if !slice.contains(&node) {
                slice.push(node);
            }
        }
        log::trace!("{orientation:?} query at {anchor} found {} pieces", slice.len());
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Cube;
    use crate::geometry::lattice_coord;
    use crate::scene::{Scene, SceneGraph, Transform};

    fn assembled() -> (Scene, Cube, SliceLocator) {
        let config = RotatorConfig::default();
        let mut scene = Scene::new();
        let cube = Cube::assemble(&mut scene, &config, Transform::IDENTITY).unwrap();
        (scene, cube, SliceLocator::new(&config))
    }

    #[test]
    fn test_every_anchor_finds_a_full_layer() {
        let (scene, cube, mut locator) = assembled();

        for anchor in cube.anchors() {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                let slice = locator.locate(&scene, anchor.position, Quat::IDENTITY, orientation);
                assert_eq!(slice.len(), 9, "anchor {} {orientation:?}", anchor.index);

                let mut sorted = slice.to_vec();
                sorted.sort();
                sorted.dedup();
                assert_eq!(sorted.len(), 9, "duplicate pieces in {slice:?}");

                for &node in &slice {
                    let position = scene.world_transform(node).unwrap().translation;
                    let (x, y, _) = lattice_coord(position, cube.spacing());
                    match orientation {
                        Orientation::Horizontal => assert_eq!(y as f32, anchor.position.y),
                        Orientation::Vertical => assert_eq!(x as f32, anchor.position.x),
                    }
                    assert!(cube.piece_index(node).is_some(), "non-piece {node:?} returned");
                }
            }
        }
    }

    #[test]
    fn test_full_layers_for_accepted_spacings() {
        let cases = [
            "horizontal_half_extents = [3.6, 1.5, 3.6]\n\
             vertical_half_extents = [1.5, 3.6, 3.6]\n\
             [cube]\nspacing = 2.0",
            "horizontal_half_extents = [0.8, 0.2, 0.8]\n\
             vertical_half_extents = [0.2, 0.8, 0.8]\n\
             [cube]\nspacing = 0.5\npiece_size = 0.5",
            "horizontal_half_extents = [6.0, 0.1, 6.0]\n\
             vertical_half_extents = [0.1, 6.0, 6.0]\n\
             [cube]\nspacing = 3.0\npiece_size = 1.0",
        ];
        for text in cases {
            let config = RotatorConfig::from_toml_str(text).unwrap();
            let mut scene = Scene::new();
            let cube = Cube::assemble(&mut scene, &config, Transform::IDENTITY).unwrap();
            let mut locator = SliceLocator::new(&config);

            for anchor in cube.anchors() {
                for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                    let slice =
                        locator.locate(&scene, anchor.position, Quat::IDENTITY, orientation);
                    assert_eq!(
                        slice.len(),
                        9,
                        "spacing {} anchor {} {orientation:?}",
                        config.cube.spacing,
                        anchor.index
                    );
                    for &node in &slice {
                        let position = scene.world_transform(node).unwrap().translation;
                        let in_layer = match orientation {
                            Orientation::Horizontal => (position.y - anchor.position.y).abs() < 1e-4,
                            Orientation::Vertical => (position.x - anchor.position.x).abs() < 1e-4,
                        };
                        assert!(in_layer, "{node:?} at {position} outside the layer");
                    }
                }
            }
        }
    }

    #[test]
    fn test_locate_is_deterministic() {
        let (scene, cube, mut locator) = assembled();
        let anchor = cube.anchor(4).unwrap().position;

        let first = locator.locate(&scene, anchor, Quat::IDENTITY, Orientation::Horizontal);
        let second = locator.locate(&scene, anchor, Quat::IDENTITY, Orientation::Horizontal);
        assert_eq!(first, second);
    }

    #[test]
    fn test_frame_collider_is_filtered_out() {
        let (scene, cube, mut locator) = assembled();
        let anchor = cube.anchor(0).unwrap().position;

        let slice = locator.locate(&scene, anchor, Quat::IDENTITY, Orientation::Vertical);
        assert!(!slice.contains(&cube.frame()));
    }

    /// Query that returns a fixed set of nodes, for exercising buffer reuse.
    struct Scripted(Vec<NodeId>);

    impl SpatialQuery for Scripted {
        fn overlap_box(
            &self,
            _center: Vec3,
            _half_extents: Vec3,
            _rotation: Quat,
            _mask: LayerMask,
            results: &mut [NodeId],
        ) -> usize {
            let count = self.0.len().min(results.len());
            results[..count].copy_from_slice(&self.0[..count]);
            count
        }
    }

    #[test]
    fn test_stale_buffer_entries_are_ignored() {
        let (scene, cube, mut locator) = assembled();
        let anchor = cube.anchor(0).unwrap().position;

        let full = locator.locate(&scene, anchor, Quat::IDENTITY, Orientation::Horizontal);
        assert_eq!(full.len(), 9);

        let smaller = Scripted(full[..2].to_vec());
        let slice = locator.locate(&smaller, anchor, Quat::IDENTITY, Orientation::Horizontal);
        assert_eq!(slice.as_slice(), &full[..2]);
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let (_, cube, mut locator) = assembled();
        let a = cube.pieces()[0].node;
        let b = cube.pieces()[1].node;

        let query = Scripted(vec![a, b, a, b, a]);
        let slice = locator.locate(&query, Vec3::ZERO, Quat::IDENTITY, Orientation::Vertical);
        assert_eq!(slice.as_slice(), &[a, b]);
    }
}
