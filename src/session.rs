//! A layer detached from the cube while it is being turned.
//!
//! Opening a session moves every piece of the slice under a fresh pivot node;
//! rotating the pivot turns the layer rigidly. Closing consumes the session,
//! hands each piece back to the exact owner it had before and removes the
//! pivot, so a session can only be closed once.

use glam::{Quat, Vec3};
use smallvec::SmallVec;

use crate::controller::Orientation;
use crate::locator::{Slice, MAX_LAYER_PIECES};
use crate::scene::{NodeId, SceneError, SceneGraph, Transform};

#[derive(Debug)]
#[must_use = "a session must be closed to give its pieces back"]
pub struct RotationSession {
    pieces: Slice,
    /// Owner of each piece before the session, parallel to `pieces`.
    owners: SmallVec<[Option<NodeId>; MAX_LAYER_PIECES]>,
    axis: Vec3,
    orientation: Orientation,
    pivot: NodeId,
}

impl RotationSession {
    /// Creates a pivot under `origin` and moves the slice onto it, keeping
    /// every piece's world pose.
    ///
    /// On failure nothing is left changed: moved pieces are returned and the
    /// pivot is removed.
    pub fn open(
        graph: &mut impl SceneGraph,
        origin: NodeId,
        pieces: Slice,
        orientation: Orientation,
    ) -> Result<Self, SceneError> {
        let pivot = graph.create_node("rotation pivot", Some(origin), Transform::IDENTITY)?;

        let mut owners = SmallVec::new();
        for &piece in &pieces {
            match adopt(graph, piece, pivot) {
                Ok(owner) => owners.push(owner),
                Err(e) => {
                    for (&moved, &owner) in pieces.iter().zip(&owners) {
                        if let Err(e) = graph.set_parent(moved, owner) {
                            log::warn!("error returning {moved:?} after failed open: {e}");
                        }
                    }
                    if let Err(e) = graph.remove_node(pivot) {
                        log::warn!("error removing pivot after failed open: {e}");
                    }
                    return Err(e);
                }
            }
        }

        log::debug!(
            "opened {orientation:?} session with {} pieces on {pivot:?}",
            pieces.len()
        );
        Ok(Self {
            pieces,
            owners,
            axis: orientation.axis(),
            orientation,
            pivot,
        })
    }

    pub fn pieces(&self) -> &[NodeId] {
        &self.pieces
    }

    /// Unit rotation axis, in the space of the pivot's parent.
    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn pivot(&self) -> NodeId {
        self.pivot
    }

    /// Returns the owner `piece` had before the session.
    pub fn original_owner(&self, piece: NodeId) -> Option<Option<NodeId>> {
        let i = self.pieces.iter().position(|&p| p == piece)?;
        Some(self.owners[i])
    }

    /// Turns the layer further by `degrees` about the axis.
    pub fn rotate_by(&self, graph: &mut impl SceneGraph, degrees: f32) -> Result<(), SceneError> {
        let mut local = graph.local_transform(self.pivot)?;
        local.rotation =
            (Quat::from_axis_angle(self.axis, degrees.to_radians()) * local.rotation).normalize();
        graph.set_local_transform(self.pivot, local)
    }

    /// Angle the layer has turned about the axis, in degrees, read back from
    /// the pivot's rotation. The result lies in `(-360, 360]`.
    pub fn accumulated_degrees(&self, graph: &impl SceneGraph) -> Result<f32, SceneError> {
        let rotation = graph.local_transform(self.pivot)?.rotation;
        let half_angle = rotation.xyz().dot(self.axis).atan2(rotation.w);
        Ok((2.0 * half_angle).to_degrees())
    }

    /// Rotation of the pivot for a layer turned `degrees` about the axis.
    pub fn rotation_at(&self, degrees: i32) -> Quat {
        Quat::from_axis_angle(self.axis, (degrees as f32).to_radians())
    }

    /// Sets the pivot to exactly `degrees` about the axis.
    pub fn set_angle(&self, graph: &mut impl SceneGraph, degrees: i32) -> Result<(), SceneError> {
        let mut local = graph.local_transform(self.pivot)?;
        local.rotation = self.rotation_at(degrees);
        graph.set_local_transform(self.pivot, local)
    }

    /// Gives every piece back to its original owner and removes the pivot.
    ///
    /// Keeps going past individual failures so that as many pieces as
    /// possible are returned. Returns the pieces of the slice.
    pub fn close(self, graph: &mut impl SceneGraph) -> Slice {
        for (&piece, &owner) in self.pieces.iter().zip(&self.owners) {
            if let Err(e) = graph.set_parent(piece, owner) {
                log::warn!("error returning {piece:?} to {owner:?}: {e}");
            }
        }
        if let Err(e) = graph.remove_node(self.pivot) {
            log::warn!("error removing pivot {:?}: {e}", self.pivot);
        }
        log::debug!("closed session with {} pieces", self.pieces.len());
        self.pieces
    }
}

/// Moves `piece` under `pivot` and returns its previous owner.
fn adopt(
    graph: &mut impl SceneGraph,
    piece: NodeId,
    pivot: NodeId,
) -> Result<Option<NodeId>, SceneError> {
    let owner = graph.parent(piece)?;
    graph.set_parent(piece, Some(pivot))?;
    Ok(owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RotatorConfig;
    use crate::cube::Cube;
    use crate::locator::SliceLocator;
    use crate::scene::Scene;

    fn open_top_layer() -> (Scene, Cube, RotationSession) {
        let config = RotatorConfig::default();
        let mut scene = Scene::new();
        let cube = Cube::assemble(&mut scene, &config, Transform::IDENTITY).unwrap();
        let slice = SliceLocator::new(&config).locate(
            &scene,
            cube.anchor(0).unwrap().position,
            Quat::IDENTITY,
            Orientation::Horizontal,
        );
        let session =
            RotationSession::open(&mut scene, cube.root(), slice, Orientation::Horizontal)
                .unwrap();
        (scene, cube, session)
    }

    #[test]
    fn test_open_moves_pieces_under_pivot() {
        let (scene, cube, session) = open_top_layer();

        assert_eq!(session.pieces().len(), 9);
        assert_eq!(session.axis(), Vec3::Y);
        assert_eq!(scene.parent(session.pivot()).unwrap(), Some(cube.root()));
        for &piece in session.pieces() {
            assert_eq!(scene.parent(piece).unwrap(), Some(session.pivot()));
            assert_eq!(session.original_owner(piece), Some(Some(cube.root())));
        }
        // world poses are untouched by the handover
        assert!(cube.layout(&scene).unwrap().iter().all(Option::is_some));
    }

    #[test]
    fn test_accumulated_angle_follows_rotation() {
        let (mut scene, _cube, session) = open_top_layer();

        for _ in 0..30 {
            session.rotate_by(&mut scene, 1.5).unwrap();
        }
        assert!((session.accumulated_degrees(&scene).unwrap() - 45.0).abs() < 1e-3);

        session.rotate_by(&mut scene, -100.0).unwrap();
        assert!((session.accumulated_degrees(&scene).unwrap() + 55.0).abs() < 1e-3);

        session.set_angle(&mut scene, 270).unwrap();
        let angle = session.accumulated_degrees(&scene).unwrap();
        assert_eq!(crate::snap::reduce_degrees(angle), 270);
    }

    #[test]
    fn test_close_restores_owners_and_removes_pivot() {
        let (mut scene, cube, session) = open_top_layer();
        let pivot = session.pivot();
        session.set_angle(&mut scene, 90).unwrap();

        let pieces = session.close(&mut scene);

        assert_eq!(pieces.len(), 9);
        assert!(!scene.contains(pivot));
        for piece in cube.pieces() {
            assert_eq!(scene.parent(piece.node).unwrap(), Some(cube.root()));
        }
        assert!(cube.is_intact(&scene).unwrap());
    }

    #[test]
    fn test_failed_open_leaves_scene_unchanged() {
        let config = RotatorConfig::default();
        let mut scene = Scene::new();
        let cube = Cube::assemble(&mut scene, &config, Transform::IDENTITY).unwrap();
        let nodes_before = scene.len();

        let mut slice: Slice = cube.pieces()[..3].iter().map(|p| p.node).collect();
        // the cube root cannot go under a pivot that is its own descendant
        slice.push(cube.root());

        let result = RotationSession::open(&mut scene, cube.root(), slice, Orientation::Vertical);
        assert!(matches!(result, Err(SceneError::WouldCycle { .. })));
        assert_eq!(scene.len(), nodes_before);
        assert!(cube.is_intact(&scene).unwrap());
    }
}
