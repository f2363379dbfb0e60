//! Scene graph and spatial queries.
//!
//! The rotation engine only talks to the scene through the [`SceneGraph`] and
//! [`SpatialQuery`] traits. [`Scene`] is an arena implementation of both,
//! used by the viewer, the CLI simulation and the tests.

use std::ops::Mul;

use glam::{Quat, Vec3};

/// Handle to a node in a scene graph.
///
/// Handles are never reused, so a handle to a removed node stays invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Placeholder for pre-allocated buffers. Never refers to a live node.
    pub const DANGLING: Self = Self(u32::MAX);

    /// Returns the arena index of this node.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bitmask of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing only layer `index` (0-31).
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

/// Rigid transform: rotation followed by translation. No scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation,
        }
    }

    /// Returns the transform that undoes this one.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * point
    }
}

impl Mul for Transform {
    type Output = Transform;

    /// Composes two transforms; `parent * local` yields the world transform.
    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            translation: self.transform_point(rhs.translation),
            // renormalize so repeated composition does not drift
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

/// Axis-aligned (in node space) box collider attached to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub half_extents: Vec3,
    pub layers: LayerMask,
}

/// Errors from scene graph mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("no scene node {0:?}")]
    UnknownNode(NodeId),
    #[error("reparenting {node:?} under {parent:?} would create a cycle")]
    WouldCycle { node: NodeId, parent: NodeId },
    #[error("scene node {0:?} still has children")]
    HasChildren(NodeId),
}

/// Ownership operations on a transform hierarchy.
pub trait SceneGraph {
    /// Creates a node with the given local transform under `parent`.
    fn create_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Transform,
    ) -> Result<NodeId, SceneError>;

    /// Removes a childless node.
    fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError>;

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError>;

    /// Reassigns the owner of `node`, keeping its world pose.
    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError>;

    fn local_transform(&self, node: NodeId) -> Result<Transform, SceneError>;

    fn set_local_transform(&mut self, node: NodeId, local: Transform) -> Result<(), SceneError>;

    fn world_transform(&self, node: NodeId) -> Result<Transform, SceneError>;
}

/// Non-allocating bounded-volume query.
pub trait SpatialQuery {
    /// Writes the nodes whose colliders overlap the oriented box into
    /// `results`, up to its length, and returns how many were written.
    ///
    /// Only colliders on a layer in `mask` are considered. Entries of
    /// `results` past the returned count are left untouched.
    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: LayerMask,
        results: &mut [NodeId],
    ) -> usize;
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transform,
    collider: Option<Collider>,
}

/// Arena-backed scene graph with box colliders.
///
/// Nodes are visited in creation order, which makes spatial queries
/// deterministic for an unchanged layout.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(SceneError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(SceneError::UnknownNode(id))
    }

    /// Attaches (or replaces) the collider of a node.
    pub fn set_collider(&mut self, node: NodeId, collider: Collider) -> Result<(), SceneError> {
        self.node_mut(node)?.collider = Some(collider);
        Ok(())
    }

    pub fn name(&self, node: NodeId) -> Result<&str, SceneError> {
        Ok(&self.node(node)?.name)
    }

    pub fn children(&self, node: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.node(node)?.children)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_ok()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| Some((NodeId(i as u32), slot.as_ref()?)))
    }
}

impl SceneGraph for Scene {
    fn create_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Transform,
    ) -> Result<NodeId, SceneError> {
        let id = NodeId(self.nodes.len() as u32);
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.push(id);
        }
        self.nodes.push(Some(Node {
            name: name.to_owned(),
            parent,
            children: Vec::new(),
            local,
            collider: None,
        }));
        Ok(id)
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        let removed = self.node(node)?;
        if !removed.children.is_empty() {
            return Err(SceneError::HasChildren(node));
        }
        if let Some(parent) = removed.parent {
            self.node_mut(parent)?.children.retain(|&c| c != node);
        }
        self.nodes[node.index()] = None;
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(node)?.parent)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let world = self.world_transform(node)?;
        let parent_world = match parent {
            Some(p) => {
                // walk up from the new parent; meeting `node` means a cycle
                let mut cursor = Some(p);
                while let Some(ancestor) = cursor {
                    if ancestor == node {
                        return Err(SceneError::WouldCycle { node, parent: p });
                    }
                    cursor = self.node(ancestor)?.parent;
                }
                self.world_transform(p)?
            }
            None => Transform::IDENTITY,
        };

        let old_parent = self.node(node)?.parent;
        if let Some(old) = old_parent {
            self.node_mut(old)?.children.retain(|&c| c != node);
        }
        if let Some(p) = parent {
            self.node_mut(p)?.children.push(node);
        }
        let entry = self.node_mut(node)?;
        entry.parent = parent;
        entry.local = parent_world.inverse() * world;
        Ok(())
    }

    fn local_transform(&self, node: NodeId) -> Result<Transform, SceneError> {
        Ok(self.node(node)?.local)
    }

    fn set_local_transform(&mut self, node: NodeId, local: Transform) -> Result<(), SceneError> {
        self.node_mut(node)?.local = local;
        Ok(())
    }

    fn world_transform(&self, node: NodeId) -> Result<Transform, SceneError> {
        let entry = self.node(node)?;
        let mut world = entry.local;
        let mut cursor = entry.parent;
        while let Some(id) = cursor {
            let ancestor = self.node(id)?;
            world = ancestor.local * world;
            cursor = ancestor.parent;
        }
        Ok(world)
    }
}

impl SpatialQuery for Scene {
    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: LayerMask,
        results: &mut [NodeId],
    ) -> usize {
        let query = OrientedBox {
            center,
            half_extents,
            rotation,
        };
        let mut count = 0;
        for (id, node) in self.live_nodes() {
            if count == results.len() {
                break;
            }
            let Some(collider) = node.collider else {
                continue;
            };
            if !mask.intersects(collider.layers) {
                continue;
            }
            let Ok(world) = self.world_transform(id) else {
                continue;
            };
            let candidate = OrientedBox {
                center: world.translation,
                half_extents: collider.half_extents,
                rotation: world.rotation,
            };
            if query.overlaps(&candidate) {
                results[count] = id;
                count += 1;
            }
        }
        count
    }
}

struct OrientedBox {
    center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
}

impl OrientedBox {
    fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::Z,
        ]
    }

    /// Half the length of this box's projection onto `axis`.
    fn projected_radius(&self, axes: &[Vec3; 3], axis: Vec3) -> f32 {
        axes.iter()
            .zip(self.half_extents.to_array())
            .map(|(a, e)| e * a.dot(axis).abs())
            .sum()
    }

    /// Separating axis test. Touching boxes count as overlapping.
    fn overlaps(&self, other: &OrientedBox) -> bool {
        let a_axes = self.axes();
        let b_axes = other.axes();
        let offset = other.center - self.center;

        let mut candidates = [Vec3::ZERO; 15];
        candidates[..3].copy_from_slice(&a_axes);
        candidates[3..6].copy_from_slice(&b_axes);
        for (i, a) in a_axes.iter().enumerate() {
            for (j, b) in b_axes.iter().enumerate() {
                candidates[6 + i * 3 + j] = a.cross(*b);
            }
        }

        candidates
            .iter()
            // parallel edge pairs give degenerate axes; the face axes cover them
            .filter(|axis| axis.length_squared() > 1e-6)
            .all(|&axis| {
                let distance = offset.dot(axis).abs();
                distance
                    <= self.projected_radius(&a_axes, axis)
                        + other.projected_radius(&b_axes, axis)
                        + 1e-5
            })
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn test_set_parent_keeps_world_pose() {
        let mut scene = Scene::new();
        let root = scene
            .create_node("root", None, Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        let pivot = scene
            .create_node(
                "pivot",
                Some(root),
                Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2)),
            )
            .unwrap();
        let piece = scene
            .create_node("piece", Some(root), Transform::from_translation(Vec3::new(0.0, 0.0, 1.0)))
            .unwrap();

        let before = scene.world_transform(piece).unwrap();
        scene.set_parent(piece, Some(pivot)).unwrap();
        let after = scene.world_transform(piece).unwrap();

        assert_eq!(scene.parent(piece).unwrap(), Some(pivot));
        assert_eq!(scene.children(pivot).unwrap(), &[piece]);
        assert!(scene.children(root).unwrap().iter().all(|&c| c != piece));
        assert_vec_close(before.translation, after.translation);
        assert!(before.rotation.abs_diff_eq(after.rotation, 1e-5));
    }

    #[test]
    fn test_children_follow_parent_rotation() {
        let mut scene = Scene::new();
        let pivot = scene.create_node("pivot", None, Transform::IDENTITY).unwrap();
        let piece = scene
            .create_node("piece", Some(pivot), Transform::from_translation(Vec3::X))
            .unwrap();

        scene
            .set_local_transform(pivot, Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2)))
            .unwrap();

        // +X rotated a quarter turn about +Y lands on -Z
        assert_vec_close(scene.world_transform(piece).unwrap().translation, -Vec3::Z);
    }

    #[test]
    fn test_reparent_under_descendant_is_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", None, Transform::IDENTITY).unwrap();
        let b = scene.create_node("b", Some(a), Transform::IDENTITY).unwrap();

        assert_eq!(
            scene.set_parent(a, Some(b)),
            Err(SceneError::WouldCycle { node: a, parent: b })
        );
        assert_eq!(
            scene.set_parent(a, Some(a)),
            Err(SceneError::WouldCycle { node: a, parent: a })
        );
        assert_eq!(scene.parent(a).unwrap(), None);
    }

    #[test]
    fn test_remove_node() {
        let mut scene = Scene::new();
        let a = scene.create_node("a", None, Transform::IDENTITY).unwrap();
        let b = scene.create_node("b", Some(a), Transform::IDENTITY).unwrap();

        assert_eq!(scene.remove_node(a), Err(SceneError::HasChildren(a)));
        scene.remove_node(b).unwrap();
        assert!(!scene.contains(b));
        assert_eq!(scene.remove_node(b), Err(SceneError::UnknownNode(b)));
        assert!(scene.children(a).unwrap().is_empty());

        // handles are not reused
        let c = scene.create_node("c", None, Transform::IDENTITY).unwrap();
        assert_ne!(c, b);
        assert_eq!(scene.len(), 2);
    }

    fn scene_with_boxes(positions: &[(Vec3, LayerMask)]) -> (Scene, Vec<NodeId>) {
        let mut scene = Scene::new();
        let ids = positions
            .iter()
            .map(|&(position, layers)| {
                let id = scene
                    .create_node("box", None, Transform::from_translation(position))
                    .unwrap();
                scene
                    .set_collider(
                        id,
                        Collider {
                            half_extents: Vec3::splat(0.45),
                            layers,
                        },
                    )
                    .unwrap();
                id
            })
            .collect();
        (scene, ids)
    }

    #[test]
    fn test_overlap_box_filters_by_layer_and_distance() {
        let pieces = LayerMask::layer(3);
        let frame = LayerMask::layer(4);
        let (scene, ids) = scene_with_boxes(&[
            (Vec3::new(0.0, 0.0, 0.0), pieces),
            (Vec3::new(1.0, 0.0, 0.0), pieces),
            (Vec3::new(0.0, 1.0, 0.0), pieces),
            (Vec3::new(-1.0, 0.0, 0.0), frame),
        ]);

        let mut results = [NodeId::DANGLING; 9];
        let count = scene.overlap_box(
            Vec3::ZERO,
            Vec3::new(2.0, 0.25, 2.0),
            Quat::IDENTITY,
            pieces,
            &mut results,
        );

        assert_eq!(&results[..count], &[ids[0], ids[1]]);
        assert!(results[count..].iter().all(|&id| id == NodeId::DANGLING));
    }

    #[test]
    fn test_overlap_box_respects_capacity() {
        let layer = LayerMask::layer(0);
        let (scene, ids) = scene_with_boxes(&[
            (Vec3::new(0.0, 0.0, 0.0), layer),
            (Vec3::new(1.0, 0.0, 0.0), layer),
            (Vec3::new(2.0, 0.0, 0.0), layer),
        ]);

        let mut results = [NodeId::DANGLING; 2];
        let count =
            scene.overlap_box(Vec3::ZERO, Vec3::splat(5.0), Quat::IDENTITY, layer, &mut results);
        assert_eq!(count, 2);
        assert_eq!(results, [ids[0], ids[1]]);
    }

    #[test]
    fn test_rotated_query_box() {
        let layer = LayerMask::layer(0);
        let (scene, ids) = scene_with_boxes(&[
            (Vec3::new(1.0, 0.0, 0.0), layer),
            (Vec3::new(0.0, 0.0, 1.0), layer),
        ]);

        // a thin slab across x; after a quarter turn about y it spans z instead
        let half_extents = Vec3::new(2.0, 0.25, 0.1);
        let mut results = [NodeId::DANGLING; 4];

        let count =
            scene.overlap_box(Vec3::ZERO, half_extents, Quat::IDENTITY, layer, &mut results);
        assert_eq!(&results[..count], &[ids[0]]);

        let count = scene.overlap_box(
            Vec3::ZERO,
            half_extents,
            Quat::from_rotation_y(FRAC_PI_2),
            layer,
            &mut results,
        );
        assert_eq!(&results[..count], &[ids[1]]);
    }
}
