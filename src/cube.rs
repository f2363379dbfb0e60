//! Assembly of the 3x3x3 cube in a scene.
//!
//! The cube is a root node owning 27 pieces, each with a box collider on the
//! piece layer, plus a frame collider on the remaining layers that slice
//! queries must filter out. Nine face anchors sit at the front-face cells;
//! between them they reach every horizontal and vertical layer.

use glam::Vec3;

use crate::config::RotatorConfig;
use crate::geometry::{is_cube_aligned, lattice_coord};
use crate::grid::{self, Coord, Layout, DIM, GRID_SIZE};
use crate::scene::{Collider, LayerMask, NodeId, Scene, SceneError, SceneGraph, Transform};

/// Tolerance for a piece to count as resting on the lattice.
const SETTLE_TOLERANCE: f32 = 1e-3;

/// A single cubie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub node: NodeId,
    /// Cell the piece was assembled in.
    pub home: Coord,
}

/// Fixed reference point of a rotatable face, in cube-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceAnchor {
    pub index: usize,
    pub position: Vec3,
}

#[derive(Debug, Clone)]
pub struct Cube {
    root: NodeId,
    frame: NodeId,
    pieces: Vec<Piece>,
    anchors: Vec<FaceAnchor>,
    spacing: f32,
}

impl Cube {
    /// Builds the cube under a new root node placed at `origin`.
    pub fn assemble(
        scene: &mut Scene,
        config: &RotatorConfig,
        origin: Transform,
    ) -> Result<Self, SceneError> {
        let spacing = config.cube.spacing;
        let piece_mask = config.piece_mask();
        // lowest layer of the mask
        let piece_layer = LayerMask(piece_mask.0 & piece_mask.0.wrapping_neg());
        let frame_layers = LayerMask(!piece_mask.0);

        let root = scene.create_node("cube", None, origin)?;

        let frame = scene.create_node("frame", Some(root), Transform::IDENTITY)?;
        if frame_layers != LayerMask::NONE {
            scene.set_collider(
                frame,
                Collider {
                    half_extents: Vec3::splat(DIM as f32 * spacing / 2.0),
                    layers: frame_layers,
                },
            )?;
        }

        let mut pieces = Vec::with_capacity(GRID_SIZE);
        for cell_index in 0..GRID_SIZE {
            let home = grid::idx_to_coord(cell_index);
            let (x, y, z) = home;
            let position = Vec3::new(x as f32, y as f32, z as f32) * spacing;
            let node = scene.create_node(
                &format!("piece ({x}, {y}, {z})"),
                Some(root),
                Transform::from_translation(position),
            )?;
            scene.set_collider(
                node,
                Collider {
                    half_extents: Vec3::splat(config.cube.piece_size / 2.0),
                    layers: piece_layer,
                },
            )?;
            pieces.push(Piece { node, home });
        }

        // front face (z = -1), top-left to bottom-right
        let anchors = (0..DIM * DIM)
            .map(|index| {
                let x = (index % DIM) as f32 - 1.0;
                let y = 1.0 - (index / DIM) as f32;
                FaceAnchor {
                    index,
                    position: Vec3::new(x, y, -1.0) * spacing,
                }
            })
            .collect();

        log::debug!("assembled cube with {} pieces under {root:?}", pieces.len());

        Ok(Self {
            root,
            frame,
            pieces,
            anchors,
            spacing,
        })
    }

    /// Node that owns the pieces when no turn is in progress.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn frame(&self) -> NodeId {
        self.frame
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn anchors(&self) -> &[FaceAnchor] {
        &self.anchors
    }

    pub fn anchor(&self, index: usize) -> Option<&FaceAnchor> {
        self.anchors.get(index)
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Returns the assembly index of the piece owning `node`.
    pub fn piece_index(&self, node: NodeId) -> Option<usize> {
        self.pieces.iter().position(|piece| piece.node == node)
    }

    /// Pose of a piece relative to the cube root, whoever currently owns it.
    pub fn piece_pose(
        &self,
        graph: &impl SceneGraph,
        piece: &Piece,
    ) -> Result<Transform, SceneError> {
        let root_world = graph.world_transform(self.root)?;
        Ok(root_world.inverse() * graph.world_transform(piece.node)?)
    }

    /// Maps each lattice cell to the piece nearest to it.
    ///
    /// Pieces off the lattice are omitted; if two pieces round to the same
    /// cell the later one wins. Use [`Cube::is_intact`] to detect either.
    pub fn layout(&self, graph: &impl SceneGraph) -> Result<Layout, SceneError> {
        let mut layout: Layout = [None; GRID_SIZE];
        for (index, piece) in self.pieces.iter().enumerate() {
            let coord = lattice_coord(self.piece_pose(graph, piece)?.translation, self.spacing);
            if grid::in_bounds(coord) {
                layout[grid::coord_to_idx(coord)] = Some(index);
            }
        }
        Ok(layout)
    }

    /// Returns whether every piece rests on its own lattice cell with a
    /// cube-aligned rotation and is owned by the cube root.
    pub fn is_intact(&self, graph: &impl SceneGraph) -> Result<bool, SceneError> {
        let mut occupied = [false; GRID_SIZE];
        for piece in &self.pieces {
            if graph.parent(piece.node)? != Some(self.root) {
                return Ok(false);
            }
            let pose = self.piece_pose(graph, piece)?;
            let coord = lattice_coord(pose.translation, self.spacing);
            let (x, y, z) = coord;
            let lattice_point = Vec3::new(x as f32, y as f32, z as f32) * self.spacing;
            if !grid::in_bounds(coord)
                || !pose.translation.abs_diff_eq(lattice_point, SETTLE_TOLERANCE)
                || !is_cube_aligned(pose.rotation, SETTLE_TOLERANCE)
            {
                return Ok(false);
            }
            let cell = &mut occupied[grid::coord_to_idx(coord)];
            if *cell {
                return Ok(false);
            }
            *cell = true;
        }
        Ok(true)
    }
}
