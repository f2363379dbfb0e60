//! A complete host for the rotation engine.
//!
//! [`Stage`] owns the scene and the tween scheduler and implements every
//! collaborator trait the controller needs. [`Puzzle`] adds the assembled
//! cube and the controller, and routes finished tweens back each frame.

use std::time::Duration;

use glam::{Quat, Vec2, Vec3};
use smallvec::SmallVec;

use crate::config::RotatorConfig;
use crate::controller::{GestureRotationController, Orientation};
use crate::cube::Cube;
use crate::diagnostics::Diagnostics;
use crate::grid::Layout;
use crate::scene::{LayerMask, NodeId, Scene, SceneError, SceneGraph, SpatialQuery, Transform};
use crate::snap::SnapResult;
use crate::tween::{Animator, Easing, TweenId, TweenScheduler};

#[derive(Debug, Default)]
pub struct Stage {
    pub scene: Scene,
    pub tweens: TweenScheduler,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps all tweens. Returns the ones that finished.
    pub fn advance(&mut self, delta: Duration) -> SmallVec<[TweenId; 2]> {
        self.tweens.advance(&mut self.scene, delta)
    }
}

impl SceneGraph for Stage {
    fn create_node(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Transform,
    ) -> Result<NodeId, SceneError> {
        self.scene.create_node(name, parent, local)
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), SceneError> {
        self.scene.remove_node(node)
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, SceneError> {
        self.scene.parent(node)
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        self.scene.set_parent(node, parent)
    }

    fn local_transform(&self, node: NodeId) -> Result<Transform, SceneError> {
        self.scene.local_transform(node)
    }

    fn set_local_transform(&mut self, node: NodeId, local: Transform) -> Result<(), SceneError> {
        self.scene.set_local_transform(node, local)
    }

    fn world_transform(&self, node: NodeId) -> Result<Transform, SceneError> {
        self.scene.world_transform(node)
    }
}

impl SpatialQuery for Stage {
    fn overlap_box(
        &self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        mask: LayerMask,
        results: &mut [NodeId],
    ) -> usize {
        self.scene
            .overlap_box(center, half_extents, rotation, mask, results)
    }
}

impl Animator for Stage {
    fn animate(
        &mut self,
        node: NodeId,
        target: Quat,
        duration: Duration,
        easing: Easing,
    ) -> TweenId {
        self.tweens.animate(node, target, duration, easing)
    }

    fn cancel(&mut self, tween: TweenId) -> bool {
        self.tweens.cancel(tween)
    }
}

/// An assembled cube wired to its controller.
pub struct Puzzle {
    pub stage: Stage,
    pub cube: Cube,
    pub controller: GestureRotationController,
    /// Anchor used by the next drag.
    pub active_anchor: usize,
}

impl Puzzle {
    pub fn new(
        config: &RotatorConfig,
        diagnostics: Box<dyn Diagnostics>,
    ) -> Result<Self, SceneError> {
        let mut stage = Stage::new();
        let cube = Cube::assemble(&mut stage.scene, config, Transform::IDENTITY)?;
        let controller = GestureRotationController::new(config, cube.root(), diagnostics);
        Ok(Self {
            stage,
            cube,
            controller,
            active_anchor: 4,
        })
    }

    /// Starts a drag on the active anchor.
    pub fn drag_begin(&mut self, delta: Vec2) -> Option<Orientation> {
        let anchor = *self.cube.anchor(self.active_anchor)?;
        self.controller
            .on_drag_begin(&mut self.stage, &anchor, delta)
    }

    pub fn drag_update(&mut self, delta: Vec2) {
        self.controller.on_drag_update(&mut self.stage, delta);
    }

    pub fn drag_end(&mut self, delta: Vec2) -> Option<SnapResult> {
        self.controller.on_drag_end(&mut self.stage, delta)
    }

    /// Advances animations by one frame and delivers their completions.
    /// Returns how many sessions closed.
    pub fn tick(&mut self, delta: Duration) -> usize {
        let mut closed = 0;
        for tween in self.stage.advance(delta) {
            if self
                .controller
                .on_animation_complete(&mut self.stage, tween)
                .is_some()
            {
                closed += 1;
            }
        }
        closed
    }

    /// Runs frames of `delta` until the controller is idle, at most
    /// `max_frames`. Returns whether it became idle.
    pub fn settle(&mut self, delta: Duration, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            if self.controller.is_idle() {
                return true;
            }
            self.tick(delta);
        }
        self.controller.is_idle()
    }

    /// Drops any turn in progress without animating.
    pub fn cancel(&mut self) {
        self.controller.cancel(&mut self.stage);
    }

    pub fn layout(&self) -> Result<Layout, SceneError> {
        self.cube.layout(&self.stage)
    }

    pub fn is_intact(&self) -> Result<bool, SceneError> {
        self.cube.is_intact(&self.stage)
    }
}
