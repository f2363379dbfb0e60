//! Turning layers with drag gestures.
//!
//! The host calls the drag methods once per input frame and forwards finished
//! tweens to [`GestureRotationController::on_animation_complete`]. The
//! controller owns no loop; everything runs on the host's frame.
//!
//! ```text
//! Idle --drag-begin (classified)--> Rotating --drag-end--> Snapping --tween done--> Idle
//!                                   ^      |
//!                                   +------+ drag-update
//! ```

use glam::{Vec2, Vec3};

use crate::config::RotatorConfig;
use crate::cube::FaceAnchor;
use crate::diagnostics::{DiagnosticEvent, Diagnostics, IgnoreReason};
use crate::geometry;
use crate::locator::{Slice, SliceLocator, MAX_LAYER_PIECES};
use crate::scene::{NodeId, SceneError, SceneGraph, SpatialQuery};
use crate::session::RotationSession;
use crate::snap::{SnapResolver, SnapResult};
use crate::tween::{Animator, Easing, TweenId};

/// Everything the controller needs from its host.
pub trait PuzzleHost: SceneGraph + SpatialQuery + Animator {}

impl<T: SceneGraph + SpatialQuery + Animator> PuzzleHost for T {}

/// Which way a layer turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Turns about the cube's up axis; driven by horizontal drags.
    Horizontal,
    /// Turns about the cube's right axis; driven by vertical drags.
    Vertical,
}

impl Orientation {
    /// Classifies the delta of a drag's first frame.
    ///
    /// Zero and perfectly diagonal deltas have no orientation.
    pub fn classify(delta: Vec2) -> Option<Self> {
        if delta.length_squared() == 0.0 {
            return None;
        }
        let (x, y) = (delta.x.abs(), delta.y.abs());
        if x > y {
            Some(Self::Horizontal)
        } else if y > x {
            Some(Self::Vertical)
        } else {
            None
        }
    }

    /// Rotation axis in cube space.
    pub fn axis(self) -> Vec3 {
        match self {
            Self::Horizontal => Vec3::Y,
            Self::Vertical => Vec3::X,
        }
    }

    /// Direction of the per-frame step for a drag delta.
    pub fn step_sign(self, delta: Vec2) -> f32 {
        let positive = match self {
            Self::Horizontal => delta.x < 0.0,
            Self::Vertical => delta.y > 0.0,
        };
        if positive {
            1.0
        } else {
            -1.0
        }
    }
}

/// Externally visible state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Rotating,
    Snapping,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Rotating(RotationSession),
    Snapping {
        session: RotationSession,
        snap: SnapResult,
        tween: TweenId,
    },
}

/// Drives at most one [`RotationSession`] from drag gestures.
pub struct GestureRotationController {
    /// Node the pivot is created under; the cube root.
    origin: NodeId,
    locator: SliceLocator,
    resolver: SnapResolver,
    step_degrees: f32,
    easing: Easing,
    spacing: f32,
    phase: Phase,
    diagnostics: Box<dyn Diagnostics>,
}

impl GestureRotationController {
    pub fn new(config: &RotatorConfig, origin: NodeId, diagnostics: Box<dyn Diagnostics>) -> Self {
        Self {
            origin,
            locator: SliceLocator::new(config),
            resolver: SnapResolver::new(config.snap_base_duration()),
            step_degrees: config.rotation_step_degrees,
            easing: config.easing,
            spacing: config.cube.spacing,
            phase: Phase::Idle,
            diagnostics,
        }
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Rotating(_) => PhaseKind::Rotating,
            Phase::Snapping { .. } => PhaseKind::Snapping,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// The open session, while rotating or snapping.
    pub fn session(&self) -> Option<&RotationSession> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Rotating(session) | Phase::Snapping { session, .. } => Some(session),
        }
    }

    /// Tween the controller is waiting on, while snapping.
    pub fn pending_tween(&self) -> Option<TweenId> {
        match self.phase {
            Phase::Snapping { tween, .. } => Some(tween),
            _ => None,
        }
    }

    fn ignore(&mut self, reason: IgnoreReason, delta: Vec2) {
        self.diagnostics
            .record(DiagnosticEvent::Ignored { reason, delta });
    }

    fn scene_failure(&mut self, error: SceneError, delta: Vec2) {
        log::warn!("scene rejected layer turn: {error}");
        self.ignore(IgnoreReason::SceneFailure, delta);
    }

    /// Opens a session for the layer through `anchor` if the delta of the
    /// drag's first frame classifies. Returns the orientation of the opened
    /// session.
    ///
    /// An unclassified delta drops the whole gesture: later frames of the same
    /// drag arrive as updates and do not retry. A drag-begin while a session
    /// is still rotating or snapping is rejected.
    pub fn on_drag_begin(
        &mut self,
        host: &mut impl PuzzleHost,
        anchor: &FaceAnchor,
        delta: Vec2,
    ) -> Option<Orientation> {
        if !self.is_idle() {
            self.ignore(IgnoreReason::Busy, delta);
            return None;
        }
        let Some(orientation) = Orientation::classify(delta) else {
            self.ignore(IgnoreReason::Unclassified, delta);
            return None;
        };

        let cube_world = match host.world_transform(self.origin) {
            Ok(transform) => transform,
            Err(e) => {
                self.scene_failure(e, delta);
                return None;
            }
        };
        let slice = self.locator.locate(
            &*host,
            cube_world.transform_point(anchor.position),
            cube_world.rotation,
            orientation,
        );
        if slice.len() < MAX_LAYER_PIECES {
            log::warn!(
                "layer through anchor {} has {} of {MAX_LAYER_PIECES} pieces",
                anchor.index,
                slice.len(),
            );
        }

        let pieces = slice.len();
        match RotationSession::open(host, self.origin, slice, orientation) {
            Ok(session) => {
                self.diagnostics
                    .record(DiagnosticEvent::SessionOpened { orientation, pieces });
                self.phase = Phase::Rotating(session);
                Some(orientation)
            }
            Err(e) => {
                self.scene_failure(e, delta);
                None
            }
        }
    }

    /// Turns the layer one fixed step in the direction of `delta`.
    ///
    /// The step does not scale with the delta's size, so the layer turns at a
    /// constant rate per frame however fast the pointer moves.
    pub fn on_drag_update(&mut self, host: &mut impl PuzzleHost, delta: Vec2) {
        let Phase::Rotating(session) = &self.phase else {
            let reason = if self.is_idle() {
                IgnoreReason::NoSession
            } else {
                IgnoreReason::Busy
            };
            return self.ignore(reason, delta);
        };
        let step_degrees = session.orientation().step_sign(delta) * self.step_degrees;
        if let Err(e) = session.rotate_by(host, step_degrees) {
            return self.scene_failure(e, delta);
        }
        self.diagnostics
            .record(DiagnosticEvent::Rotated { step_degrees });
    }

    /// Starts animating the layer to the nearest quarter turn. The session
    /// stays open until the animation completes.
    ///
    /// Ignored unless a session is rotating, so repeated drag-ends are
    /// harmless.
    pub fn on_drag_end(&mut self, host: &mut impl PuzzleHost, delta: Vec2) -> Option<SnapResult> {
        let session = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Rotating(session) => session,
            other => {
                let reason = match other {
                    Phase::Idle => IgnoreReason::NoSession,
                    _ => IgnoreReason::Busy,
                };
                self.phase = other;
                self.ignore(reason, delta);
                return None;
            }
        };

        let angle = match session.accumulated_degrees(&*host) {
            Ok(angle) => angle,
            Err(e) => {
                self.scene_failure(e, delta);
                self.finish(host, session, None, true);
                return None;
            }
        };
        let snap = self.resolver.resolve(angle);
        let tween = host.animate(
            session.pivot(),
            session.rotation_at(snap.target),
            snap.duration,
            self.easing,
        );
        self.diagnostics
            .record(DiagnosticEvent::SnapStarted { snap, tween });
        self.phase = Phase::Snapping {
            session,
            snap,
            tween,
        };
        Some(snap)
    }

    /// Completes the session once its snap animation has finished. Returns the
    /// pieces that were handed back.
    ///
    /// Completions of any other tween, or arriving after the session already
    /// ended, are ignored.
    pub fn on_animation_complete(
        &mut self,
        host: &mut impl PuzzleHost,
        tween: TweenId,
    ) -> Option<Slice> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Snapping {
                session,
                snap,
                tween: expected,
            } if expected == tween => Some(self.finish(host, session, Some(snap.target), false)),
            other => {
                self.phase = other;
                self.diagnostics
                    .record(DiagnosticEvent::CompletionIgnored { tween });
                None
            }
        }
    }

    /// Ends any session immediately: the layer jumps to its snap target and
    /// the pieces go back to their owners without animating. For host
    /// teardown mid-gesture.
    pub fn cancel(&mut self, host: &mut impl PuzzleHost) -> Option<Slice> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => None,
            Phase::Rotating(session) => {
                let target = session
                    .accumulated_degrees(&*host)
                    .ok()
                    .map(|angle| self.resolver.resolve(angle).target);
                Some(self.finish(host, session, target, true))
            }
            Phase::Snapping {
                session,
                snap,
                tween,
            } => {
                host.cancel(tween);
                Some(self.finish(host, session, Some(snap.target), true))
            }
        }
    }

    /// Puts the pivot exactly on `target`, closes the session and settles the
    /// returned pieces onto the lattice of their owner.
    fn finish(
        &mut self,
        host: &mut impl PuzzleHost,
        session: RotationSession,
        target: Option<i32>,
        cancelled: bool,
    ) -> Slice {
        if let Some(target) = target {
            if let Err(e) = session.set_angle(host, target) {
                log::warn!("error placing pivot at {target} degrees: {e}");
            }
        }
        let pieces = session.close(host);
        for &piece in &pieces {
            let settled = host.local_transform(piece).and_then(|local| {
                host.set_local_transform(piece, geometry::settle(local, self.spacing))
            });
            if let Err(e) = settled {
                log::warn!("error settling {piece:?}: {e}");
            }
        }
        self.diagnostics.record(DiagnosticEvent::SessionClosed {
            pieces: pieces.len(),
            cancelled,
        });
        pieces
    }
}
