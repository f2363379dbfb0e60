//! Frame-driven rotation tweens.
//!
//! The controller asks an [`Animator`] to rotate a node to a target; the host
//! advances a [`TweenScheduler`] once per frame and forwards every finished
//! [`TweenId`] back to the controller. Each tween is reported as finished
//! exactly once.

use std::f32::consts::PI;
use std::time::Duration;

use glam::Quat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::scene::{NodeId, SceneGraph};

/// Function that maps progress in `[0, 1]` to eased progress, with
/// `f(0) = 0` and `f(1) = 1`.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    #[default]
    Cosine,
    Cubic,
    Circular,
    Overshoot,
    CriticallyDamped,
}

impl Easing {
    pub fn interpolate(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,

            Self::Cosine => (1.0 - (t * PI).cos()) / 2.0,

            Self::Cubic => (3.0 - 2.0 * t) * t * t,

            Self::Circular => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) * 0.5
                } else {
                    (1.0 + (1.0 - (-2.0 * t + 2.0).powi(2)).sqrt()) * 0.5
                }
            }

            Self::Overshoot => {
                // https://easings.net/#easeOutBack
                let c1 = 1.70158;
                let c3 = c1 + 1.0;
                1.0 + c3 * (t - 1.0).powi(3) + c1 * (t - 1.0).powi(2)
            }

            Self::CriticallyDamped => {
                if t >= 1.0 {
                    1.0
                } else {
                    (-5.0 * t - 1.0) * (-8.0 * t).exp() + 1.0
                }
            }
        }
    }
}

/// Handle to a scheduled tween.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TweenId(u64);

/// Schedules rotation animations of scene nodes.
pub trait Animator {
    /// Starts rotating `node`'s local rotation towards `target` over
    /// `duration`. The current rotation is sampled when the tween first
    /// advances.
    fn animate(&mut self, node: NodeId, target: Quat, duration: Duration, easing: Easing)
        -> TweenId;

    /// Stops a tween without reporting it as finished. Returns whether the
    /// tween was still running.
    fn cancel(&mut self, tween: TweenId) -> bool;
}

#[derive(Debug, Clone)]
struct Tween {
    node: NodeId,
    start: Option<Quat>,
    target: Quat,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

/// Tween scheduler advanced by the host once per frame.
#[derive(Debug, Default)]
pub struct TweenScheduler {
    next_id: u64,
    tweens: FxHashMap<TweenId, Tween>,
}

impl TweenScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tweens still running.
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn is_running(&self, tween: TweenId) -> bool {
        self.tweens.contains_key(&tween)
    }

    /// Steps every tween forward by `delta` and writes the eased rotation to
    /// its node. Returns the tweens that finished this step, in the order they
    /// were scheduled.
    ///
    /// A finished tween leaves its node at exactly the target rotation. Tweens
    /// whose node has disappeared are dropped and reported as finished.
    pub fn advance(
        &mut self,
        scene: &mut impl SceneGraph,
        delta: Duration,
    ) -> SmallVec<[TweenId; 2]> {
        let mut finished: SmallVec<[TweenId; 2]> = SmallVec::new();

        for (&id, tween) in &mut self.tweens {
            let Ok(mut local) = scene.local_transform(tween.node) else {
                log::warn!("tween {id:?} lost its node {:?}", tween.node);
                finished.push(id);
                continue;
            };
            let start = *tween.start.get_or_insert(local.rotation);

            tween.elapsed += delta;
            let done = tween.elapsed >= tween.duration;
            local.rotation = if done {
                tween.target
            } else {
                let t = tween.elapsed.as_secs_f32() / tween.duration.as_secs_f32();
                start.slerp(tween.target, tween.easing.interpolate(t))
            };
            if scene.set_local_transform(tween.node, local).is_err() {
                finished.push(id);
                continue;
            }
            if done {
                finished.push(id);
            }
        }

        finished.sort_unstable();
        for id in &finished {
            self.tweens.remove(id);
        }
        finished
    }
}

impl Animator for TweenScheduler {
    fn animate(
        &mut self,
        node: NodeId,
        target: Quat,
        duration: Duration,
        easing: Easing,
    ) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.insert(
            id,
            Tween {
                node,
                start: None,
                target,
                duration,
                elapsed: Duration::ZERO,
                easing,
            },
        );
        log::trace!("scheduled tween {id:?} on {node:?} over {duration:?}");
        id
    }

    fn cancel(&mut self, tween: TweenId) -> bool {
        self.tweens.remove(&tween).is_some()
    }
}
