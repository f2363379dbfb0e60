//! Snapping a released layer to the nearest quarter turn.

use std::time::Duration;

/// Quarter-turn targets, in the order ties are broken. 360 is reported as 0.
const TARGETS: [i32; 5] = [0, 360, 90, 180, 270];

/// Target and correction for a released layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapResult {
    /// Current angle rounded to whole degrees, in `[0, 360)`.
    pub current: i32,
    /// One of 0, 90, 180 or 270.
    pub target: i32,
    /// Signed shortest correction from `current` to `target`, in `(-180, 180]`.
    pub delta: i32,
    /// How long the correction should animate.
    pub duration: Duration,
}

/// Computes snap targets and correction durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapResolver {
    /// Duration of a 45 degree correction.
    base_duration: Duration,
}

impl SnapResolver {
    pub fn new(base_duration: Duration) -> Self {
        Self { base_duration }
    }

    /// Resolves an accumulated angle in degrees (any real value).
    pub fn resolve(&self, angle_degrees: f32) -> SnapResult {
        let current = reduce_degrees(angle_degrees);

        let mut best = TARGETS[0];
        let mut best_distance = i32::MAX;
        for target in TARGETS {
            let distance = (current - target).abs();
            // strict comparison keeps the earlier candidate on ties
            if distance < best_distance {
                best = target;
                best_distance = distance;
            }
        }

        let delta = best - current;
        SnapResult {
            current,
            target: best % 360,
            delta,
            duration: self.duration_for(delta),
        }
    }

    /// Correction time for `delta` degrees: linear in the remaining angle,
    /// equal to the base duration at 45 degrees. Saturates at
    /// [`Duration::MAX`] before the division.
    pub fn duration_for(&self, delta: i32) -> Duration {
        self.base_duration.saturating_mul(delta.unsigned_abs()) / 45
    }
}

/// Rounds an angle to whole degrees and wraps it into `[0, 360)`.
pub fn reduce_degrees(angle_degrees: f32) -> i32 {
    if !angle_degrees.is_finite() {
        return 0;
    }
    (angle_degrees.round() as i64).rem_euclid(360) as i32
}
