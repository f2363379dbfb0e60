//! Layer turning for a 3x3x3 twisty puzzle.
//!
//! A drag on a face picks the horizontal or vertical layer through it, the
//! layer follows the drag under a temporary pivot, and on release it snaps to
//! the nearest quarter turn before the pieces go back to the cube.
//!
//! The engine talks to its host only through the [`scene::SceneGraph`],
//! [`scene::SpatialQuery`] and [`tween::Animator`] traits. [`stage::Stage`]
//! implements all three for tests, benchmarks and the bundled viewer.

pub mod config;
pub mod controller;
pub mod cube;
pub mod diagnostics;
pub mod geometry;
pub mod grid;
pub mod locator;
pub mod scene;
pub mod session;
pub mod snap;
pub mod stage;
pub mod tween;

pub use config::{ConfigError, RotatorConfig};
pub use controller::{GestureRotationController, Orientation, PhaseKind};
pub use snap::{SnapResolver, SnapResult};
pub use stage::{Puzzle, Stage};
