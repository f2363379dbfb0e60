//! Diagnostics collaborator injected into the controller.

use glam::Vec2;

use crate::controller::Orientation;
use crate::snap::SnapResult;
use crate::tween::TweenId;

/// Why a gesture event had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Zero or perfectly diagonal delta on drag-begin.
    Unclassified,
    /// A session is still rotating or snapping.
    Busy,
    /// Drag-update or drag-end without an active session.
    NoSession,
    /// The scene rejected an operation.
    SceneFailure,
}

/// Something noteworthy the controller did.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    Ignored { reason: IgnoreReason, delta: Vec2 },
    SessionOpened { orientation: Orientation, pieces: usize },
    Rotated { step_degrees: f32 },
    SnapStarted { snap: SnapResult, tween: TweenId },
    SessionClosed { pieces: usize, cancelled: bool },
    CompletionIgnored { tween: TweenId },
}

pub trait Diagnostics {
    fn record(&mut self, event: DiagnosticEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn record(&mut self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::Rotated { .. } => log::trace!("{event:?}"),
            DiagnosticEvent::Ignored {
                reason: IgnoreReason::SceneFailure,
                ..
            } => log::warn!("{event:?}"),
            _ => log::debug!("{event:?}"),
        }
    }
}

/// Keeps every event, for tests and tooling.
#[derive(Debug, Default, Clone)]
pub struct RecordingDiagnostics {
    pub events: Vec<DiagnosticEvent>,
}

impl Diagnostics for RecordingDiagnostics {
    fn record(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }
}

/// Shares one recorder between a controller and the code inspecting it.
impl Diagnostics for std::rc::Rc<std::cell::RefCell<RecordingDiagnostics>> {
    fn record(&mut self, event: DiagnosticEvent) {
        self.borrow_mut().record(event);
    }
}
