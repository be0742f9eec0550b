// src/watch/mod.rs
// Save detection for the scratch file.
//
// Many editors replace the file's inode on save (write-new then rename),
// and a single logical save can surface as a burst of low-level events.
// The detector is a small state machine fed by a closed event set; the
// session loop owns the timers and the change source, so the transitions
// here stay synchronous and testable without a runtime.

mod source;

pub use source::{ChangeSource, ChangeSourceKind};

use std::time::Duration;

use tracing::trace;

/// Timer configuration shared by the detector driver and change sources.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Startup grace: editor-open touches within this window are not saves.
    pub arming_delay: Duration,
    /// Quiet window that coalesces a write burst into one save.
    pub debounce: Duration,
    /// Sampling interval for the polling fallback.
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            arming_delay: Duration::from_millis(300),
            debounce: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Startup grace period; change events are swallowed.
    Arming,
    /// Waiting for the first qualifying change.
    Watching,
    /// A change arrived; waiting for the burst to quiet down.
    Debouncing,
    /// A stable save was reported. Further changes re-arm the debounce.
    Done,
}

/// The closed set of inputs. Timers and filesystem events are reduced to
/// these before they reach the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorEvent {
    ArmingElapsed,
    FileChanged,
    DebounceElapsed,
    /// Process exit: unconditional, idempotent shutdown.
    Stop,
}

/// What the driver must do in response to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorAction {
    /// (Re)arm the debounce timer from zero.
    StartDebounce,
    /// A stable save was observed; read the file and emit a response.
    EmitSave,
}

#[derive(Debug)]
pub struct Detector {
    state: DetectorState,
    stopped: bool,
}

impl Detector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::Arming,
            stopped: false,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Feeds one event through the state machine. Returns the action the
    /// driver must take, if any. After `Stop` every event is a no-op.
    pub fn on_event(&mut self, event: DetectorEvent) -> Option<DetectorAction> {
        if self.stopped {
            return None;
        }

        let action = match (self.state, event) {
            (_, DetectorEvent::Stop) => {
                self.stopped = true;
                self.state = DetectorState::Done;
                None
            }
            (DetectorState::Arming, DetectorEvent::ArmingElapsed) => {
                self.state = DetectorState::Watching;
                None
            }
            // Editor-open touches during the grace period are not saves.
            (DetectorState::Arming, _) => None,
            (
                DetectorState::Watching | DetectorState::Debouncing | DetectorState::Done,
                DetectorEvent::FileChanged,
            ) => {
                self.state = DetectorState::Debouncing;
                Some(DetectorAction::StartDebounce)
            }
            (DetectorState::Debouncing, DetectorEvent::DebounceElapsed) => {
                self.state = DetectorState::Done;
                Some(DetectorAction::EmitSave)
            }
            // Stale timer fire after a state change; nothing to do.
            (_, DetectorEvent::ArmingElapsed | DetectorEvent::DebounceElapsed) => None,
        };

        trace!(?event, state = ?self.state, ?action, "detector transition");
        action
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}
