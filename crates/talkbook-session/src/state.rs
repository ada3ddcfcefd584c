//! Recording state machine and signal-to-state derivation.
//!
//! Valid transitions within a session:
//! - Idle -> Recording (start)
//! - Recording -> Paused (pause)
//! - Paused -> Recording (resume)
//! - Recording | Paused -> Stopped (stop, or loss of the capture process)
//! - Stopped -> Recording (start a new session)
//!
//! The state is never stored by the capture process; `derive_state` computes
//! it from the latest `CaptureSignals` and the previously observed state.

use std::fmt;

use talkbook_capture::CaptureSignals;

pub use talkbook_core::types::RecordingState;

/// An intent a user or voice command can express against the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAction::Start => write!(f, "start"),
            SessionAction::Pause => write!(f, "pause"),
            SessionAction::Resume => write!(f, "resume"),
            SessionAction::Stop => write!(f, "stop"),
        }
    }
}

impl SessionAction {
    /// The state the session is in once this action has taken effect.
    pub fn outcome(&self) -> RecordingState {
        match self {
            SessionAction::Start | SessionAction::Resume => RecordingState::Recording,
            SessionAction::Pause => RecordingState::Paused,
            SessionAction::Stop => RecordingState::Stopped,
        }
    }

    /// The state this action leads to from `from`, if the transition exists.
    ///
    /// Start and resume both end in `Recording`, so each is additionally
    /// limited to its own source states.
    pub fn target(&self, from: RecordingState) -> Option<RecordingState> {
        use RecordingState::*;
        let to = self.outcome();
        let source_ok = match self {
            SessionAction::Start => matches!(from, Idle | Stopped),
            SessionAction::Resume => from == Paused,
            SessionAction::Pause | SessionAction::Stop => true,
        };
        (source_ok && can_transition(from, to)).then_some(to)
    }
}

/// Returns whether a transition from `from` to `to` is valid.
pub fn can_transition(from: RecordingState, to: RecordingState) -> bool {
    use RecordingState::*;
    matches!(
        (from, to),
        (Idle, Recording)
            | (Recording, Paused)
            | (Paused, Recording)
            | (Recording, Stopped)
            | (Paused, Stopped)
            | (Stopped, Recording)
    )
}

/// Derive the observable state from the latest capture snapshot.
///
/// - capturing -> Recording
/// - not capturing, recording reference, pause acknowledged -> Paused (only
///   from Recording or Paused)
/// - not capturing, recording reference, no pause ack -> unchanged (the
///   process is between states, e.g. finalizing a stop)
/// - no recording reference -> Stopped if a session was running, else the
///   previous Idle/Stopped
/// - process unreachable -> Stopped if a session was running, else unchanged
pub fn derive_state(signals: &CaptureSignals, previous: RecordingState) -> RecordingState {
    use RecordingState::*;
    let session_running = matches!(previous, Recording | Paused);

    if !signals.alive {
        return if session_running { Stopped } else { previous };
    }
    if signals.capturing {
        return Recording;
    }
    if signals.has_recording {
        return if signals.paused && session_running {
            Paused
        } else {
            previous
        };
    }
    if session_running {
        Stopped
    } else {
        previous
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use RecordingState::*;

    fn signals(capturing: bool, paused: bool, has_recording: bool) -> CaptureSignals {
        CaptureSignals {
            capturing,
            paused,
            has_recording,
            ..CaptureSignals::idle()
        }
    }

    #[test]
    fn test_action_display() {
        assert_eq!(SessionAction::Start.to_string(), "start");
        assert_eq!(SessionAction::Pause.to_string(), "pause");
        assert_eq!(SessionAction::Resume.to_string(), "resume");
        assert_eq!(SessionAction::Stop.to_string(), "stop");
    }

    #[test]
    fn test_action_targets_match_transition_table() {
        let states = [Idle, Recording, Paused, Stopped];
        let actions = [
            SessionAction::Start,
            SessionAction::Pause,
            SessionAction::Resume,
            SessionAction::Stop,
        ];
        for from in states {
            for action in actions {
                if let Some(to) = action.target(from) {
                    assert!(can_transition(from, to), "{action} from {from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(can_transition(Idle, Recording));
        assert!(can_transition(Recording, Paused));
        assert!(can_transition(Paused, Recording));
        assert!(can_transition(Recording, Stopped));
        assert!(can_transition(Paused, Stopped));
        assert!(can_transition(Stopped, Recording));
    }

    #[test]
    fn test_invalid_transitions() {
        // No direct Recording -> Idle
        assert!(!can_transition(Recording, Idle));
        assert!(!can_transition(Paused, Idle));
        // Paused only from Recording
        assert!(!can_transition(Idle, Paused));
        assert!(!can_transition(Stopped, Paused));
        // Out of Stopped only via start
        assert!(!can_transition(Stopped, Idle));
        assert!(!can_transition(Idle, Stopped));
        // No self transitions
        for s in [Idle, Recording, Paused, Stopped] {
            assert!(!can_transition(s, s));
        }
    }

    #[test]
    fn test_valid_actions_reach_their_outcome() {
        assert_eq!(SessionAction::Start.target(Idle), Some(Recording));
        assert_eq!(SessionAction::Start.target(Stopped), Some(Recording));
        assert_eq!(SessionAction::Pause.target(Recording), Some(Paused));
        assert_eq!(SessionAction::Resume.target(Paused), Some(Recording));
        assert_eq!(SessionAction::Stop.target(Recording), Some(Stopped));
        assert_eq!(SessionAction::Stop.target(Paused), Some(Stopped));
    }

    #[test]
    fn test_invalid_actions_have_no_target() {
        assert_eq!(SessionAction::Resume.target(Stopped), None);
        assert_eq!(SessionAction::Resume.target(Idle), None);
        assert_eq!(SessionAction::Start.target(Paused), None);
        assert_eq!(SessionAction::Start.target(Recording), None);
        assert_eq!(SessionAction::Pause.target(Idle), None);
        assert_eq!(SessionAction::Resume.target(Recording), None);
        assert_eq!(SessionAction::Stop.target(Idle), None);
        assert_eq!(SessionAction::Stop.target(Stopped), None);
    }

    #[test]
    fn test_derive_capturing_is_recording() {
        for prev in [Idle, Recording, Paused, Stopped] {
            assert_eq!(derive_state(&signals(true, false, true), prev), Recording);
        }
    }

    #[test]
    fn test_derive_paused_requires_ack() {
        assert_eq!(derive_state(&signals(false, true, true), Recording), Paused);
        assert_eq!(derive_state(&signals(false, true, true), Idle), Idle);
        assert_eq!(derive_state(&signals(false, true, true), Stopped), Stopped);
        // Not capturing with a recording but no pause ack keeps the last state.
        assert_eq!(derive_state(&signals(false, false, true), Recording), Recording);
        assert_eq!(derive_state(&signals(false, false, true), Paused), Paused);
    }

    #[test]
    fn test_derive_no_recording() {
        assert_eq!(derive_state(&CaptureSignals::idle(), Idle), Idle);
        assert_eq!(derive_state(&CaptureSignals::idle(), Recording), Stopped);
        assert_eq!(derive_state(&CaptureSignals::idle(), Paused), Stopped);
        assert_eq!(derive_state(&CaptureSignals::idle(), Stopped), Stopped);
    }

    #[test]
    fn test_derive_disconnected_never_goes_to_idle_mid_session() {
        let dead = CaptureSignals::disconnected(7);
        assert_eq!(derive_state(&dead, Recording), Stopped);
        assert_eq!(derive_state(&dead, Paused), Stopped);
        assert_eq!(derive_state(&dead, Idle), Idle);
        assert_eq!(derive_state(&dead, Stopped), Stopped);
    }

    #[test]
    fn test_derived_changes_are_valid_transitions() {
        let snapshots = [
            CaptureSignals::idle(),
            signals(true, false, true),
            signals(false, true, true),
            signals(false, false, true),
            CaptureSignals::disconnected(1),
        ];
        for prev in [Idle, Recording, Paused, Stopped] {
            for snap in &snapshots {
                let next = derive_state(snap, prev);
                assert!(
                    next == prev || can_transition(prev, next),
                    "{prev} -> {next} for {snap:?}"
                );
            }
        }
    }
}
