//! Turn state machine and stage names.
//!
//! [`TurnState`] tracks one [`TurnController`](super::TurnController) from
//! construction to teardown.  [`Stage`] names the workers that drive it and
//! is used to tag errors and log lines.

use std::fmt;

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// States of a single conversational turn.
///
/// ```text
/// Created ──enter──▶ Seeded ──activate──▶ Active ──complete──▶ Completed
///                       │                    │
///                       └───────cancel───────┴──────────────▶ Cancelled
/// ```
///
/// `Completed` and `Cancelled` are terminal; the controller is discarded
/// afterwards and the next turn gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Primitives constructed, no input handed over yet.
    #[default]
    Created,
    /// The audio or text mailbox holds the turn's input.
    Seeded,
    /// Stage workers are attached and running.
    Active,
    /// Finished normally (including "no usable speech").
    Completed,
    /// Aborted via `request_cancellation`.
    Cancelled,
}

impl TurnState {
    /// ```
    /// use voice_chat::pipeline::TurnState;
    ///
    /// assert!(!TurnState::Created.is_terminal());
    /// assert!(!TurnState::Seeded.is_terminal());
    /// assert!(!TurnState::Active.is_terminal());
    /// assert!(TurnState::Completed.is_terminal());
    /// assert!(TurnState::Cancelled.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Completed | TurnState::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Created => "created",
            TurnState::Seeded => "seeded",
            TurnState::Active => "active",
            TurnState::Completed => "completed",
            TurnState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The workers attached to a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Input,
    Transcribe,
    Respond,
    Speak,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Input => "input",
            Stage::Transcribe => "transcribe",
            Stage::Respond => "respond",
            Stage::Speak => "speak",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_turn_state_is_created() {
        assert_eq!(TurnState::default(), TurnState::Created);
    }

    #[test]
    fn labels_and_display_agree() {
        for s in [
            TurnState::Created,
            TurnState::Seeded,
            TurnState::Active,
            TurnState::Completed,
            TurnState::Cancelled,
        ] {
            assert_eq!(s.to_string(), s.label());
        }
        assert_eq!(Stage::Speak.to_string(), "speak");
        assert_eq!(Stage::Transcribe.label(), "transcribe");
    }
}
