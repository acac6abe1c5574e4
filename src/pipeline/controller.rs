//! One conversational turn: its handoff primitives, state and lifecycle.
//!
//! A [`TurnController`] is built for exactly one turn from that turn's input
//! and discarded afterwards; the next turn gets a fresh instance, so nothing
//! leaks between turns.
//!
//! ```text
//!            ┌──────────────── TurnController ────────────────┐
//!  input ──▶ │ audio: Mailbox<AudioSamples> ──▶ transcribe    │
//!            │ text:  Mailbox<String>       ──▶ respond       │
//!            │ replies: BatchQueue<String>  ──▶ speak         │
//!            │ cancelled: Signal   completed: Signal          │
//!            └────────────────────────────────────────────────┘
//! ```
//!
//! The controller never moves data itself.  It owns the primitives, seeds
//! the initial input when the turn is entered, and tears everything down
//! when the [`TurnScope`] guard is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::handoff::{lock_recover, BatchQueue, HandoffError, Mailbox, Signal};

use super::state::TurnState;

// ---------------------------------------------------------------------------
// Turn input
// ---------------------------------------------------------------------------

/// A captured utterance: mono `f32` PCM at `sample_rate` Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSamples {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioSamples {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }
}

/// The payload that starts a turn.  Exactly one kind per turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnInput {
    Audio(AudioSamples),
    Text(String),
}

impl TurnInput {
    /// Build from optional parts, rejecting "neither" and "both".
    pub fn from_parts(audio: Option<AudioSamples>, text: Option<String>) -> Result<Self, TurnError> {
        match (audio, text) {
            (Some(audio), None) => Ok(TurnInput::Audio(audio)),
            (None, Some(text)) => Ok(TurnInput::Text(text)),
            (None, None) => Err(TurnError::MissingInput),
            (Some(_), Some(_)) => Err(TurnError::AmbiguousInput),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnInput::Audio(_) => "audio",
            TurnInput::Text(_) => "text",
        }
    }
}

// ---------------------------------------------------------------------------
// TurnError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("a turn needs either audio or text input")]
    MissingInput,

    #[error("a turn takes audio or text input, not both")]
    AmbiguousInput,

    #[error("turn cannot go from {from} to {to}")]
    InvalidTransition { from: TurnState, to: TurnState },

    #[error("turn was cancelled")]
    Cancelled,

    #[error("turn did not finish within {0:?}")]
    TimedOut(Duration),
}

// ---------------------------------------------------------------------------
// TurnController
// ---------------------------------------------------------------------------

pub struct TurnController {
    id: u64,
    input: Mutex<Option<TurnInput>>,
    audio: Mailbox<AudioSamples>,
    text: Mailbox<String>,
    replies: BatchQueue<String>,
    cancelled: Signal,
    completed: Signal,
    state: Mutex<TurnState>,
}

impl TurnController {
    pub fn new(id: u64, input: TurnInput) -> Self {
        Self {
            id,
            input: Mutex::new(Some(input)),
            audio: Mailbox::new("audio"),
            text: Mailbox::new("text"),
            replies: BatchQueue::new("replies"),
            cancelled: Signal::new(),
            completed: Signal::new(),
            state: Mutex::new(TurnState::Created),
        }
    }

    /// Fails fast unless exactly one of `audio` / `text` is given.
    pub fn from_parts(
        id: u64,
        audio: Option<AudioSamples>,
        text: Option<String>,
    ) -> Result<Self, TurnError> {
        Ok(Self::new(id, TurnInput::from_parts(audio, text)?))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn audio(&self) -> &Mailbox<AudioSamples> {
        &self.audio
    }

    pub fn text(&self) -> &Mailbox<String> {
        &self.text
    }

    pub fn replies(&self) -> &BatchQueue<String> {
        &self.replies
    }

    pub fn state(&self) -> TurnState {
        *lock_recover(&self.state)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the turn: seed the matching mailbox with the input and return the
    /// guard that runs [`cleanup`](Self::cleanup) when dropped.
    pub fn enter(self: &Arc<Self>) -> Result<TurnScope, TurnError> {
        self.transition(TurnState::Seeded, &[TurnState::Created])?;

        match lock_recover(&self.input).take() {
            Some(TurnInput::Audio(samples)) => {
                log::debug!(
                    "turn {}: seeded with {:.1}s of audio",
                    self.id,
                    samples.duration().as_secs_f32()
                );
                self.audio.set(samples);
            }
            Some(TurnInput::Text(text)) => {
                log::debug!("turn {}: seeded with text", self.id);
                self.text.set(text);
            }
            None => return Err(TurnError::MissingInput),
        }

        Ok(TurnScope {
            controller: Arc::clone(self),
        })
    }

    /// Mark the stage workers as attached.
    pub fn activate(&self) -> Result<(), TurnError> {
        self.transition(TurnState::Active, &[TurnState::Seeded])
    }

    /// Signal that the turn is logically done.  Idempotent; primitives are
    /// left alone until [`cleanup`](Self::cleanup).
    pub fn complete(&self) {
        {
            let mut state = lock_recover(&self.state);
            if !state.is_terminal() {
                *state = TurnState::Completed;
            }
        }
        self.completed.set();
    }

    /// Abort the turn.  Raises the cancellation flag and pushes the
    /// interrupt sentinel into every primitive so no worker stays suspended
    /// in a `get`.  Safe to call from any task or thread, any number of
    /// times.
    pub fn request_cancellation(&self) {
        {
            let mut state = lock_recover(&self.state);
            if !state.is_terminal() {
                *state = TurnState::Cancelled;
            }
        }
        if self.cancelled.is_set() {
            return;
        }
        log::debug!("turn {}: cancellation requested", self.id);
        self.cancelled.set();
        self.audio.interrupt();
        self.text.interrupt();
        self.replies.interrupt();
    }

    /// Reset every primitive and make sure `completed` is raised.
    ///
    /// A failing reset does not stop the others; every failure is logged and
    /// returned.
    pub fn cleanup(&self) -> Vec<HandoffError> {
        lock_recover(&self.input).take();

        let errors: Vec<HandoffError> = [self.audio.reset(), self.text.reset(), self.replies.reset()]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        for e in &errors {
            log::error!("turn {}: cleanup: {e}", self.id);
        }

        self.complete();
        log::debug!("turn {}: cleaned up ({})", self.id, self.state());
        errors
    }

    pub async fn wait_for_completion(&self) {
        self.completed.wait().await;
    }

    pub async fn wait_for_cancellation(&self) {
        self.cancelled.wait().await;
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_set()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_set()
    }

    /// `true` once the turn has either completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.is_completed() || self.is_cancelled()
    }

    /// Run `fut` unless the turn finishes first.
    ///
    /// Returns `None` when completion or cancellation wins the race.
    pub async fn until_finished<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled.wait() => None,
            _ = self.completed.wait() => None,
            out = fut => Some(out),
        }
    }

    fn transition(&self, to: TurnState, from: &[TurnState]) -> Result<(), TurnError> {
        let mut state = lock_recover(&self.state);
        if *state == TurnState::Cancelled {
            return Err(TurnError::Cancelled);
        }
        if !from.contains(&state) {
            return Err(TurnError::InvalidTransition { from: *state, to });
        }
        log::trace!("turn {}: {} -> {}", self.id, *state, to);
        *state = to;
        Ok(())
    }
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// TurnScope
// ---------------------------------------------------------------------------

/// Guard returned by [`TurnController::enter`].  Dropping it (normal return,
/// early `?`, or unwinding) runs [`TurnController::cleanup`].
pub struct TurnScope {
    controller: Arc<TurnController>,
}

impl TurnScope {
    pub fn controller(&self) -> &Arc<TurnController> {
        &self.controller
    }
}

impl std::ops::Deref for TurnScope {
    type Target = TurnController;

    fn deref(&self) -> &TurnController {
        &self.controller
    }
}

impl Drop for TurnScope {
    fn drop(&mut self) {
        self.controller.cleanup();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
