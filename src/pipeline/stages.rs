//! Stage workers and the per-turn supervisor.
//!
//! # Turn flow
//!
//! ```text
//! input_worker ──▶ TurnController::new(input)           (fresh per turn)
//!
//! run_turn
//!   ├─ enter()      seed audio or text mailbox
//!   ├─ activate()
//!   ├─ join!(
//!   │     transcribe_worker   audio ─▶ spawn_blocking(transcribe) ─▶ text
//!   │     respond_worker      text  ─▶ agent.respond() stream     ─▶ replies
//!   │     speak_worker        replies ─▶ voice.speak() (sequential) ─▶ complete()
//!   │     watchdog            turn timeout ─▶ request_cancellation()
//!   │  )
//!   └─ drop(TurnScope)  cleanup()
//! ```
//!
//! Every worker handles its collaborator's failure locally and returns it as
//! its own `Err`; cancellation is returned as [`StageError::Cancelled`] so the
//! supervisor can report the whole turn as cancelled.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::handoff::{Delivery, Signal};
use crate::input::{InputError, InputSource};
use crate::llm::{ChatAgent, ChatError};
use crate::speech::{Voice, VoiceError};
use crate::stt::{has_usable_speech, SttError, Transcriber};

use super::controller::{TurnController, TurnError};
use super::state::Stage;

// ---------------------------------------------------------------------------
// StageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StageError {
    #[error("cancelled")]
    Cancelled,

    #[error("transcription failed: {0}")]
    Transcribe(#[from] SttError),

    #[error("chat agent failed: {0}")]
    Chat(#[from] ChatError),

    #[error("voice failed: {0}")]
    Voice(#[from] VoiceError),

    #[error("worker task failed: {0}")]
    Join(String),
}

impl StageError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StageError::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// TurnServices
// ---------------------------------------------------------------------------

/// The collaborators a turn talks to.  Shared by every turn.
#[derive(Clone)]
pub struct TurnServices {
    pub transcriber: Arc<dyn Transcriber>,
    pub agent: Arc<dyn ChatAgent>,
    pub voice: Arc<dyn Voice>,
}

/// Result of a turn that ran to completion.
#[derive(Debug)]
pub struct TurnSummary {
    pub id: u64,
    /// Fragments successfully handed to the voice.
    pub spoken: usize,
    /// Non-cancellation failures, already logged.
    pub errors: Vec<(Stage, StageError)>,
}

/// What the speak worker managed to deliver.
#[derive(Debug, Default)]
pub struct SpeakReport {
    pub spoken: usize,
    pub failures: Vec<VoiceError>,
}

/// `Ok` if the turn ended normally, `Cancelled` if it was aborted.
fn finished(turn: &TurnController) -> Result<(), StageError> {
    if turn.is_cancelled() {
        Err(StageError::Cancelled)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pull one input from `source` and build the turn that will carry it.
///
/// `Ok(None)` means nothing usable arrived and no turn was created.
pub async fn input_worker(
    source: &dyn InputSource,
    ready: &Signal,
    turn_id: u64,
) -> Result<Option<Arc<TurnController>>, InputError> {
    let Some(input) = source.receive(ready).await? else {
        return Ok(None);
    };
    log::debug!("turn {turn_id}: received {} input", input.kind());
    Ok(Some(Arc::new(TurnController::new(turn_id, input))))
}

// ---------------------------------------------------------------------------
// Transcribe
// ---------------------------------------------------------------------------

/// Audio mailbox → transcript → text mailbox.
///
/// A clip without usable speech completes the turn without touching the
/// text mailbox.  After handing over a transcript the worker stays until
/// the turn ends.
pub async fn transcribe_worker(
    turn: &TurnController,
    transcriber: Arc<dyn Transcriber>,
) -> Result<(), StageError> {
    let audio = match turn.until_finished(turn.audio().get()).await {
        None => return finished(turn),
        Some(Delivery::Interrupted) => return Err(StageError::Cancelled),
        Some(Delivery::Value(audio)) => audio,
    };

    let job = tokio::task::spawn_blocking(move || {
        transcriber.transcribe(&audio.samples, audio.sample_rate)
    });
    let transcript = match turn.until_finished(job).await {
        None => return finished(turn),
        Some(Err(join)) => {
            turn.complete();
            return Err(StageError::Join(join.to_string()));
        }
        Some(Ok(Err(e))) => {
            turn.complete();
            return Err(StageError::Transcribe(e));
        }
        Some(Ok(Ok(transcript))) => transcript,
    };

    if turn.is_cancelled() {
        return Err(StageError::Cancelled);
    }

    match transcript {
        Some(text) if has_usable_speech(&text) => {
            log::info!("turn {}: heard {:?}", turn.id(), text);
            turn.text().set(text);
        }
        _ => {
            log::warn!("turn {}: no usable speech detected", turn.id());
            turn.complete();
            return Ok(());
        }
    }

    turn.until_finished(std::future::pending::<()>()).await;
    finished(turn)
}

// ---------------------------------------------------------------------------
// Respond
// ---------------------------------------------------------------------------

/// Text mailbox → chat agent → reply queue.
///
/// Every fragment is queued as yielded; agents drop blank lines themselves
/// (see [`split_fragments`](crate::llm::split_fragments)).
///
/// The batch is marked complete whenever the reply stream ends, including
/// an error ending and an empty reply, so the speak worker never waits on a
/// batch that will not come.
pub async fn respond_worker(
    turn: &TurnController,
    agent: Arc<dyn ChatAgent>,
) -> Result<(), StageError> {
    let text = match turn.until_finished(turn.text().get()).await {
        None => return finished(turn),
        Some(Delivery::Interrupted) => return Err(StageError::Cancelled),
        Some(Delivery::Value(text)) => text,
    };

    let mut reply = agent.respond(&text);
    let mut produced = 0usize;
    let mut failure = None;

    loop {
        let item = tokio::select! {
            biased;
            _ = turn.wait_for_cancellation() => return Err(StageError::Cancelled),
            item = reply.next() => item,
        };
        match item {
            None => break,
            Some(Ok(fragment)) => {
                produced += 1;
                turn.replies().put(fragment);
            }
            Some(Err(e)) => {
                failure = Some(e);
                break;
            }
        }
    }

    turn.replies().mark_batch_complete();
    log::debug!("turn {}: reply batch complete ({produced} fragments)", turn.id());

    match failure {
        Some(e) => Err(StageError::Chat(e)),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Speak
// ---------------------------------------------------------------------------

/// Reply queue → voice, one fragment at a time, then `complete()`.
///
/// While the batch is open the worker races a `poll`-bounded `get` against
/// the batch-complete marker; once the marker is seen it drains whatever is
/// still queued before finishing.
pub async fn speak_worker(
    turn: &TurnController,
    voice: Arc<dyn Voice>,
    poll: Duration,
) -> Result<SpeakReport, StageError> {
    let mut report = SpeakReport::default();

    loop {
        tokio::select! {
            biased;
            _ = turn.wait_for_cancellation() => return Err(StageError::Cancelled),
            _ = turn.wait_for_completion() => return Ok(report),
            got = tokio::time::timeout(poll, turn.replies().get()) => match got {
                Err(_elapsed) => continue,
                Ok(Delivery::Interrupted) => return Err(StageError::Cancelled),
                Ok(Delivery::Value(fragment)) => speak_fragment(turn, voice.as_ref(), &fragment, &mut report).await?,
            },
            _ = turn.replies().wait_for_batch_completion() => break,
        }
    }

    while let Some(delivery) = turn.replies().try_get() {
        match delivery {
            Delivery::Interrupted => return Err(StageError::Cancelled),
            Delivery::Value(fragment) => {
                speak_fragment(turn, voice.as_ref(), &fragment, &mut report).await?
            }
        }
    }

    turn.complete();
    Ok(report)
}

async fn speak_fragment(
    turn: &TurnController,
    voice: &dyn Voice,
    fragment: &str,
    report: &mut SpeakReport,
) -> Result<(), StageError> {
    let result = tokio::select! {
        biased;
        _ = turn.wait_for_cancellation() => return Err(StageError::Cancelled),
        result = voice.speak(fragment) => result,
    };
    match result {
        Ok(()) => report.spoken += 1,
        // Logged once by `run_turn` when the report is collected.
        Err(e) => report.failures.push(e),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Drive one turn to its end.
///
/// Every stage error is collected and logged.  Cancellation, from outside or
/// from the turn timeout, is returned as an error; collaborator failures are
/// reported in the summary.
pub async fn run_turn(
    turn: Arc<TurnController>,
    services: &TurnServices,
    config: &PipelineConfig,
) -> Result<TurnSummary, TurnError> {
    let scope = turn.enter()?;
    scope.activate()?;
    let id = scope.id();

    let timeout = config.turn_timeout();
    let watchdog = async {
        let Some(limit) = timeout else {
            return false;
        };
        tokio::select! {
            _ = tokio::time::sleep(limit) => {
                log::warn!("turn {id}: no result after {limit:?}, cancelling");
                scope.request_cancellation();
                true
            }
            _ = scope.wait_for_completion() => false,
            _ = scope.wait_for_cancellation() => false,
        }
    };

    let (transcribed, responded, spoke, timed_out) = tokio::join!(
        transcribe_worker(&scope, Arc::clone(&services.transcriber)),
        respond_worker(&scope, Arc::clone(&services.agent)),
        speak_worker(&scope, Arc::clone(&services.voice), config.speak_poll()),
        watchdog,
    );

    let mut errors = Vec::new();
    let mut cancelled = false;
    let mut spoken = 0;

    let mut collect = |stage: Stage, result: Result<(), StageError>| match result {
        Ok(()) => {}
        Err(e) if e.is_cancellation() => cancelled = true,
        Err(e) => {
            log::error!("turn {id}: {stage} stage failed: {e}");
            errors.push((stage, e));
        }
    };
    collect(Stage::Transcribe, transcribed);
    collect(Stage::Respond, responded);
    match spoke {
        Ok(report) => {
            spoken = report.spoken;
            for e in report.failures {
                collect(Stage::Speak, Err(StageError::Voice(e)));
            }
        }
        Err(e) => collect(Stage::Speak, Err(e)),
    }

    if timed_out {
        if let Some(limit) = timeout {
            return Err(TurnError::TimedOut(limit));
        }
    }
    if cancelled || scope.is_cancelled() {
        log::info!("turn {id}: cancelled");
        return Err(TurnError::Cancelled);
    }

    log::debug!("turn {id}: finished, {spoken} fragments spoken");
    Ok(TurnSummary { id, spoken, errors })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
