//! Pipeline orchestrator: drives the conversation one turn at a time.
//!
//! [`PipelineOrchestrator`] owns the input source, the shared collaborators
//! and the `ready` signal that tells the input source the previous reply has
//! been delivered.
//!
//! # Loop
//!
//! ```text
//! ready.raised()
//!   └─▶ input_worker(source, ready)            [waits for ready, clears it]
//!         ├─ Ok(None)    → ready.set(), ask again
//!         ├─ Err(Closed) → stop
//!         └─ Ok(turn)    → run_turn(turn)      [fresh TurnController]
//!                            └─▶ ready.set(), next turn
//!
//! shutdown future resolves
//!   └─▶ active turn: request_cancellation(), wait for it to wind down → stop
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::handoff::Signal;
use crate::input::{InputError, InputSource};

use super::controller::TurnError;
use super::stages::{input_worker, run_turn, TurnServices};

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Counters reported when [`PipelineOrchestrator::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Turns that were started.
    pub turns: u64,
    /// Turns aborted by shutdown or an external cancellation.
    pub cancelled: u64,
    /// Turns aborted by the turn timeout.
    pub timed_out: u64,
}

// ---------------------------------------------------------------------------
// PipelineOrchestrator
// ---------------------------------------------------------------------------

/// Drives the complete conversation loop.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_chat::config::PipelineConfig;
/// use voice_chat::input::ConsoleInput;
/// use voice_chat::llm::EchoAgent;
/// use voice_chat::pipeline::{PipelineOrchestrator, TurnServices};
/// use voice_chat::speech::ConsoleVoice;
/// # use voice_chat::stt::{SttError, Transcriber};
/// # struct NoTranscriber;
/// # impl Transcriber for NoTranscriber {
/// #     fn transcribe(&self, _: &[f32], _: u32) -> Result<Option<String>, SttError> { Ok(None) }
/// # }
///
/// # async fn example() {
/// let services = TurnServices {
///     transcriber: Arc::new(NoTranscriber),
///     agent: Arc::new(EchoAgent),
///     voice: Arc::new(ConsoleVoice::stdout()),
/// };
/// let orchestrator = PipelineOrchestrator::new(
///     Box::new(ConsoleInput::stdin()),
///     services,
///     PipelineConfig::default(),
/// );
/// let stats = orchestrator
///     .run(async {
///         let _ = tokio::signal::ctrl_c().await;
///     })
///     .await;
/// println!("{} turns", stats.turns);
/// # }
/// ```
pub struct PipelineOrchestrator {
    input: Box<dyn InputSource>,
    services: TurnServices,
    config: PipelineConfig,
    ready: Signal,
    next_id: u64,
}

impl PipelineOrchestrator {
    pub fn new(input: Box<dyn InputSource>, services: TurnServices, config: PipelineConfig) -> Self {
        Self {
            input,
            services,
            config,
            // The first turn may start straight away.
            ready: Signal::raised(),
            next_id: 1,
        }
    }

    /// Run turns until the input closes, fails, or `shutdown` resolves.
    ///
    /// A turn in flight when `shutdown` resolves is cancelled and allowed to
    /// wind down before this returns.
    pub async fn run<S>(mut self, shutdown: S) -> RunStats
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = RunStats::default();

        log::info!("pipeline: started");

        loop {
            let id = self.next_id;
            let received = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("pipeline: shutdown requested while waiting for input");
                    break;
                }
                received = input_worker(self.input.as_ref(), &self.ready, id) => received,
            };

            let turn = match received {
                Ok(Some(turn)) => turn,
                Ok(None) => {
                    log::debug!("pipeline: nothing usable captured, listening again");
                    self.ready.set();
                    continue;
                }
                Err(InputError::Closed) => {
                    log::info!("pipeline: input closed");
                    break;
                }
                Err(e) => {
                    log::error!("pipeline: input failed: {e}");
                    break;
                }
            };

            self.next_id += 1;
            stats.turns += 1;

            let mut shutting_down = false;
            let result = {
                let running = run_turn(Arc::clone(&turn), &self.services, &self.config);
                tokio::pin!(running);
                tokio::select! {
                    biased;
                    result = &mut running => result,
                    _ = &mut shutdown => {
                        log::info!("pipeline: shutdown requested, cancelling turn {id}");
                        shutting_down = true;
                        turn.request_cancellation();
                        running.await
                    }
                }
            };

            match result {
                Ok(summary) => {
                    log::debug!(
                        "pipeline: turn {} done ({} spoken, {} errors)",
                        summary.id,
                        summary.spoken,
                        summary.errors.len()
                    );
                }
                Err(TurnError::Cancelled) => stats.cancelled += 1,
                Err(TurnError::TimedOut(limit)) => {
                    log::warn!("pipeline: turn {id} timed out after {limit:?}");
                    stats.timed_out += 1;
                }
                Err(e) => log::error!("pipeline: turn {id} failed: {e}"),
            }

            if shutting_down {
                break;
            }
            self.ready.set();
        }

        log::info!(
            "pipeline: stopped after {} turns ({} cancelled, {} timed out)",
            stats.turns,
            stats.cancelled,
            stats.timed_out
        );
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::ScriptedAgent;
    use crate::pipeline::{AudioSamples, TurnInput};
    use crate::speech::RecordingVoice;
    use crate::stt::MockTranscriber;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Replays a fixed list of inputs, honouring the ready protocol, then
    /// reports `Closed`.
    struct ScriptedInput {
        items: Mutex<VecDeque<Result<Option<TurnInput>, InputError>>>,
    }

    impl ScriptedInput {
        fn new(items: Vec<Result<Option<TurnInput>, InputError>>) -> Self {
            Self {
                items: Mutex::new(items.into()),
            }
        }

        fn texts(lines: &[&str]) -> Self {
            Self::new(
                lines
                    .iter()
                    .map(|l| Ok(Some(TurnInput::Text(l.to_string()))))
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl InputSource for ScriptedInput {
        async fn receive(&self, ready: &Signal) -> Result<Option<TurnInput>, InputError> {
            ready.wait().await;
            ready.clear();
            self.items
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(InputError::Closed))
        }
    }

    /// Never produces anything.
    struct SilentInput;

    #[async_trait]
    impl InputSource for SilentInput {
        async fn receive(&self, _ready: &Signal) -> Result<Option<TurnInput>, InputError> {
            std::future::pending().await
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn services(
        transcriber: MockTranscriber,
        agent: Arc<ScriptedAgent>,
        voice: Arc<RecordingVoice>,
    ) -> TurnServices {
        TurnServices {
            transcriber: Arc::new(transcriber),
            agent,
            voice,
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            speak_poll_ms: 10,
            turn_timeout_secs: 5,
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn runs_one_turn_per_input_until_closed() {
        let agent = Arc::new(ScriptedAgent::fragments(&["Hi", " there"]));
        let voice = Arc::new(RecordingVoice::new());
        let orc = PipelineOrchestrator::new(
            Box::new(ScriptedInput::texts(&["hello", "again"])),
            services(MockTranscriber::silent(), agent.clone(), voice.clone()),
            config(),
        );

        let stats = orc.run(std::future::pending()).await;

        assert_eq!(stats, RunStats { turns: 2, cancelled: 0, timed_out: 0 });
        assert_eq!(agent.prompts(), vec!["hello".to_string(), "again".to_string()]);
        assert_eq!(
            voice.spoken(),
            vec!["Hi", " there", "Hi", " there"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn nothing_usable_asks_again_without_a_turn() {
        let agent = Arc::new(ScriptedAgent::fragments(&["ok"]));
        let voice = Arc::new(RecordingVoice::new());
        let input = ScriptedInput::new(vec![
            Ok(None),
            Ok(Some(TurnInput::Text("hi".into()))),
        ]);
        let orc = PipelineOrchestrator::new(
            Box::new(input),
            services(MockTranscriber::silent(), agent.clone(), voice.clone()),
            config(),
        );

        let stats = orc.run(std::future::pending()).await;
        assert_eq!(stats.turns, 1);
        assert_eq!(voice.spoken(), vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn silent_audio_turn_moves_on_to_the_next_input() {
        let agent = Arc::new(ScriptedAgent::fragments(&["reply"]));
        let voice = Arc::new(RecordingVoice::new());
        let input = ScriptedInput::new(vec![Ok(Some(TurnInput::Audio(AudioSamples::new(
            vec![0.0; 16_000],
            16_000,
        ))))]);
        let orc = PipelineOrchestrator::new(
            Box::new(input),
            services(MockTranscriber::ok(""), agent.clone(), voice.clone()),
            config(),
        );

        let stats = orc.run(std::future::pending()).await;
        assert_eq!(stats.turns, 1);
        assert!(agent.prompts().is_empty());
        assert!(voice.spoken().is_empty());
    }

    #[tokio::test]
    async fn input_failure_stops_the_loop() {
        let orc = PipelineOrchestrator::new(
            Box::new(ScriptedInput::new(vec![Err(InputError::Capture("no device".into()))])),
            services(
                MockTranscriber::silent(),
                Arc::new(ScriptedAgent::fragments(&[])),
                Arc::new(RecordingVoice::new()),
            ),
            config(),
        );
        let stats = orc.run(std::future::pending()).await;
        assert_eq!(stats.turns, 0);
    }

    #[tokio::test]
    async fn shutdown_while_waiting_for_input_returns() {
        let orc = PipelineOrchestrator::new(
            Box::new(SilentInput),
            services(
                MockTranscriber::silent(),
                Arc::new(ScriptedAgent::fragments(&[])),
                Arc::new(RecordingVoice::new()),
            ),
            config(),
        );
        let stats = tokio::time::timeout(
            Duration::from_secs(1),
            orc.run(tokio::time::sleep(Duration::from_millis(20))),
        )
        .await
        .expect("shutdown must stop the loop");
        assert_eq!(stats.turns, 0);
    }

    #[tokio::test]
    async fn shutdown_cancels_the_active_turn() {
        let voice = Arc::new(RecordingVoice::slow(Duration::from_secs(30)));
        let orc = PipelineOrchestrator::new(
            Box::new(ScriptedInput::texts(&["long story", "never read"])),
            services(
                MockTranscriber::silent(),
                Arc::new(ScriptedAgent::fragments(&["once upon a time"])),
                voice.clone(),
            ),
            config(),
        );

        let stats = tokio::time::timeout(
            Duration::from_secs(2),
            orc.run(tokio::time::sleep(Duration::from_millis(50))),
        )
        .await
        .expect("cancelled turn must wind down");

        assert_eq!(stats, RunStats { turns: 1, cancelled: 1, timed_out: 0 });
        assert!(voice.spoken().is_empty());
    }

    #[tokio::test]
    async fn timed_out_turn_is_counted_and_loop_continues() {
        let voice = Arc::new(RecordingVoice::slow(Duration::from_secs(30)));
        let orc = PipelineOrchestrator::new(
            Box::new(ScriptedInput::texts(&["stall"])),
            services(
                MockTranscriber::silent(),
                Arc::new(ScriptedAgent::fragments(&["zzz"])),
                voice,
            ),
            PipelineConfig {
                speak_poll_ms: 10,
                turn_timeout_secs: 1,
            },
        );

        let stats = tokio::time::timeout(Duration::from_secs(3), orc.run(std::future::pending()))
            .await
            .expect("watchdog must unblock the loop");
        assert_eq!(stats, RunStats { turns: 1, cancelled: 0, timed_out: 1 });
    }
}
