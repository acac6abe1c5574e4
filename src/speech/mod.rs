//! Voices that deliver reply fragments to the user.
//!
//! * [`Voice`]: async trait; `speak` returns once playback has finished.
//! * [`ConsoleVoice`]: prints fragments to stdout.
//! * [`CommandVoice`]: runs an external TTS program per fragment.
//!
//! Each implementation serializes its own calls with an async mutex, so two
//! fragments never play over each other even if callers overlap.

pub mod command;
pub mod console;

pub use command::CommandVoice;
pub use console::ConsoleVoice;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("no TTS command configured")]
    NoCommand,

    #[error("failed to start TTS command {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TTS command {program:?} exited with {status}")]
    ExitStatus { program: String, status: String },

    #[error("failed to write to output: {0}")]
    Output(#[from] std::io::Error),
}

#[async_trait]
pub trait Voice: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), VoiceError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Voice>) {}
};

// ---------------------------------------------------------------------------
// RecordingVoice  (test-only)
// ---------------------------------------------------------------------------

/// Records every fragment; optionally fails on one of them.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingVoice {
    spoken: std::sync::Mutex<Vec<String>>,
    fail_on: Option<String>,
    delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl RecordingVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(text: impl Into<String>) -> Self {
        Self {
            fail_on: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Voice for RecordingVoice {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(VoiceError::ExitStatus {
                program: "mock".into(),
                status: "exit status: 1".into(),
            });
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
