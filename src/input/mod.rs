//! Input sources that start each turn.
//!
//! An [`InputSource`] waits until the pipeline is ready for the next turn,
//! then captures one utterance or one line of text.
//!
//! | Source              | Payload                | Feature      |
//! |---------------------|------------------------|--------------|
//! | [`ConsoleInput`]    | `TurnInput::Text`      | (always)     |
//! | `MicrophoneInput`   | `TurnInput::Audio`     | `microphone` |

pub mod console;
#[cfg(feature = "microphone")]
pub mod microphone;

pub use console::ConsoleInput;
#[cfg(feature = "microphone")]
pub use microphone::MicrophoneInput;

use async_trait::async_trait;
use thiserror::Error;

use crate::handoff::Signal;
use crate::pipeline::TurnInput;

#[derive(Debug, Error)]
pub enum InputError {
    /// End of input (EOF on stdin, device gone); the conversation is over.
    #[error("input closed")]
    Closed,

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio capture failed: {0}")]
    Capture(String),
}

#[async_trait]
pub trait InputSource: Send + Sync {
    /// Wait for `ready`, then capture one turn's input.
    ///
    /// `Ok(None)` means nothing usable was captured (blank line, noise) and
    /// the caller should simply ask again.
    async fn receive(&self, ready: &Signal) -> Result<Option<TurnInput>, InputError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn InputSource>) {}
};
