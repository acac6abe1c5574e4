//! voice-chat: a turn-coordinated voice/text conversation loop.
//!
//! Each turn moves one input through transcription, a chat agent and a
//! voice, using per-turn handoff primitives that are torn down before the
//! next turn starts.  See [`pipeline`] for the overall flow.

pub mod audio;
pub mod config;
pub mod handoff;
pub mod input;
pub mod llm;
pub mod pipeline;
pub mod speech;
pub mod stt;
