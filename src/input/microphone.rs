//! Spoken input from the default microphone.
//!
//! Capture runs on the blocking thread pool: the cpal stream is opened,
//! drained and dropped on that one thread.  Chunks are fed to an
//! [`UtteranceDetector`]; the first complete utterance ends the capture.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use async_trait::async_trait;

use super::{InputError, InputSource};
use crate::audio::{AudioCapture, UtteranceDetector};
use crate::config::AudioConfig;
use crate::handoff::Signal;
use crate::pipeline::{AudioSamples, TurnInput};

/// How long the capture loop waits for a chunk before re-checking the stop
/// flag.
const CHUNK_WAIT: Duration = Duration::from_millis(100);

pub struct MicrophoneInput {
    config: AudioConfig,
}

impl MicrophoneInput {
    pub fn new(config: AudioConfig) -> Self {
        Self { config }
    }
}

/// Raises the stop flag when the `receive` future is dropped, so an
/// abandoned capture releases the device.
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn capture_utterance(config: AudioConfig, stop: Arc<AtomicBool>) -> Result<Option<AudioSamples>, InputError> {
    let capture = AudioCapture::open_default().map_err(|e| InputError::Capture(e.to_string()))?;
    let sample_rate = capture.sample_rate();
    let mut detector = UtteranceDetector::from_config(sample_rate, &config);

    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let _stream = capture
        .start(tx)
        .map_err(|e| InputError::Capture(e.to_string()))?;
    log::info!("input: listening for speech...");

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(CHUNK_WAIT) {
            Ok(chunk) => {
                if let Some(utterance) = detector.push(&chunk) {
                    return Ok(Some(AudioSamples::new(utterance, sample_rate)));
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => return Err(InputError::Closed),
        }
    }
    Ok(None)
}

#[async_trait]
impl InputSource for MicrophoneInput {
    async fn receive(&self, ready: &Signal) -> Result<Option<TurnInput>, InputError> {
        ready.wait().await;
        ready.clear();

        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopOnDrop(Arc::clone(&stop));
        let config = self.config.clone();

        let captured = tokio::task::spawn_blocking(move || capture_utterance(config, stop))
            .await
            .map_err(|e| InputError::Capture(format!("capture task failed: {e}")))??;

        Ok(captured.map(TurnInput::Audio))
    }
}
