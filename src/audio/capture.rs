//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] opens the default input device and streams mono `f32`
//! chunks over a std `mpsc` channel.  The returned [`StreamHandle`] owns the
//! cpal stream; dropping it stops capture.  `cpal::Stream` is not `Send` on
//! every platform, so open and drop it on the same thread.

use std::sync::mpsc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::resample::stereo_to_mono;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Use the system default input device at its preferred configuration.
    pub fn open_default() -> Result<Self, CaptureError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;

        if let Ok(name) = device.name() {
            log::debug!("audio: input device {name:?} @ {sample_rate} Hz, {channels} ch");
        }

        Ok(Self {
            device,
            config: supported.into(),
            sample_rate,
            channels,
        })
    }

    /// Start streaming.  Every hardware buffer is downmixed to mono and sent
    /// to `tx`; send errors (receiver gone) are ignored on the audio thread.
    pub fn start(&self, tx: mpsc::Sender<Vec<f32>>) -> Result<StreamHandle, CaptureError> {
        let channels = self.channels;
        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(stereo_to_mono(data, channels));
            },
            |err: cpal::StreamError| {
                log::error!("audio: cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Native rate of the mono chunks, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
