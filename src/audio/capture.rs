//! Microphone acquisition via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle for one
//! recording session.  [`AudioCapture::start`] streams [`SampleChunk`]s over
//! an mpsc channel from the platform audio thread; the returned
//! [`StreamHandle`] is a RAII guard, so dropping it releases the capture
//! device on error paths as well as on normal stop.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureConstraints
// ---------------------------------------------------------------------------

/// Constraints requested for a capture session.
///
/// The channel count and sample-rate target are honoured by conversion in the
/// recorder (devices keep their native stream format).  Echo cancellation is
/// delegated to the platform audio stack; noise suppression and automatic
/// gain are applied in software when the payload is finalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureConstraints {
    /// Channel count of the finalized payload (1 = mono).
    pub channels: u16,
    /// Sample rate of the finalized payload in Hz.
    pub target_sample_rate: u32,
    /// Ask the platform to cancel acoustic echo where supported.
    pub echo_cancellation: bool,
    /// Gate out near-silent samples at finalization.
    pub noise_suppression: bool,
    /// Peak-normalize the recording at finalization.
    pub auto_gain: bool,
    /// Upper bound on buffered chunk length in milliseconds.
    pub chunk_interval_ms: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            channels: 1,
            target_sample_rate: 16_000,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain: true,
            chunk_interval_ms: 250,
        }
    }
}

// ---------------------------------------------------------------------------
// SampleChunk
// ---------------------------------------------------------------------------

/// One buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in `[-1.0, 1.0]` at the device's native
/// rate and channel count; the recorder downmixes and resamples before
/// encoding.
#[derive(Debug, Clone)]
pub struct SampleChunk {
    /// Interleaved PCM samples.
    pub samples: Vec<f32>,
    /// Native sample rate of this chunk in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard keeping the cpal stream alive.
///
/// Dropping it stops the hardware stream, which is the release guarantee the
/// recording session relies on.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised while acquiring or finalizing a recording.
#[derive(Debug, Error, Clone)]
pub enum CaptureError {
    /// The platform refused the capture stream (typically a denied
    /// microphone permission).
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    /// No capture device is present, or the device went away.
    #[error("no usable capture device: {0}")]
    DeviceUnavailable(String),

    /// `stop()` was called before any audio arrived.
    #[error("recording captured no audio")]
    EmptyRecording,

    /// Finalization could not encode the buffered samples.
    #[error("payload encoding failed: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// One microphone acquisition.
///
/// `open` resolves the default input device and its native stream
/// configuration; `start` builds and plays the stream.  Exactly one
/// acquisition exists per recording session.
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Acquire the system default input device.
    ///
    /// # Errors
    ///
    /// [`CaptureError::DeviceUnavailable`] when there is no input device or
    /// it cannot report a stream configuration.
    pub fn open() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            CaptureError::DeviceUnavailable("no input device on the default audio host".into())
        })?;

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_rate,
            channels,
        })
    }

    /// Start streaming [`SampleChunk`]s to `tx`.
    ///
    /// The callback runs on the platform audio thread; send errors (receiver
    /// dropped) are ignored so that thread never panics.
    ///
    /// # Errors
    ///
    /// [`CaptureError::PermissionDenied`] when the platform rejects the
    /// stream, [`CaptureError::DeviceUnavailable`] when the device
    /// disappeared between `open` and `start`.
    pub fn start(&self, tx: mpsc::Sender<SampleChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let chunk = SampleChunk {
                        samples: data.to_vec(),
                        sample_rate,
                        channels,
                    };
                    let _ = tx.send(chunk);
                },
                |err: cpal::StreamError| {
                    log::error!("capture stream error: {err}");
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::DeviceUnavailable("device went away".into())
                }
                other => CaptureError::PermissionDenied(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::PermissionDenied(e.to_string()))?;

        Ok(StreamHandle { _stream: stream })
    }

    /// Native sample rate of the acquired device in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Native channel count of the acquired device.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Chunks cross thread boundaries, so they must be `Send`.
    #[test]
    fn sample_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SampleChunk>();
    }

    #[test]
    fn default_constraints_are_mono_16k() {
        let c = CaptureConstraints::default();
        assert_eq!(c.channels, 1);
        assert_eq!(c.target_sample_rate, 16_000);
        assert!(c.chunk_interval_ms <= 250);
    }

    #[test]
    fn capture_errors_render_messages() {
        let e = CaptureError::PermissionDenied("blocked by policy".into());
        assert!(e.to_string().contains("blocked by policy"));
        assert!(CaptureError::EmptyRecording.to_string().contains("no audio"));
    }
}
