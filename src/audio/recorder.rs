//! Recording sessions — chunk buffering, conditioning, and finalization.
//!
//! [`AudioSource::begin`] acquires the microphone and returns a
//! [`RecordingSession`]; [`RecordingSession::finish`] resolves to the
//! finalized [`AudioPayload`].  This replaces callback-driven capture with a
//! begin/finish pair the flow controller can drive directly.
//!
//! [`MicSource`] owns the cpal stream on a dedicated thread for the duration
//! of one session, so the non-`Send` stream never crosses the async boundary
//! and the device is released when the session ends — including when it is
//! dropped on an error path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::audio::capture::{AudioCapture, CaptureConstraints, CaptureError};
use crate::audio::format::{negotiate_format, AudioPayload, PayloadFormat};
use crate::audio::resample::{downmix_mono, resample};

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// Ordered buffer of converted sample chunks.
///
/// Incoming slices are re-sliced so no stored chunk exceeds the configured
/// chunk length (the capture chunk interval expressed in samples).  Total
/// length is capped: samples past the cap are dropped with a warning rather
/// than failing the recording.
pub struct ChunkBuffer {
    chunks: Vec<Vec<f32>>,
    total: usize,
    max_chunk_len: usize,
    max_total: usize,
}

impl ChunkBuffer {
    /// Create a buffer storing chunks of at most `max_chunk_len` samples and
    /// at most `max_total` samples overall.
    ///
    /// # Panics
    ///
    /// Panics if `max_chunk_len == 0`.
    pub fn new(max_chunk_len: usize, max_total: usize) -> Self {
        assert!(max_chunk_len > 0, "chunk length must be > 0");
        Self {
            chunks: Vec::new(),
            total: 0,
            max_chunk_len,
            max_total,
        }
    }

    /// Append `samples`, re-slicing to the chunk length.
    pub fn push(&mut self, samples: &[f32]) {
        for piece in samples.chunks(self.max_chunk_len) {
            if self.total >= self.max_total {
                log::warn!(
                    "recording exceeds {} samples, dropping further audio",
                    self.max_total
                );
                return;
            }
            let take = piece.len().min(self.max_total - self.total);
            self.chunks.push(piece[..take].to_vec());
            self.total += take;
        }
    }

    /// Number of buffered samples.
    pub fn total_samples(&self) -> usize {
        self.total
    }

    /// Returns `true` when nothing has been buffered.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of stored chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Concatenate all chunks in arrival order and reset the buffer.
    pub fn drain(&mut self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.total);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(&chunk);
        }
        self.total = 0;
        out
    }
}

// ---------------------------------------------------------------------------
// Conditioning
// ---------------------------------------------------------------------------

/// Amplitude below which a sample counts as background noise.
const GATE_FLOOR: f32 = 0.01;
/// Peak level the auto-gain stage normalizes to.
const GAIN_TARGET: f32 = 0.9;

/// Apply the software half of the capture constraints: a noise gate when
/// `noise_suppression` is set, then peak normalization when `auto_gain` is.
pub fn condition(samples: &mut [f32], constraints: &CaptureConstraints) {
    if constraints.noise_suppression {
        for s in samples.iter_mut() {
            if s.abs() < GATE_FLOOR {
                *s = 0.0;
            }
        }
    }

    if constraints.auto_gain {
        let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        if peak > f32::EPSILON {
            let gain = GAIN_TARGET / peak;
            for s in samples.iter_mut() {
                *s = (*s * gain).clamp(-1.0, 1.0);
            }
        }
    }
}

/// Finalize buffered mono samples into an encoded payload.
///
/// Fails with [`CaptureError::EmptyRecording`] when no audio was captured.
pub(crate) fn finalize_samples(
    mut samples: Vec<f32>,
    constraints: &CaptureConstraints,
    format: PayloadFormat,
) -> Result<AudioPayload, CaptureError> {
    if samples.is_empty() {
        return Err(CaptureError::EmptyRecording);
    }

    condition(&mut samples, constraints);

    let bytes = format
        .encode(&samples, constraints.target_sample_rate)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;

    log::debug!(
        "finalized recording: {} samples -> {} bytes ({})",
        samples.len(),
        bytes.len(),
        format.media_type()
    );

    Ok(AudioPayload {
        bytes,
        media_type: format.media_type(),
        sample_rate: constraints.target_sample_rate,
    })
}

// ---------------------------------------------------------------------------
// AudioSource / RecordingSession traits
// ---------------------------------------------------------------------------

/// A source of recording sessions (a microphone, or a test double).
///
/// Implementations must be `Send + Sync` so they can sit behind an
/// `Arc<dyn AudioSource>` shared with the flow controller.
pub trait AudioSource: Send + Sync {
    /// Acquire the device and start buffering audio.
    fn begin(&self) -> Result<Box<dyn RecordingSession>, CaptureError>;
}

/// One in-progress recording.
///
/// `finish` stops capture, releases the device, and produces the payload.
/// Dropping a session without finishing releases the device and discards
/// the audio.
pub trait RecordingSession: Send {
    fn finish(self: Box<Self>) -> Result<AudioPayload, CaptureError>;
}

// ---------------------------------------------------------------------------
// MicSource
// ---------------------------------------------------------------------------

/// Production [`AudioSource`] backed by the default microphone.
///
/// Enforces the at-most-one-active-acquisition discipline: a second
/// `begin()` while a session is open fails instead of double-acquiring the
/// device.
pub struct MicSource {
    constraints: CaptureConstraints,
    active: Arc<AtomicBool>,
}

impl MicSource {
    pub fn new(constraints: CaptureConstraints) -> Self {
        Self {
            constraints,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    fn max_chunk_len(&self) -> usize {
        (self.constraints.target_sample_rate as usize * self.constraints.chunk_interval_ms as usize)
            / 1000
    }
}

impl AudioSource for MicSource {
    fn begin(&self) -> Result<Box<dyn RecordingSession>, CaptureError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::DeviceUnavailable(
                "a recording session is already open".into(),
            ));
        }

        let constraints = self.constraints;
        let format = negotiate_format();
        let target_rate = constraints.target_sample_rate;

        // Ten minutes of audio at the target rate is more than any pitch
        // recording needs; anything past it is dropped, not an error.
        let max_total = target_rate as usize * 600;
        let buffer = Arc::new(Mutex::new(ChunkBuffer::new(
            self.max_chunk_len().max(1),
            max_total,
        )));

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();

        let thread_buffer = Arc::clone(&buffer);
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::spawn(move || {
            let capture = match AudioCapture::open() {
                Ok(c) => c,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            let (tx, rx) = mpsc::channel();
            let _handle = match capture.start(tx) {
                Ok(h) => h,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            let push = |buf: &Arc<Mutex<ChunkBuffer>>, chunk: crate::audio::SampleChunk| {
                let mono = downmix_mono(&chunk.samples, chunk.channels);
                let converted = resample(&mono, chunk.sample_rate, target_rate);
                if let Ok(mut b) = buf.lock() {
                    b.push(&converted);
                }
            };

            while !thread_stop.load(Ordering::SeqCst) {
                match rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(chunk) => push(&thread_buffer, chunk),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // Flush whatever the audio thread queued before we stopped.
            while let Ok(chunk) = rx.try_recv() {
                push(&thread_buffer, chunk);
            }
            // `_handle` drops here, releasing the device.
        });

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                self.active.store(false, Ordering::SeqCst);
                return Err(e);
            }
            Err(_) => {
                stop.store(true, Ordering::SeqCst);
                let _ = thread.join();
                self.active.store(false, Ordering::SeqCst);
                return Err(CaptureError::DeviceUnavailable(
                    "capture thread did not start".into(),
                ));
            }
        }

        log::info!(
            "recording started ({} Hz target, {})",
            target_rate,
            format.media_type()
        );

        Ok(Box::new(MicSession {
            stop,
            buffer,
            thread: Some(thread),
            constraints,
            format,
            active: Arc::clone(&self.active),
        }))
    }
}

// ---------------------------------------------------------------------------
// MicSession
// ---------------------------------------------------------------------------

struct MicSession {
    stop: Arc<AtomicBool>,
    buffer: Arc<Mutex<ChunkBuffer>>,
    thread: Option<JoinHandle<()>>,
    constraints: CaptureConstraints,
    format: PayloadFormat,
    active: Arc<AtomicBool>,
}

impl MicSession {
    fn release(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        self.active.store(false, Ordering::SeqCst);
    }
}

impl RecordingSession for MicSession {
    fn finish(mut self: Box<Self>) -> Result<AudioPayload, CaptureError> {
        self.release();

        let samples = match self.buffer.lock() {
            Ok(mut buf) => buf.drain(),
            Err(poisoned) => poisoned.into_inner().drain(),
        };

        finalize_samples(samples, &self.constraints, self.format)
    }
}

impl Drop for MicSession {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Scripted [`AudioSource`] used by controller tests.
///
/// Counts `begin()` calls so tests can assert that guarded states never
/// re-acquire the device.
#[cfg(test)]
pub struct MockAudioSource {
    outcome: MockCaptureOutcome,
    begin_calls: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
#[derive(Clone)]
pub enum MockCaptureOutcome {
    /// `begin` succeeds; `finish` yields this payload.
    Payload(AudioPayload),
    /// `begin` fails with this error.
    BeginError(CaptureError),
    /// `begin` succeeds; `finish` fails with this error.
    FinishError(CaptureError),
}

#[cfg(test)]
impl MockAudioSource {
    pub fn recording(bytes: &[u8]) -> Self {
        Self::with_outcome(MockCaptureOutcome::Payload(AudioPayload {
            bytes: bytes.to_vec(),
            media_type: "audio/wav",
            sample_rate: 16_000,
        }))
    }

    pub fn with_outcome(outcome: MockCaptureOutcome) -> Self {
        Self {
            outcome,
            begin_calls: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }

    /// Number of times `begin()` has been invoked.
    pub fn begin_calls(&self) -> Arc<std::sync::atomic::AtomicUsize> {
        Arc::clone(&self.begin_calls)
    }
}

#[cfg(test)]
impl AudioSource for MockAudioSource {
    fn begin(&self) -> Result<Box<dyn RecordingSession>, CaptureError> {
        self.begin_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.outcome.clone() {
            MockCaptureOutcome::BeginError(e) => Err(e),
            MockCaptureOutcome::Payload(p) => Ok(Box::new(MockSession(Ok(p)))),
            MockCaptureOutcome::FinishError(e) => Ok(Box::new(MockSession(Err(e)))),
        }
    }
}

#[cfg(test)]
struct MockSession(Result<AudioPayload, CaptureError>);

#[cfg(test)]
impl RecordingSession for MockSession {
    fn finish(self: Box<Self>) -> Result<AudioPayload, CaptureError> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
