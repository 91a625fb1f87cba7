//! Payload formats and container encoding.
//!
//! A finalized recording is stored as an [`AudioPayload`] — an encoded byte
//! buffer tagged with its media type.  The container/codec pair is chosen by
//! probing [`PREFERRED_FORMATS`] (a descending preference list) and selecting
//! the first format the runtime can actually encode, so callers never need to
//! know which encoders are compiled in.

use std::io::Cursor;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioPayload
// ---------------------------------------------------------------------------

/// The finalized, encoded output of one recording session.
///
/// Immutable after finalization: the pipeline hands it to the transcription
/// client and never mutates it again.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Encoded container bytes (e.g. a complete WAV file).
    pub bytes: Vec<u8>,
    /// Media type of `bytes` (e.g. `"audio/wav"`).
    pub media_type: &'static str,
    /// Sample rate the payload was encoded at, in Hz.
    pub sample_rate: u32,
}

impl AudioPayload {
    /// Returns `true` when the payload carries no encoded bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// FormatError
// ---------------------------------------------------------------------------

/// Container encoding failure.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The container writer rejected the stream.
    #[error("container encoding failed: {0}")]
    Container(String),
}

impl From<hound::Error> for FormatError {
    fn from(e: hound::Error) -> Self {
        FormatError::Container(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// PayloadFormat
// ---------------------------------------------------------------------------

/// A container/codec pair the recorder can finalize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// WAV container, 16-bit signed PCM.  Smallest of the supported
    /// containers and universally accepted by transcription services.
    WavPcm16,
    /// WAV container, 32-bit IEEE float PCM.
    WavFloat32,
    /// Bare little-endian `f32` samples with no container header.
    RawPcm,
}

/// Descending preference order used by [`negotiate_format`].
pub const PREFERRED_FORMATS: &[PayloadFormat] = &[
    PayloadFormat::WavPcm16,
    PayloadFormat::WavFloat32,
    PayloadFormat::RawPcm,
];

/// Pick the first entry of [`PREFERRED_FORMATS`] with an available encoder.
///
/// Raw PCM needs no encoder, so negotiation always succeeds.
pub fn negotiate_format() -> PayloadFormat {
    PREFERRED_FORMATS
        .iter()
        .copied()
        .find(|f| f.is_supported())
        .unwrap_or(PayloadFormat::RawPcm)
}

impl PayloadFormat {
    /// Media type string the payload is tagged with.
    pub fn media_type(&self) -> &'static str {
        match self {
            PayloadFormat::WavPcm16 => "audio/wav",
            PayloadFormat::WavFloat32 => "audio/wav;codec=ieee_float",
            PayloadFormat::RawPcm => "audio/pcm",
        }
    }

    /// Whether an encoder for this format is compiled into the binary.
    pub fn is_supported(&self) -> bool {
        match self {
            // WAV is written through hound, which is always linked.
            PayloadFormat::WavPcm16 | PayloadFormat::WavFloat32 => true,
            PayloadFormat::RawPcm => true,
        }
    }

    /// Encode mono `samples` at `sample_rate` into a complete container.
    pub fn encode(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
        match self {
            PayloadFormat::WavPcm16 => encode_wav_pcm16(samples, sample_rate),
            PayloadFormat::WavFloat32 => encode_wav_float(samples, sample_rate),
            PayloadFormat::RawPcm => Ok(encode_raw(samples)),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

fn wav_spec(sample_rate: u32, bits: u16, fmt: hound::SampleFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bits,
        sample_format: fmt,
    }
}

fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
    {
        let spec = wav_spec(sample_rate, 16, hound::SampleFormat::Int);
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for &s in samples {
            let clamped = s.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(bytes)
}

fn encode_wav_float(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::with_capacity(44 + samples.len() * 4);
    {
        let spec = wav_spec(sample_rate, 32, hound::SampleFormat::Float);
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for &s in samples {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
    }
    Ok(bytes)
}

fn encode_raw(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
