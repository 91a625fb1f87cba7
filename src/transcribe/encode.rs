//! Transport encoding for audio payloads.
//!
//! The transcription endpoint takes the payload as one base64 string.  A
//! multi-minute recording runs to megabytes, so the bytes are encoded in
//! fixed-size chunks and the chunk outputs concatenated — peak memory stays
//! bounded by the chunk size instead of a second full-size copy of the
//! payload.  The chunk size is a multiple of 3, which makes per-chunk
//! encoding byte-for-byte identical to encoding the whole buffer at once.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::client::TranscribeError;

/// Bytes encoded per chunk.  48 KiB is divisible by 3, so chunk boundaries
/// never introduce padding.
pub(crate) const ENCODE_CHUNK_BYTES: usize = 48 * 1024;

/// Encode `bytes` to a single base64 string, chunk by chunk.
///
/// # Errors
///
/// [`TranscribeError::EncodingFailed`] when `bytes` is empty — an empty
/// payload can never transcribe to anything.
pub fn encode_payload(bytes: &[u8]) -> Result<String, TranscribeError> {
    if bytes.is_empty() {
        return Err(TranscribeError::EncodingFailed(
            "audio payload is empty".into(),
        ));
    }

    let mut encoded = String::with_capacity(bytes.len() / 3 * 4 + 4);
    for chunk in bytes.chunks(ENCODE_CHUNK_BYTES) {
        BASE64.encode_string(chunk, &mut encoded);
    }
    Ok(encoded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
