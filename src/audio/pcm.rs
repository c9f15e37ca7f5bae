//! PCM chunk decoding.
//!
//! Audio chunks arrive as base64-encoded little-endian 16-bit PCM, mono at
//! [`defaults::SAMPLE_RATE`]. Playback mixes in f32, so samples are normalized
//! to [-1, 1] on decode.

use crate::error::{CharlaError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Decodes one base64 PCM16LE payload into normalized f32 samples.
///
/// # Errors
/// Returns `CharlaError::AudioDecode` for invalid base64 or a payload whose
/// byte length is not a whole number of 16-bit samples.
pub fn decode_chunk(payload: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| CharlaError::AudioDecode {
            message: format!("invalid base64: {}", e),
        })?;

    if bytes.len() % 2 != 0 {
        return Err(CharlaError::AudioDecode {
            message: format!("odd payload length: {} bytes", bytes.len()),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Duration in seconds of `sample_count` mono samples at `sample_rate`.
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}

/// Encodes i16 samples the way the backend does. Test payload helper.
#[cfg(test)]
pub(crate) fn encode_chunk(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}
