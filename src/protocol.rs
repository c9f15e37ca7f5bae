//! Typed events decoded from stream frames.
//!
//! Each frame of the chunked response carries one JSON object discriminated by
//! its `type` field. Unknown discriminants decode to [`ServerEvent::Unknown`]
//! so new backend event types never break an older client.

use crate::error::{CharlaError, Result};
use serde::Deserialize;

/// One event decoded from a stream frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Recognized user message plus the assistant's reply text.
    Text {
        user_message: String,
        response: String,
    },
    /// One base64-encoded PCM16LE mono audio chunk of the synthesized reply.
    AudioChunk { chunk: String },
    /// No more audio chunks will arrive for this reply.
    AudioEnd,
    /// Translation of the assistant's reply.
    Translation { text: String },
    /// The backend has finished producing this reply.
    Complete,
    /// Any `type` value this client does not know. Dropped by the router.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decodes one frame payload into a typed event.
    ///
    /// A malformed payload is an error for this frame only; the caller logs
    /// and skips it so a single corrupt frame never aborts the stream.
    pub fn decode(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(|e| CharlaError::FrameDecode {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_event() {
        let event =
            ServerEvent::decode(r#"{"type":"text","user_message":"Hola","response":"¡Hola!"}"#)
                .unwrap();
        assert_eq!(
            event,
            ServerEvent::Text {
                user_message: "Hola".to_string(),
                response: "¡Hola!".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_audio_chunk_event() {
        let event = ServerEvent::decode(r#"{"type":"audio_chunk","chunk":"AAAA"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::AudioChunk {
                chunk: "AAAA".to_string()
            }
        );
    }

    #[test]
    fn test_decode_audio_end_event() {
        let event = ServerEvent::decode(r#"{"type":"audio_end"}"#).unwrap();
        assert_eq!(event, ServerEvent::AudioEnd);
    }

    #[test]
    fn test_decode_translation_event() {
        let event = ServerEvent::decode(r#"{"type":"translation","text":"Hello!"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::Translation {
                text: "Hello!".to_string()
            }
        );
    }

    #[test]
    fn test_decode_complete_event() {
        let event = ServerEvent::decode(r#"{"type":"complete"}"#).unwrap();
        assert_eq!(event, ServerEvent::Complete);
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let event = ServerEvent::decode(r#"{"type":"heartbeat","seq":7}"#).unwrap();
        assert_eq!(event, ServerEvent::Unknown);
    }

    #[test]
    fn test_malformed_json_is_frame_decode_error() {
        let result = ServerEvent::decode("{not json");
        match result {
            Err(CharlaError::FrameDecode { message }) => assert!(!message.is_empty()),
            other => panic!("Expected FrameDecode error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_frame_decode_error() {
        let result = ServerEvent::decode(r#"{"type":"text","user_message":"Hola"}"#);
        assert!(matches!(result, Err(CharlaError::FrameDecode { .. })));
    }
}
