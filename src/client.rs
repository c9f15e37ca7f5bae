//! Backend HTTP client.
//!
//! Two endpoints: a streaming one that takes a finished voice capture and
//! answers with framed events, and a plain JSON one for typed messages.

use crate::defaults;
use crate::error::{CharlaError, Result};
use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A finished microphone capture, as handed over by the capture subsystem.
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    pub data: Vec<u8>,
    pub duration_secs: f64,
}

impl RecordedAudio {
    /// A capture below this size is a misfire (a tap on the record button or a
    /// denied permission), not speech worth a backend round trip.
    pub fn is_usable(&self) -> bool {
        self.data.len() >= defaults::MIN_CAPTURE_BYTES
    }
}

/// Reply of the non-streaming text endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TextReply {
    pub response: String,
    #[serde(default)]
    pub translation: Option<String>,
    /// Base64 PCM16LE of the whole synthesized reply, when voice is enabled.
    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    message: &'a str,
}

/// HTTP client for the conversation backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submits a voice capture and returns the framed event byte stream.
    ///
    /// # Errors
    /// Returns `CharlaError::BackendStatus` for a non-success response and
    /// `CharlaError::Http` for connection failures.
    pub async fn stream_conversation(
        &self,
        recording: &RecordedAudio,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>> + use<>> {
        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(recording.data.clone())
                    .file_name("capture.webm"),
            )
            .text("input_duration", format!("{}", recording.duration_secs));

        debug!(
            bytes = recording.data.len(),
            duration = recording.duration_secs,
            "submitting voice capture"
        );

        let response = self
            .http
            .post(format!("{}/chat/audio/stream", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CharlaError::BackendStatus {
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes_stream())
    }

    /// Sends a typed message and returns the full reply.
    pub async fn send_text(&self, message: &str) -> Result<TextReply> {
        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&TextRequest { message })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CharlaError::BackendStatus {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
