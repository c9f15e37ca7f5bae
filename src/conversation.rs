//! Conversation orchestration.
//!
//! Ties the backend client, the frame transport and the session controller
//! together into the two turn flows: a streamed voice turn and a plain text
//! turn. All controller access goes through one mutex; the stream pump, the
//! playback watcher task and the caller all funnel through it.

use crate::audio::{AudioSink, PlaybackDone};
use crate::audio::sink::lock_unpoisoned;
use crate::client::{BackendClient, RecordedAudio};
use crate::error::{CharlaError, Result};
use crate::protocol::ServerEvent;
use crate::session::{ChatView, InteractionId, SessionController};
use crate::transport::FrameSplitter;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// One end-to-end conversation against a backend.
pub struct Conversation<S: AudioSink + 'static, V: ChatView + 'static> {
    client: BackendClient,
    controller: Arc<Mutex<SessionController<S, V>>>,
}

impl<S: AudioSink + 'static, V: ChatView + 'static> Conversation<S, V> {
    pub fn new(client: BackendClient, controller: SessionController<S, V>) -> Self {
        Self {
            client,
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// The user started recording. Fences off whatever turn was in flight.
    pub fn start_capture(&self) -> InteractionId {
        lock_unpoisoned(&self.controller).start_capture()
    }

    /// The capture attempt failed (permission denied, device gone).
    pub fn capture_failed(&self, id: InteractionId) {
        lock_unpoisoned(&self.controller).abort(id);
    }

    /// Runs one voice turn: submits the finished capture and drives the
    /// response stream until it ends or the turn is superseded.
    ///
    /// # Errors
    /// A too-short capture, a failed request and a device failure all abort
    /// the turn and return it to idle; none of them disturb fencing for the
    /// next attempt.
    pub async fn voice_turn(&self, id: InteractionId, recording: RecordedAudio) -> Result<()> {
        if !recording.is_usable() {
            lock_unpoisoned(&self.controller).abort(id);
            return Err(CharlaError::Capture {
                message: format!("capture too short: {} bytes", recording.data.len()),
            });
        }

        lock_unpoisoned(&self.controller).begin_processing(id);

        let stream = match self.client.stream_conversation(&recording).await {
            Ok(stream) => stream,
            Err(e) => {
                lock_unpoisoned(&self.controller).abort(id);
                return Err(e);
            }
        };

        if let Some(done) = self.arm_session(id)? {
            self.spawn_playback_watcher(id, done);
        }

        self.pump_events(id, stream).await
    }

    /// Arms playback for the turn, degrading it to idle if the device fails.
    fn arm_session(&self, id: InteractionId) -> Result<Option<PlaybackDone>> {
        let mut controller = lock_unpoisoned(&self.controller);
        match controller.arm_playback(id) {
            Ok(done) => Ok(done),
            Err(e) => {
                controller.abort(id);
                Err(e)
            }
        }
    }

    /// Runs one text turn: sends the message and applies the single reply.
    pub async fn text_turn(&self, message: &str) -> Result<InteractionId> {
        let id = lock_unpoisoned(&self.controller).start_text_turn(message);

        let reply = match self.client.send_text(message).await {
            Ok(reply) => reply,
            Err(e) => {
                lock_unpoisoned(&self.controller).abort(id);
                return Err(e);
            }
        };

        let done = lock_unpoisoned(&self.controller).handle_text_reply(id, &reply)?;
        if let Some(done) = done {
            self.spawn_playback_watcher(id, done);
        }
        Ok(id)
    }

    /// Reads the byte stream, reassembles frames and routes decoded events.
    ///
    /// A frame that fails to decode is logged and skipped; the stream
    /// continues. Transport and device errors abort the turn.
    async fn pump_events(
        &self,
        id: InteractionId,
        stream: impl Stream<Item = reqwest::Result<Bytes>>,
    ) -> Result<()> {
        let mut splitter = FrameSplitter::new();
        let mut stream = std::pin::pin!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    lock_unpoisoned(&self.controller).abort(id);
                    return Err(e.into());
                }
            };

            for frame in splitter.push(&chunk) {
                let event = match ServerEvent::decode(&frame) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "skipping undecodable frame");
                        continue;
                    }
                };
                if let Err(e) = lock_unpoisoned(&self.controller).handle_event(id, event) {
                    lock_unpoisoned(&self.controller).abort(id);
                    return Err(e);
                }
            }
        }

        info!(interaction = id, "response stream ended");
        lock_unpoisoned(&self.controller).finish_stream(id);
        Ok(())
    }

    /// Waits for the turn's last sample to finish rendering, then returns the
    /// state machine to idle. A superseded session resolves as cancelled and
    /// leaves the new turn untouched.
    fn spawn_playback_watcher(&self, id: InteractionId, done: PlaybackDone) {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            if done.wait().await {
                lock_unpoisoned(&controller).playback_complete(id);
            }
        });
    }
}
