//! Interaction lifecycle and stale-event fencing.
//!
//! Every user turn gets a strictly increasing identity when it begins, at
//! capture start or text send time, the only point guaranteed to precede all
//! of that turn's events. The controller keeps exactly one active identity;
//! events carrying any other identity are stale and dropped before they can
//! touch visible state or the playback timeline.

use crate::audio::{AudioScheduler, AudioSink, PlaybackDone};
use crate::client::TextReply;
use crate::error::Result;
use crate::protocol::ServerEvent;
use crate::session::view::{ChatView, MessageId, Role, UiStatus};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Identifier of one user turn.
pub type InteractionId = u64;

/// Coordinates capture, backend streaming and playback for one conversation.
///
/// Owns the interaction identity counter, the state machine shown to the
/// view, and the single playback scheduler shared by every turn.
pub struct SessionController<S: AudioSink, V: ChatView> {
    scheduler: AudioScheduler<S>,
    view: V,
    next_interaction: InteractionId,
    active: InteractionId,
    next_message: MessageId,
    status: UiStatus,
    // Streamed assistant messages by interaction, so a late translation can
    // still annotate the turn it targets after that turn is superseded.
    // Pruned on each new interaction; only the previous turn can still
    // receive a late translation.
    assistant_messages: HashMap<InteractionId, MessageId>,
}

impl<S: AudioSink + 'static, V: ChatView> SessionController<S, V> {
    pub fn new(scheduler: AudioScheduler<S>, view: V) -> Self {
        Self {
            scheduler,
            view,
            next_interaction: 1,
            active: 0,
            next_message: 0,
            status: UiStatus::Idle,
            assistant_messages: HashMap::new(),
        }
    }

    /// The single fencing predicate: an event belongs to a stale turn when its
    /// identity is not the active one.
    pub fn is_stale(&self, id: InteractionId) -> bool {
        id != self.active
    }

    /// Begins a voice turn. Allowed from any state so the user can always
    /// interrupt; whatever the previous turn was doing is fenced off and its
    /// audio hard-stopped.
    pub fn start_capture(&mut self) -> InteractionId {
        let id = self.begin_interaction();
        self.set_status(UiStatus::Recording);
        id
    }

    /// Begins a text turn, displaying the user's message immediately.
    pub fn start_text_turn(&mut self, message: &str) -> InteractionId {
        let id = self.begin_interaction();
        self.set_status(UiStatus::Processing);
        self.push_message(Role::User, message, false);
        id
    }

    fn begin_interaction(&mut self) -> InteractionId {
        let id = self.next_interaction;
        self.next_interaction += 1;
        self.active = id;
        self.assistant_messages.retain(|&turn, _| turn + 1 >= id);
        self.scheduler.stop();
        debug!(interaction = id, "interaction started");
        id
    }

    /// Capture finished and the recording is on its way to the backend.
    pub fn begin_processing(&mut self, id: InteractionId) {
        if self.is_stale(id) {
            return;
        }
        self.set_status(UiStatus::Processing);
    }

    /// Arms a playback session for this turn's audio.
    ///
    /// Returns `None` without touching the scheduler when the turn has already
    /// been superseded.
    pub fn arm_playback(&mut self, id: InteractionId) -> Result<Option<PlaybackDone>> {
        if self.is_stale(id) {
            return Ok(None);
        }
        Ok(Some(self.scheduler.begin_session()?))
    }

    /// Routes one decoded event for the turn `id`.
    ///
    /// Stale events are dropped, except translations: those target a specific
    /// past message and are supplementary metadata, not control flow, so a
    /// late translation still annotates the message it belongs to.
    pub fn handle_event(&mut self, id: InteractionId, event: ServerEvent) -> Result<()> {
        if let ServerEvent::Translation { text } = &event {
            if let Some(&message) = self.assistant_messages.get(&id) {
                self.view.translation_added(message, text);
            }
            return Ok(());
        }

        if self.is_stale(id) {
            trace!(interaction = id, "dropping stale event");
            return Ok(());
        }

        match event {
            ServerEvent::Text {
                user_message,
                response,
            } => {
                self.push_message(Role::User, &user_message, false);
                let message = self.push_message(Role::Assistant, &response, true);
                self.assistant_messages.insert(id, message);
            }
            ServerEvent::AudioChunk { chunk } => {
                self.set_status(UiStatus::Playing);
                self.scheduler.play_chunk(&chunk)?;
            }
            ServerEvent::AudioEnd => {
                self.scheduler.finish_streaming();
            }
            ServerEvent::Complete => {
                if let Some(&message) = self.assistant_messages.get(&id) {
                    self.view.message_settled(message);
                }
            }
            ServerEvent::Translation { .. } | ServerEvent::Unknown => {}
        }
        Ok(())
    }

    /// Handles the reply of a non-streaming text turn.
    ///
    /// Returns the playback handle when the reply carried audio.
    pub fn handle_text_reply(
        &mut self,
        id: InteractionId,
        reply: &TextReply,
    ) -> Result<Option<PlaybackDone>> {
        if self.is_stale(id) {
            return Ok(None);
        }

        let message = self.push_message(Role::Assistant, &reply.response, false);
        self.assistant_messages.insert(id, message);
        if let Some(translation) = &reply.translation {
            self.view.translation_added(message, translation);
        }

        match &reply.audio {
            Some(audio) => match self.begin_reply_playback(audio) {
                Ok(done) => {
                    self.set_status(UiStatus::Playing);
                    Ok(Some(done))
                }
                Err(e) => {
                    // Device failures degrade the turn to idle, never strand it.
                    self.scheduler.stop();
                    self.set_status(UiStatus::Idle);
                    Err(e)
                }
            },
            None => {
                self.set_status(UiStatus::Idle);
                Ok(None)
            }
        }
    }

    fn begin_reply_playback(&mut self, audio: &str) -> Result<PlaybackDone> {
        let done = self.scheduler.begin_session()?;
        self.scheduler.play_chunk(audio)?;
        self.scheduler.finish_streaming();
        Ok(done)
    }

    /// The byte stream for turn `id` ended.
    ///
    /// A response that resolved without audio returns the turn to idle here;
    /// one with audio stays in playing until [`playback_complete`].
    ///
    /// [`playback_complete`]: SessionController::playback_complete
    pub fn finish_stream(&mut self, id: InteractionId) {
        if self.is_stale(id) {
            return;
        }
        if self.status == UiStatus::Processing {
            self.set_status(UiStatus::Idle);
        }
    }

    /// The last sample of turn `id`'s audio actually finished rendering.
    pub fn playback_complete(&mut self, id: InteractionId) {
        if self.is_stale(id) {
            trace!(interaction = id, "ignoring stale playback completion");
            return;
        }
        self.set_status(UiStatus::Idle);
    }

    /// Abandons turn `id` after a transport or capture failure.
    ///
    /// Identity state stays intact, so the next attempt fences normally.
    pub fn abort(&mut self, id: InteractionId) {
        if self.is_stale(id) {
            return;
        }
        self.scheduler.stop();
        self.set_status(UiStatus::Idle);
    }

    /// The current interface status.
    pub fn status(&self) -> UiStatus {
        self.status
    }

    fn push_message(&mut self, role: Role, text: &str, streaming: bool) -> MessageId {
        let id = self.next_message;
        self.next_message += 1;
        self.view.message_added(id, role, text, streaming);
        id
    }

    fn set_status(&mut self, status: UiStatus) {
        if self.status != status {
            self.status = status;
            self.view.status_changed(status);
        }
    }
}
