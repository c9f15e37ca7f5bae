//! Chat rendering seam.
//!
//! The controller never draws anything itself; it narrates the conversation
//! to a [`ChatView`] and the view decides how to present it.

use crate::audio::sink::lock_unpoisoned;
use std::sync::{Arc, Mutex};

/// Identifier of one rendered chat message.
pub type MessageId = u64;

/// Who a chat message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Coarse interface state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiStatus {
    #[default]
    Idle,
    Recording,
    Processing,
    Playing,
}

/// Trait for chat rendering surfaces.
///
/// This trait allows swapping implementations (real UI vs a collector used in
/// tests). Calls arrive in conversation order on whatever task drives the
/// session.
pub trait ChatView: Send {
    /// A new message appeared. `streaming` means its text may still be
    /// annotated (e.g. by a late translation) before it settles.
    fn message_added(&mut self, id: MessageId, role: Role, text: &str, streaming: bool);

    /// A translation arrived for an existing message.
    fn translation_added(&mut self, id: MessageId, text: &str);

    /// The message will receive no further annotations.
    fn message_settled(&mut self, id: MessageId);

    /// The interface status changed.
    fn status_changed(&mut self, status: UiStatus);
}

/// One call recorded by [`CollectorView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Message {
        id: MessageId,
        role: Role,
        text: String,
        streaming: bool,
    },
    Translation {
        id: MessageId,
        text: String,
    },
    Settled(MessageId),
    Status(UiStatus),
}

/// Headless view that records every call for inspection.
///
/// Clones share the same log, so a test can keep an observer handle while the
/// controller owns the view.
#[derive(Debug, Clone, Default)]
pub struct CollectorView {
    events: Arc<Mutex<Vec<ViewEvent>>>,
}

impl CollectorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded call, in order.
    pub fn events(&self) -> Vec<ViewEvent> {
        lock_unpoisoned(&self.events).clone()
    }

    /// Just the status transitions, in order.
    pub fn statuses(&self) -> Vec<UiStatus> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Status(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Just the message texts, in order of appearance.
    pub fn message_texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for CollectorView {
    fn message_added(&mut self, id: MessageId, role: Role, text: &str, streaming: bool) {
        lock_unpoisoned(&self.events).push(ViewEvent::Message {
            id,
            role,
            text: text.to_string(),
            streaming,
        });
    }

    fn translation_added(&mut self, id: MessageId, text: &str) {
        lock_unpoisoned(&self.events).push(ViewEvent::Translation {
            id,
            text: text.to_string(),
        });
    }

    fn message_settled(&mut self, id: MessageId) {
        lock_unpoisoned(&self.events).push(ViewEvent::Settled(id));
    }

    fn status_changed(&mut self, status: UiStatus) {
        lock_unpoisoned(&self.events).push(ViewEvent::Status(status));
    }
}
