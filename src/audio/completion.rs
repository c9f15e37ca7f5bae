//! Per-session playback completion signalling.
//!
//! Each playback session gets a fresh single-use slot; its [`PlaybackDone`]
//! handle resolves exactly once, either as completed (the last scheduled
//! sample actually finished rendering) or as cancelled (the session was
//! superseded before that point).

use tokio::sync::oneshot;

/// Sender half of the completion signal, owned by the scheduler.
#[derive(Debug, Default)]
pub(crate) struct CompletionSlot {
    tx: Option<oneshot::Sender<()>>,
}

impl CompletionSlot {
    /// Arms the slot for a new session, returning the awaitable handle.
    ///
    /// Any previously armed sender is dropped, so a stale handle from a
    /// superseded session resolves as cancelled rather than never.
    pub(crate) fn arm(&mut self) -> PlaybackDone {
        let (tx, rx) = oneshot::channel();
        self.tx = Some(tx);
        PlaybackDone { rx }
    }

    /// Fires the completion signal. Consumes the sender, so at most one fire
    /// per armed session; later calls are no-ops.
    pub(crate) fn fire(&mut self) {
        if let Some(tx) = self.tx.take() {
            // The receiver may already be dropped; nothing to do then.
            let _ = tx.send(());
        }
    }

    /// Cancels the armed session, if any. Its handle resolves as cancelled.
    pub(crate) fn cancel(&mut self) {
        self.tx = None;
    }

    /// True if a session is armed and has not yet fired or been cancelled.
    pub(crate) fn is_armed(&self) -> bool {
        self.tx.is_some()
    }
}

/// Awaitable handle to one playback session's completion.
#[derive(Debug)]
pub struct PlaybackDone {
    rx: oneshot::Receiver<()>,
}

impl PlaybackDone {
    /// Waits for the session to finish.
    ///
    /// Returns `true` when the last scheduled sample finished playing and
    /// `false` when the session was stopped or superseded first.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fire_resolves_as_completed() {
        let mut slot = CompletionSlot::default();
        let done = slot.arm();
        assert!(slot.is_armed());

        slot.fire();
        assert!(!slot.is_armed());
        assert!(done.wait().await);
    }

    #[tokio::test]
    async fn test_cancel_resolves_as_cancelled() {
        let mut slot = CompletionSlot::default();
        let done = slot.arm();

        slot.cancel();
        assert!(!done.wait().await);
    }

    #[tokio::test]
    async fn test_rearming_cancels_previous_session() {
        let mut slot = CompletionSlot::default();
        let first = slot.arm();
        let second = slot.arm();

        slot.fire();
        assert!(!first.wait().await);
        assert!(second.wait().await);
    }

    #[tokio::test]
    async fn test_fire_without_arm_is_noop() {
        let mut slot = CompletionSlot::default();
        slot.fire();
        assert!(!slot.is_armed());
    }

    #[tokio::test]
    async fn test_double_fire_is_noop() {
        let mut slot = CompletionSlot::default();
        let done = slot.arm();
        slot.fire();
        slot.fire();
        assert!(done.wait().await);
    }
}
