//! Interaction state machine and its rendering seam.

pub mod controller;
pub mod view;

pub use controller::{InteractionId, SessionController};
pub use view::{ChatView, CollectorView, MessageId, Role, UiStatus, ViewEvent};
