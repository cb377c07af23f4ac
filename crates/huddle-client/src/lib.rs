//! Client side of the group chat: a typed HTTP client plus the optimistic
//! send state machine a chat view is driven by.

pub mod client;
pub mod conversation;
pub mod error;
pub mod session;

pub use client::{ChatClient, Session};
pub use conversation::{Conversation, LocalId, OutgoingState, TimelineEntry};
pub use error::ClientError;
pub use session::{SyncSession, ViewState};
