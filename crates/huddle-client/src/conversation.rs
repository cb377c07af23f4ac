use std::collections::HashSet;

use chrono::{DateTime, Utc};

use huddle_types::models::{Group, Message};

use crate::error::ClientError;

/// Client-side handle for a message the user submitted.
pub type LocalId = u64;

/// Where a submitted message is on its way to the server. Composing is the
/// input buffer itself and has no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingState {
    /// Shown optimistically, request in flight.
    PendingSend,
    /// Server accepted it under `id`; the placeholder is gone from the
    /// timeline and the server row took its place.
    Committed { id: i64 },
    /// Server refused or the request failed; the text went back to the user.
    Reverted { error: String },
}

#[derive(Debug, Clone)]
pub struct Outgoing {
    pub local_id: LocalId,
    pub text: String,
    pub state: OutgoingState,
    pub submitted_at: DateTime<Utc>,
}

/// One line of the rendered conversation.
#[derive(Debug, Clone, Copy)]
pub enum TimelineEntry<'a> {
    Committed(&'a Message),
    Pending(&'a Outgoing),
}

/// Local view of one group: server history, in-flight sends and the input
/// buffer. Pure state; the network side lives in [`crate::SyncSession`].
///
/// Several sends may be in flight at once. Their final order is whatever
/// timestamps the server assigned, which `acknowledge` and `reconcile`
/// both respect.
#[derive(Debug, Default)]
pub struct Conversation {
    group: Option<Group>,
    history: Vec<Message>,
    outgoing: Vec<Outgoing>,
    input: String,
    stashed: Vec<String>,
    session_ended: bool,
    next_local_id: LocalId,
}

impl Conversation {
    pub fn new(group: Option<Group>, messages: Vec<Message>) -> Self {
        let mut conversation = Self {
            group,
            ..Self::default()
        };
        conversation.reconcile(messages);
        conversation
    }

    pub fn group(&self) -> Option<&Group> {
        self.group.as_ref()
    }

    /// Committed messages in server order.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn session_ended(&self) -> bool {
        self.session_ended
    }

    pub fn state(&self, local_id: LocalId) -> Option<&OutgoingState> {
        self.outgoing.iter().find(|o| o.local_id == local_id).map(|o| &o.state)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Outgoing> {
        self.outgoing.iter().filter(|o| o.state == OutgoingState::PendingSend)
    }

    /// Move the input into a pending send and clear it. Returns the handle and
    /// the exact text to post, or `None` when there is nothing to send.
    pub fn submit(&mut self) -> Option<(LocalId, String)> {
        if self.input.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        let local_id = self.next_local_id;
        self.next_local_id += 1;

        self.outgoing.push(Outgoing {
            local_id,
            text: text.clone(),
            state: OutgoingState::PendingSend,
            submitted_at: Utc::now(),
        });
        Some((local_id, text))
    }

    /// PendingSend → Committed. The server row replaces the placeholder.
    /// Returns false if `local_id` was not pending.
    pub fn acknowledge(&mut self, local_id: LocalId, message: Message) -> bool {
        let Some(entry) = self.pending_mut(local_id) else {
            return false;
        };
        entry.state = OutgoingState::Committed { id: message.id };
        self.insert_committed(message);
        true
    }

    /// PendingSend → Reverted. The original text goes back into the input if
    /// it is empty; otherwise it is stashed so nothing the user typed is lost.
    /// A 401 also ends the session.
    pub fn fail(&mut self, local_id: LocalId, error: &ClientError) -> bool {
        let Some(entry) = self.pending_mut(local_id) else {
            return false;
        };
        entry.state = OutgoingState::Reverted {
            error: error.to_string(),
        };
        let text = entry.text.clone();

        if self.input.is_empty() {
            self.input = text;
        } else {
            self.stashed.push(text);
        }

        if error.is_unauthorized() {
            self.session_ended = true;
        }
        true
    }

    /// Reverted texts that could not go back into a non-empty input, oldest
    /// first.
    pub fn take_stashed(&mut self) -> Vec<String> {
        std::mem::take(&mut self.stashed)
    }

    /// Replace history with a fresh server listing. Pending sends stay;
    /// committed sends the listing already carries are forgotten.
    pub fn reconcile(&mut self, mut messages: Vec<Message>) {
        messages.sort_by_key(Message::sort_key);
        messages.dedup_by_key(|m| m.id);

        let listed: HashSet<i64> = messages.iter().map(|m| m.id).collect();
        self.outgoing.retain(|o| match o.state {
            OutgoingState::Committed { id } => !listed.contains(&id),
            _ => true,
        });
        self.history = messages;
    }

    pub fn set_group(&mut self, group: Option<Group>) {
        self.group = group;
    }

    /// History followed by pending placeholders in submit order.
    pub fn timeline(&self) -> Vec<TimelineEntry<'_>> {
        self.history
            .iter()
            .map(TimelineEntry::Committed)
            .chain(self.pending().map(TimelineEntry::Pending))
            .collect()
    }

    pub(crate) fn end_session(&mut self) {
        self.session_ended = true;
    }

    fn pending_mut(&mut self, local_id: LocalId) -> Option<&mut Outgoing> {
        self.outgoing
            .iter_mut()
            .find(|o| o.local_id == local_id && o.state == OutgoingState::PendingSend)
    }

    fn insert_committed(&mut self, message: Message) {
        if self.history.iter().any(|m| m.id == message.id) {
            return;
        }
        let key = message.sort_key();
        let at = self.history.partition_point(|m| m.sort_key() <= key);
        self.history.insert(at, message);
    }
}
