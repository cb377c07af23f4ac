use std::future::Future;

use tracing::{info, warn};

use huddle_types::models::Message;

use crate::client::ChatClient;
use crate::conversation::{Conversation, LocalId};
use crate::error::ClientError;

/// What the chat screen should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Initial fetch still running; render a spinner, not an empty chat.
    Loading,
    Ready,
    /// The session is over; go back to the sign-in entry point.
    SignedOut,
    /// Initial fetch failed for a reason other than auth.
    Failed(String),
}

/// Drives one group's [`Conversation`] against the server.
pub struct SyncSession {
    client: ChatClient,
    group_id: i64,
    conversation: Conversation,
    view: ViewState,
}

impl SyncSession {
    pub fn new(client: ChatClient, group_id: i64) -> Self {
        Self {
            client,
            group_id,
            conversation: Conversation::default(),
            view: ViewState::Loading,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    /// Fetch group metadata and history concurrently. The view only leaves
    /// `Loading` once both have finished.
    pub async fn load(&mut self) -> &ViewState {
        self.view = ViewState::Loading;

        let (group, messages) = tokio::join!(
            self.client.group(self.group_id),
            self.client.messages(self.group_id)
        );

        match group.and_then(|group| messages.map(|messages| (group, messages))) {
            Ok((group, messages)) => {
                info!("Loaded group {} with {} messages", self.group_id, messages.len());
                self.conversation.set_group(group);
                self.conversation.reconcile(messages);
                self.view = ViewState::Ready;
            }
            Err(e) => self.on_error(&e),
        }
        &self.view
    }

    /// Re-read history and adopt the server's order.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.client.messages(self.group_id).await {
            Ok(messages) => {
                self.conversation.reconcile(messages);
                Ok(())
            }
            Err(e) => {
                self.on_error(&e);
                Err(e)
            }
        }
    }

    /// Submit the current input and wait for the server. `None` when the
    /// input was blank. On failure the input holds the text again.
    pub async fn send(&mut self) -> Option<Result<Message, ClientError>> {
        let (local_id, post) = self.begin_send()?;
        let result = post.await;
        Some(self.complete(local_id, result))
    }

    /// Move the input into a pending send and hand back the request without
    /// awaiting it. The future owns its own client handle, so several can be
    /// in flight while the session keeps taking input. Feed each result to
    /// [`SyncSession::complete`].
    pub fn begin_send(
        &mut self,
    ) -> Option<(LocalId, impl Future<Output = Result<Message, ClientError>> + Send + use<>)> {
        let (local_id, text) = self.conversation.submit()?;
        let client = self.client.clone();
        let group_id = self.group_id;

        let post = async move { client.post_message(group_id, &text).await };
        Some((local_id, post))
    }

    /// Settle a send started with [`SyncSession::begin_send`]. Results may
    /// arrive in any order; history stays in server order regardless.
    pub fn complete(
        &mut self,
        local_id: LocalId,
        result: Result<Message, ClientError>,
    ) -> Result<Message, ClientError> {
        match result {
            Ok(message) => {
                self.conversation.acknowledge(local_id, message.clone());
                Ok(message)
            }
            Err(e) => {
                warn!("Send failed: {}", e);
                self.conversation.fail(local_id, &e);
                if e.is_unauthorized() {
                    self.sign_out();
                }
                Err(e)
            }
        }
    }

    pub fn sign_out(&mut self) {
        self.client.logout();
        self.conversation.end_session();
        self.view = ViewState::SignedOut;
    }

    fn on_error(&mut self, e: &ClientError) {
        if e.is_unauthorized() {
            self.sign_out();
        } else {
            warn!("Sync error for group {}: {}", self.group_id, e);
            if self.view == ViewState::Loading {
                self.view = ViewState::Failed(e.to_string());
            }
        }
    }
}
