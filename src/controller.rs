use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ChatConfig;
use crate::error::{PermissionDenied, Result};
use crate::image::ImagePicker;
use crate::message::{
    generate_chat_title_with_limit, new_bot_reply, new_error_message, new_typing_indicator,
    new_user_message,
};
use crate::models::{ChatSession, ImageReference, Message, OutboundRequest};
use crate::parser::parse_bot_response;
use crate::sessions::SessionStore;
use crate::text::generate_id;
use crate::transport::ChatTransport;

/// Result of one call to [`ChatController::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to send; state untouched
    Rejected,
    /// Backend replied and a bot message was appended
    Replied,
    /// Exchange failed and an error message was appended
    Failed,
}

/// Conversation owned by a controller. Messages are append-only in display order.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    pending_input: String,
    pending_image: Option<ImageReference>,
}

impl ConversationState {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn pending_image(&self) -> Option<&ImageReference> {
        self.pending_image.as_ref()
    }
}

/// One in-flight exchange. Holds the loading flag and, when enabled, the typing
/// placeholder; both are cleared on drop, including when the exchange is cancelled.
struct Exchange<'a> {
    state: &'a mut ConversationState,
    loading: &'a watch::Sender<bool>,
}

impl<'a> Exchange<'a> {
    fn begin(
        state: &'a mut ConversationState,
        loading: &'a watch::Sender<bool>,
        show_typing: bool,
    ) -> Self {
        loading.send_replace(true);
        if show_typing {
            state.messages.push(new_typing_indicator());
        }
        Self { state, loading }
    }

    fn clear_typing(&mut self) {
        self.state.messages.retain(|m| !m.is_typing());
    }

    /// Replace the placeholder with the final reply or error message.
    fn finish(&mut self, message: Message) {
        self.clear_typing();
        self.state.messages.push(message);
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        self.clear_typing();
        self.loading.send_replace(false);
    }
}

/// Sequences user input, the backend call and conversation updates.
///
/// `submit` takes `&mut self`, so at most one exchange is in flight per
/// conversation. The loading flag is published on a watch channel for the
/// presentation layer.
pub struct ChatController {
    transport: Arc<dyn ChatTransport>,
    settings: ChatConfig,
    state: ConversationState,
    loading: watch::Sender<bool>,
    session_id: String,
    created_at: DateTime<Utc>,
}

impl ChatController {
    pub fn new(transport: Arc<dyn ChatTransport>, settings: ChatConfig) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            transport,
            settings,
            state: ConversationState::default(),
            loading,
            session_id: generate_id(),
            created_at: Utc::now(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.pending_input = text.into();
    }

    pub fn set_image(&mut self, image: Option<ImageReference>) {
        self.state.pending_image = image;
    }

    /// Ask the picker for a photo. A cancelled pick leaves the current selection alone.
    pub fn attach_image(
        &mut self,
        picker: &dyn ImagePicker,
    ) -> std::result::Result<bool, PermissionDenied> {
        match picker.pick()? {
            Some(image) => {
                tracing::debug!("Attached image {}", image);
                self.state.pending_image = Some(image);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.state.pending_input.trim().is_empty() || self.state.pending_image.is_some()
    }

    /// Send the pending input and image as one turn.
    ///
    /// Transport failures end up as an error message in the conversation;
    /// nothing is returned to the caller beyond the outcome.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.can_submit() {
            tracing::debug!("Ignoring empty submission");
            return SubmitOutcome::Rejected;
        }

        let text = std::mem::take(&mut self.state.pending_input);
        let image = self.state.pending_image.take();
        self.state
            .messages
            .push(new_user_message(text.clone(), image.clone()));

        let mut exchange = Exchange::begin(
            &mut self.state,
            &self.loading,
            self.settings.show_typing_indicator,
        );

        let request = OutboundRequest {
            message: text,
            image,
        };
        let result = self.transport.send(&request).await;

        match result {
            Ok(reply) => {
                let parsed = parse_bot_response(&reply.response);
                if parsed.has_structured_data() {
                    tracing::debug!("Reply carried structured data");
                }
                exchange.finish(new_bot_reply(parsed));
                SubmitOutcome::Replied
            }
            Err(e) => {
                tracing::error!("Chat exchange failed: {}", e);
                exchange.finish(new_error_message(Some(&self.settings.error_message)));
                SubmitOutcome::Failed
            }
        }
    }

    /// Snapshot of the conversation, titled after its first user message.
    pub fn to_session(&self) -> ChatSession {
        let first = self
            .state
            .messages
            .iter()
            .find(|m| m.is_user())
            .map(Message::text);

        ChatSession {
            id: self.session_id.clone(),
            title: generate_chat_title_with_limit(first, self.settings.title_max_length),
            messages: self
                .state
                .messages
                .iter()
                .filter(|m| !m.is_typing())
                .cloned()
                .collect(),
            created_at: self.created_at,
        }
    }

    pub async fn save_session(&self, store: &dyn SessionStore) -> Result<ChatSession> {
        let session = self.to_session();
        store.save_session(&session).await?;
        Ok(session)
    }
}
