//! One chat conversation kept current from the push channel.
//!
//! `ChatRoom` holds a subscription on the chat channel for its lifetime.
//! A `MessageSent` event invalidates the cached conversation and refetches;
//! sending does the same once the post settles.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::sync::Arc;

use events::Envelope;
use tracing::{debug, info};

use crate::net::ApiClient;
use crate::net::error::ApiError;
use crate::net::push::{CHAT_CHANNEL, MESSAGE_SENT_EVENT, PushHub, Subscription};
use crate::net::types::{ApiResponse, ChatMessage};
use crate::validation::forms::MessageForm;
use crate::validation::{Validate, Violations};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Invalid(#[from] Violations),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("chat channel closed")]
    ChannelClosed,
}

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn messages(&self, recipient_id: i64) -> Result<Vec<ChatMessage>, ApiError>;
    async fn send_message(&self, recipient_id: i64, form: &MessageForm) -> Result<ApiResponse, ApiError>;
    fn invalidate_messages(&self);
}

#[async_trait::async_trait]
impl ChatGateway for ApiClient {
    async fn messages(&self, recipient_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        ApiClient::messages(self, recipient_id).await
    }

    async fn send_message(&self, recipient_id: i64, form: &MessageForm) -> Result<ApiResponse, ApiError> {
        ApiClient::send_message(self, recipient_id, form).await
    }

    fn invalidate_messages(&self) {
        ApiClient::invalidate_messages(self);
    }
}

pub struct ChatRoom {
    recipient_id: i64,
    gateway: Arc<dyn ChatGateway>,
    incoming: Subscription,
    messages: Vec<ChatMessage>,
}

impl ChatRoom {
    #[must_use]
    pub fn new(recipient_id: i64, gateway: Arc<dyn ChatGateway>, hub: &PushHub) -> Self {
        Self { recipient_id, gateway, incoming: hub.subscribe(CHAT_CHANNEL), messages: Vec::new() }
    }

    #[must_use]
    pub fn recipient_id(&self) -> i64 {
        self.recipient_id
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Fetch the conversation.
    ///
    /// # Errors
    ///
    /// The list call failing; the previous messages are kept.
    pub async fn refresh(&mut self) -> Result<&[ChatMessage], ChatError> {
        self.messages = self.gateway.messages(self.recipient_id).await?;
        debug!(recipient = self.recipient_id, count = self.messages.len(), "conversation loaded");
        Ok(&self.messages)
    }

    /// Post a message and reload the conversation.
    ///
    /// # Errors
    ///
    /// [`ChatError::Invalid`] for blank content (nothing is sent), the post
    /// failing, or the backend rejecting it.
    pub async fn send(&mut self, content: &str) -> Result<ApiResponse, ChatError> {
        let form = MessageForm::new(content.trim());
        form.validate()?;
        let response = self.gateway.send_message(self.recipient_id, &form).await?.accepted()?;
        info!(recipient = self.recipient_id, "chat message sent");
        self.refresh().await?;
        Ok(response)
    }

    /// React to one push envelope. Returns whether the conversation was
    /// reloaded.
    ///
    /// # Errors
    ///
    /// The reload failing.
    pub async fn handle_push(&mut self, envelope: &Envelope) -> Result<bool, ChatError> {
        if !envelope.is_event(CHAT_CHANNEL, MESSAGE_SENT_EVENT) {
            return Ok(false);
        }
        self.gateway.invalidate_messages();
        self.refresh().await?;
        Ok(true)
    }

    /// Wait for the next `MessageSent` and reload.
    ///
    /// # Errors
    ///
    /// [`ChatError::ChannelClosed`] when the subscription ends, or the
    /// reload failing.
    pub async fn next_update(&mut self) -> Result<&[ChatMessage], ChatError> {
        let envelope = self
            .incoming
            .next_event(MESSAGE_SENT_EVENT)
            .await
            .ok_or(ChatError::ChannelClosed)?;
        self.handle_push(&envelope).await?;
        Ok(&self.messages)
    }
}
