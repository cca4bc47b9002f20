//! Contact-form message repository.
//!
//! Append-only, last write wins, nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;

/// A stored contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Message {
    /// Append time in epoch milliseconds, strictly increasing.
    pub id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Fields submitted by the contact form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NewMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl NewMessage {
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when any field is blank.
    pub fn validate(&self) -> Result<(), Error> {
        if [&self.name, &self.email, &self.message].iter().any(|f| f.trim().is_empty()) {
            return Err(Error::InvalidInput("Missing required fields".into()));
        }
        Ok(())
    }
}

/// Response envelope used by the contact endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, message: None, data: Some(data), error: None }
    }

    pub fn saved(data: T) -> Self {
        Self { success: true, message: Some("Message saved successfully".into()), data: Some(data), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message: None, data: None, error: Some(error.into()) }
    }
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn list_messages(&self) -> Result<Vec<Message>, Error>;

    async fn append_message(&self, new: NewMessage) -> Result<Message, Error>;
}

/// In-process repository.
#[derive(Debug, Default)]
pub struct InMemoryMessages {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessages {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessages {
    async fn list_messages(&self) -> Result<Vec<Message>, Error> {
        Ok(self.messages.read().await.clone())
    }

    async fn append_message(&self, new: NewMessage) -> Result<Message, Error> {
        new.validate()?;

        let mut messages = self.messages.write().await;
        let timestamp = Utc::now();
        let id = match messages.last() {
            Some(last) if last.id >= timestamp.timestamp_millis() => last.id + 1,
            _ => timestamp.timestamp_millis(),
        };

        let message = Message { id, name: new.name, email: new.email, message: new.message, timestamp };
        messages.push(message.clone());
        tracing::debug!(id, total = messages.len(), "message stored");
        Ok(message)
    }
}
