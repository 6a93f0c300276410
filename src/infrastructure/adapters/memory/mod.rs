//! In-memory transport for embedding and tests

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatKind, Message, Update};
use crate::domain::traits::{BotInfo, Transport};

/// A message the runtime sent through the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub chat_id: String,
    pub text: String,
}

/// Records outgoing traffic; chats are classified by id prefix
/// (`group:` and `channel:`, anything else is private)
pub struct MemoryTransport {
    info: BotInfo,
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            info: BotInfo {
                id: id.into(),
                name: username.clone(),
                username,
            },
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

pub fn classify_by_prefix(chat_id: &str) -> ChatKind {
    if chat_id.starts_with("group:") {
        ChatKind::Group
    } else if chat_id.starts_with("channel:") {
        ChatKind::Channel
    } else {
        ChatKind::Private
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn start(&self, _updates: mpsc::Sender<Update>) -> Result<(), BotError> {
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        let id = format!("m{}", sent.len() + 1);
        sent.push(SentMessage {
            id: id.clone(),
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn delete_message(&self, _chat_id: &str, ids: &[String]) -> Result<(), BotError> {
        let mut deleted = self
            .deleted
            .lock()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        deleted.extend(ids.iter().cloned());
        Ok(())
    }

    fn classify_chat(&self, message: &Message) -> ChatKind {
        classify_by_prefix(&message.chat_id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
