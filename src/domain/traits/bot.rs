use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatKind, Message, Update};

/// Transport trait - abstraction for the chat platform client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start receiving platform events and push them into `updates`
    async fn start(&self, updates: mpsc::Sender<Update>) -> Result<(), BotError>;

    /// Send a text message to a chat, returning the platform message id
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError>;

    /// Delete messages from a chat
    async fn delete_message(&self, chat_id: &str, ids: &[String]) -> Result<(), BotError>;

    /// Classify the chat a message belongs to
    fn classify_chat(&self, message: &Message) -> ChatKind;

    /// Identity of the account the runtime operates as
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
