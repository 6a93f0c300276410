//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::memory::classify_by_prefix;
use crate::application::errors::BotError;
use crate::domain::entities::{ChatKind, Message, Update, User};
use crate::domain::traits::{BotInfo, Transport};

/// Console transport for local development.
///
/// Every stdin line becomes a new-message update. Lines starting with
/// `group> ` or `channel> ` are delivered to a group or channel chat.
pub struct ConsoleAdapter {
    info: BotInfo,
    user_id: String,
}

impl ConsoleAdapter {
    pub fn new(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: username.clone(),
                username,
            },
            user_id: user_id.into(),
        }
    }

    fn to_update(&self, line: &str) -> Update {
        let (chat_id, text) = if let Some(rest) = line.strip_prefix("group> ") {
            ("group:console", rest)
        } else if let Some(rest) = line.strip_prefix("channel> ") {
            ("channel:console", rest)
        } else {
            ("console", line)
        };
        let sender = User::new(self.user_id.clone()).with_username("console");
        Update::new_message(Message::from_text(chat_id, text).with_sender(sender))
    }
}

#[async_trait]
impl Transport for ConsoleAdapter {
    async fn start(&self, updates: mpsc::Sender<Update>) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if updates.send(self.to_update(line)).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        println!("[BOT -> {}] {}", chat_id, text);
        Ok(uuid::Uuid::new_v4().to_string())
    }

    async fn delete_message(&self, chat_id: &str, ids: &[String]) -> Result<(), BotError> {
        println!("[BOT -> {}] deleted {}", chat_id, ids.join(", "));
        Ok(())
    }

    fn classify_chat(&self, message: &Message) -> ChatKind {
        classify_by_prefix(&message.chat_id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_prefix_selects_chat() {
        let adapter = ConsoleAdapter::new("mybot", "7");
        let update = adapter.to_update("group> /ping");
        let message = update.message.unwrap();
        assert_eq!(message.chat_id, "group:console");
        assert_eq!(message.text.as_deref(), Some("/ping"));
        assert_eq!(message.sender_id(), Some("7"));
        assert_eq!(adapter.classify_chat(&message), ChatKind::Group);
    }
}
