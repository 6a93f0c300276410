use super::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of chat a message arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Channel => "channel",
        }
    }
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of inbound platform event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    NewMessage,
    EditedMessage,
    DeletedMessage,
    CallbackQuery,
    Other(String),
}

impl UpdateKind {
    pub fn as_str(&self) -> &str {
        match self {
            UpdateKind::NewMessage => "new_message",
            UpdateKind::EditedMessage => "edited_message",
            UpdateKind::DeletedMessage => "deleted_message",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "new_message" => UpdateKind::NewMessage,
            "edited_message" => UpdateKind::EditedMessage,
            "deleted_message" => UpdateKind::DeletedMessage,
            "callback_query" => UpdateKind::CallbackQuery,
            other => UpdateKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message carried by an update
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender: Option<User>,
    pub text: Option<String>,
    /// Caption of a media message
    pub caption: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub raw: Option<serde_json::Value>,
}

impl Message {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender: None,
            text: None,
            caption: None,
            timestamp: Utc::now(),
            raw: None,
        }
    }

    pub fn from_text(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut msg = Self::new(chat_id);
        msg.text = Some(text.into());
        msg
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.sender = Some(user);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Text a command may be parsed from: the body, or the caption of a media message
    pub fn command_text(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|u| u.id.as_str())
    }
}

/// An inbound platform event
#[derive(Debug, Clone)]
pub struct Update {
    pub id: String,
    pub kind: UpdateKind,
    pub message: Option<Message>,
    pub raw: Option<serde_json::Value>,
}

impl Update {
    pub fn new(kind: UpdateKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            message: None,
            raw: None,
        }
    }

    pub fn new_message(message: Message) -> Self {
        let mut update = Self::new(UpdateKind::NewMessage);
        update.message = Some(message);
        update
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}
