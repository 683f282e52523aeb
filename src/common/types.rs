use serde::{Deserialize, Serialize};

/// A user as returned by the auth service and cached under `currentUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A chat message. `id` is the identity key; `created_at` is often absent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<i64>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub read_by: Vec<i64>,
}

/// Row of the chat list (`GET /bittalk-mes/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub last_message_content: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The peer of a 1:1 chat. Its id doubles as the chat id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPeer {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&ChatSummary> for ChatPeer {
    fn from(chat: &ChatSummary) -> Self {
        Self {
            id: chat.id,
            name: chat.name.clone(),
            avatar: chat.avatar.clone(),
        }
    }
}

impl From<&User> for ChatPeer {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Body of `POST /bittalk-mes/messages/`.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub content: String,
    pub chat_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}
