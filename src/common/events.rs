use super::types::{ChannelState, ChatMessage, ChatPeer, ChatSummary, User};

/// Events from the session task and the realtime channel up to the UI.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    CurrentUserLoaded(User),
    ChatsLoaded(Vec<ChatSummary>),
    ChatSelected(ChatPeer),
    HistoryLoaded {
        chat_id: i64,
        messages: Vec<ChatMessage>,
    },
    MessageReceived {
        chat_id: i64,
        message: ChatMessage,
    },
    MessageEdited {
        chat_id: i64,
        message: ChatMessage,
    },
    MessageDeleted {
        chat_id: i64,
        message_id: i64,
    },
    MessageRead {
        chat_id: i64,
        message_id: i64,
        read_by: Option<i64>,
    },
    ChannelStatus {
        chat_id: i64,
        state: ChannelState,
    },
    /// The send request finished, successfully or not. The input is cleared either way.
    SendSettled {
        delivered: bool,
    },
    SearchResults(Vec<User>),
    /// Sending requires a logged-in user.
    AuthRequired,
    Notice(String),
}
