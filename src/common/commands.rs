use super::types::ChatPeer;

/// Commands the UI sends down to the session task.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    LoadCurrentUser,
    LoadChats,
    /// Switch the active chat: close the old channel, open a new one, load history.
    SelectChat(ChatPeer),
    /// Send the input text to the selected chat.
    SendMessage(String),
    /// Server-side user search (Enter in the search box).
    SearchUsers(String),
    /// Read receipt for a message in the selected chat.
    MarkRead(i64),
}
