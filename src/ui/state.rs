use chrono::{DateTime, Utc};

use crate::common::{ChannelState, ChatPeer, ClientCommand, ClientEvent, User};

use super::chat_list::ChatList;
use super::render::{Direction, MessagePane};

const MAX_ACTIVITY: usize = 100;

/// Connection and session notices shown in the activity panel.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: &'static str,
    pub message: String,
}

/// Local UI state.
#[derive(Default)]
pub struct AppState {
    pub current_user: Option<User>,
    pub chats: ChatList,
    pub search_input: String,
    pub search_results: Vec<User>,
    pub current_chat: Option<ChatPeer>,
    pub pane: MessagePane,
    pub input_text: String,
    pub channel_state: Option<ChannelState>,
    pub notice: Option<String>,
    pub activity: Vec<ActivityEvent>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_user_id(&self) -> Option<i64> {
        self.current_user.as_ref().map(|user| user.id)
    }

    fn is_current(&self, chat_id: i64) -> bool {
        self.current_chat.as_ref().is_some_and(|chat| chat.id == chat_id)
    }

    /// Apply one event. Events for a chat other than the selected one are dropped.
    /// Returns a follow-up command when a freshly received message should be marked read.
    pub fn apply_event(&mut self, event: ClientEvent) -> Option<ClientCommand> {
        match event {
            ClientEvent::CurrentUserLoaded(user) => {
                self.add_activity("USER", format!("Logged in as {}", user.name));
                self.current_user = Some(user);
            }
            ClientEvent::ChatsLoaded(chats) => self.chats.set_chats(chats),
            ClientEvent::ChatSelected(peer) => {
                self.current_chat = Some(peer);
                self.pane.clear();
                self.channel_state = None;
                self.notice = None;
            }
            ClientEvent::HistoryLoaded { chat_id, messages } => {
                if !self.is_current(chat_id) {
                    log::debug!("Dropping stale history for chat {chat_id}");
                    return None;
                }
                let me = self.current_user_id();
                self.pane.replace_all(&messages, me);
            }
            ClientEvent::MessageReceived { chat_id, message } => {
                if !self.is_current(chat_id) {
                    log::debug!("Dropping message {} for inactive chat {chat_id}", message.id);
                    return None;
                }
                let me = self.current_user_id();
                let unread_from_peer = Direction::of(&message, me) == Direction::Received
                    && message.read_by.is_empty();
                if self.pane.display(&message, me) && unread_from_peer {
                    return Some(ClientCommand::MarkRead(message.id));
                }
            }
            ClientEvent::MessageEdited { chat_id, message } => {
                if self.is_current(chat_id) {
                    self.pane.apply_edit(&message);
                }
            }
            ClientEvent::MessageDeleted {
                chat_id,
                message_id,
            } => {
                if self.is_current(chat_id) {
                    self.pane.remove(message_id);
                }
            }
            ClientEvent::MessageRead {
                chat_id,
                message_id,
                ..
            } => {
                if self.is_current(chat_id) {
                    self.pane.mark_read(message_id);
                }
            }
            ClientEvent::ChannelStatus { chat_id, state } => {
                self.add_activity("CHANNEL", format!("Chat {chat_id}: {state:?}"));
                if self.is_current(chat_id) {
                    self.channel_state = Some(state);
                }
            }
            ClientEvent::SendSettled { delivered } => {
                self.input_text.clear();
                if !delivered {
                    self.add_activity("SEND", "Message was not delivered".to_string());
                }
            }
            ClientEvent::SearchResults(users) => self.search_results = users,
            ClientEvent::AuthRequired => {
                self.notice = Some(
                    "User not found. Log in and store the token with `set-token`.".to_string(),
                );
            }
            ClientEvent::Notice(text) => self.notice = Some(text),
        }
        None
    }

    pub fn add_activity(&mut self, kind: &'static str, message: String) {
        self.activity.push(ActivityEvent {
            timestamp: Utc::now(),
            kind,
            message,
        });

        if self.activity.len() > MAX_ACTIVITY {
            self.activity.remove(0);
        }
    }
}
