use tokio::sync::mpsc;

use crate::common::{
    ChatMessage, ChatPeer, ChatSummary, ClientCommand, ClientEvent, OutgoingMessage, User,
};
use crate::error::{ClientError, ClientResult};
use crate::storage::SessionStore;

use super::realtime::{RealtimeChannel, channel_url};
use super::rest::RestClient;

const COMPLETION_CAPACITY: usize = 16;

/// Results of background requests that must be folded back into session state.
#[derive(Debug)]
enum Completion {
    CurrentUser(User),
    History {
        chat_id: i64,
        messages: Vec<ChatMessage>,
    },
}

/// A single REST round trip detached from the session, so that a slow request only
/// holds up its own caller.
#[derive(Clone)]
struct Request {
    rest: RestClient,
    token: Option<String>,
    events: mpsc::Sender<ClientEvent>,
}

impl Request {
    async fn notify(&self, event: ClientEvent) {
        if let Err(err) = self.events.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }

    async fn current_user(self) -> ClientResult<User> {
        let user = self.rest.current_user(self.token.as_deref()).await?;
        log::info!("Loaded current user {} ({})", user.name, user.id);
        Ok(user)
    }

    async fn chats(self) -> ClientResult<Vec<ChatSummary>> {
        let chats = self.rest.chats(self.token.as_deref()).await?;
        log::info!("Loaded {} chats", chats.len());
        self.notify(ClientEvent::ChatsLoaded(chats.clone())).await;
        Ok(chats)
    }

    async fn history(self, chat_id: i64) -> ClientResult<Vec<ChatMessage>> {
        let messages = self.rest.messages(self.token.as_deref(), chat_id).await?;
        log::debug!("Loaded {} messages for chat {chat_id}", messages.len());
        Ok(messages)
    }

    async fn send(self, outgoing: OutgoingMessage) -> ClientResult<ChatMessage> {
        let chat_id = outgoing.chat_id;
        let result = self.rest.send_message(self.token.as_deref(), &outgoing).await;

        match &result {
            Ok(message) => log::info!("Message {} sent to chat {chat_id}", message.id),
            Err(err) => log::error!("Failed to send message to chat {chat_id}: {err}"),
        }
        self.notify(ClientEvent::SendSettled {
            delivered: result.is_ok(),
        })
        .await;
        result
    }

    /// Server-side user search. `exclude` (the current user) is filtered out of the results.
    async fn search(self, query: String, exclude: Option<i64>) -> ClientResult<Vec<User>> {
        let mut users = self.rest.search_users(self.token.as_deref(), &query).await?;
        if let Some(me) = exclude {
            users.retain(|user| user.id != me);
        }
        log::debug!("Search `{query}` matched {} users", users.len());
        self.notify(ClientEvent::SearchResults(users.clone())).await;
        Ok(users)
    }
}

/// Owns everything the UI must not touch directly: the REST client, the session
/// store, the current user and chat, and the single open realtime channel.
pub struct ChatSession {
    rest: RestClient,
    store: SessionStore,
    ws_base: String,
    event_sender: mpsc::Sender<ClientEvent>,
    current_user: Option<User>,
    current_chat: Option<ChatPeer>,
    channel: Option<RealtimeChannel>,
}

impl ChatSession {
    pub fn new(
        rest: RestClient,
        store: SessionStore,
        ws_base: String,
        event_sender: mpsc::Sender<ClientEvent>,
    ) -> Self {
        let current_user = match store.current_user() {
            Ok(user) => user,
            Err(err) => {
                log::warn!("Ignoring cached current user: {err}");
                None
            }
        };
        Self {
            rest,
            store,
            ws_base,
            event_sender,
            current_user,
            current_chat: None,
            channel: None,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    #[cfg(test)]
    pub fn current_chat(&self) -> Option<&ChatPeer> {
        self.current_chat.as_ref()
    }

    #[cfg(test)]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Process commands until the UI drops its sender, then close the channel.
    ///
    /// REST requests run as their own tasks and report back through a completion
    /// channel. Only the channel swap of a chat selection is awaited in the loop.
    pub async fn run(mut self, mut command_receiver: mpsc::Receiver<ClientCommand>) {
        log::info!("Session loop started");
        if let Some(user) = self.current_user.clone() {
            self.emit(ClientEvent::CurrentUserLoaded(user)).await;
        }

        let (completion_sender, mut completion_receiver) = mpsc::channel(COMPLETION_CAPACITY);
        loop {
            tokio::select! {
                command = command_receiver.recv() => match command {
                    Some(command) => self.handle_command(command, &completion_sender).await,
                    None => break,
                },
                Some(completion) = completion_receiver.recv() => {
                    self.apply_completion(completion).await;
                }
            }
        }

        self.shutdown().await;
        log::info!("Session loop stopped");
    }

    async fn handle_command(
        &mut self,
        command: ClientCommand,
        completions: &mpsc::Sender<Completion>,
    ) {
        let result = match command {
            ClientCommand::LoadCurrentUser => {
                let request = self.request();
                let completions = completions.clone();
                tokio::spawn(async move {
                    match request.current_user().await {
                        Ok(user) => forward(&completions, Completion::CurrentUser(user)).await,
                        Err(err) => log::error!("Failed to load current user: {err}"),
                    }
                });
                Ok(())
            }
            ClientCommand::LoadChats => {
                let request = self.request();
                tokio::spawn(async move {
                    if let Err(err) = request.chats().await {
                        log::error!("Failed to load chats: {err}");
                    }
                });
                Ok(())
            }
            ClientCommand::SelectChat(peer) => {
                let chat_id = peer.id;
                self.swap_channel(peer).await;
                let request = self.request();
                let completions = completions.clone();
                tokio::spawn(async move {
                    match request.history(chat_id).await {
                        Ok(messages) => {
                            forward(&completions, Completion::History { chat_id, messages }).await
                        }
                        Err(err) => {
                            log::error!("Failed to load messages for chat {chat_id}: {err}")
                        }
                    }
                });
                Ok(())
            }
            ClientCommand::SendMessage(text) => self.outgoing(&text).map(|outgoing| {
                let request = self.request();
                tokio::spawn(async move {
                    // The outcome is already logged and reported as `SendSettled`.
                    let _ = request.send(outgoing).await;
                });
            }),
            ClientCommand::SearchUsers(query) => {
                let request = self.request();
                let exclude = self.current_user.as_ref().map(|user| user.id);
                tokio::spawn(async move {
                    if let Err(err) = request.search(query, exclude).await {
                        log::error!("User search failed: {err}");
                    }
                });
                Ok(())
            }
            ClientCommand::MarkRead(message_id) => self.mark_read(message_id).await,
        };

        match result {
            Ok(()) => {}
            Err(ClientError::NotAuthenticated) => {
                log::error!("No current user; login required");
                self.emit(ClientEvent::AuthRequired).await;
            }
            Err(err) if err.is_precondition() => {
                log::error!("Command rejected: {err}");
                self.emit(ClientEvent::Notice(err.to_string())).await;
            }
            Err(err) => log::error!("Command failed: {err}"),
        }
    }

    async fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::CurrentUser(user) => self.adopt_current_user(user).await,
            Completion::History { chat_id, messages } => {
                self.adopt_history(chat_id, messages).await
            }
        }
    }

    async fn emit(&mut self, event: ClientEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }

    fn token(&self) -> Option<String> {
        match self.store.token() {
            Ok(token) => token,
            Err(err) => {
                log::error!("Failed to read bearer token: {err}");
                None
            }
        }
    }

    fn request(&self) -> Request {
        Request {
            rest: self.rest.clone(),
            token: self.token(),
            events: self.event_sender.clone(),
        }
    }

    /// Fetch the current user and cache it. On failure the cached user is kept.
    pub async fn load_current_user(&mut self) -> ClientResult<User> {
        let user = self.request().current_user().await?;
        self.adopt_current_user(user.clone()).await;
        Ok(user)
    }

    async fn adopt_current_user(&mut self, user: User) {
        if let Err(err) = self.store.set_current_user(&user) {
            log::warn!("Failed to cache current user: {err}");
        }
        self.current_user = Some(user.clone());
        self.emit(ClientEvent::CurrentUserLoaded(user)).await;
    }

    pub async fn load_chats(&mut self) -> ClientResult<Vec<ChatSummary>> {
        self.request().chats().await
    }

    /// Switch chats: record it, reset the view, replace the channel, then load history.
    /// The steps are not transactional; a failed history load leaves the new channel open.
    pub async fn select_chat(&mut self, peer: ChatPeer) -> ClientResult<()> {
        let chat_id = peer.id;
        self.swap_channel(peer).await;
        if let Err(err) = self.load_messages_for_chat(chat_id).await {
            log::error!("Failed to load messages for chat {chat_id}: {err}");
        }
        Ok(())
    }

    /// Record the chat, then close the previous channel before opening the new one.
    async fn swap_channel(&mut self, peer: ChatPeer) {
        let chat_id = peer.id;
        log::info!("Selecting chat {chat_id} ({})", peer.name);
        self.current_chat = Some(peer.clone());
        self.emit(ClientEvent::ChatSelected(peer)).await;

        if let Some(previous) = self.channel.take() {
            log::info!("Closing realtime channel for chat {}", previous.chat_id());
            previous.close().await;
        }

        let Some(user_id) = self.current_user.as_ref().map(|user| user.id) else {
            log::warn!("No current user; chat {chat_id} opened without realtime channel");
            return;
        };
        let url = channel_url(&self.ws_base, chat_id, user_id);
        match RealtimeChannel::open(&url, chat_id, self.event_sender.clone()).await {
            Ok(channel) => self.channel = Some(channel),
            Err(err) => log::error!("Realtime channel for chat {chat_id} unavailable: {err}"),
        }
    }

    /// Fetch a chat's history and refresh its cached snapshot.
    pub async fn load_messages_for_chat(
        &mut self,
        chat_id: i64,
    ) -> ClientResult<Vec<ChatMessage>> {
        let messages = self.request().history(chat_id).await?;
        self.adopt_history(chat_id, messages.clone()).await;
        Ok(messages)
    }

    async fn adopt_history(&mut self, chat_id: i64, messages: Vec<ChatMessage>) {
        if let Err(err) = self.store.save_messages(chat_id, &messages) {
            log::warn!("Failed to cache messages for chat {chat_id}: {err}");
        }
        self.emit(ClientEvent::HistoryLoaded { chat_id, messages }).await;
    }

    /// Check the send preconditions. Nothing touches the network until they hold.
    fn outgoing(&self, text: &str) -> ClientResult<OutgoingMessage> {
        let sender_id = self
            .current_user
            .as_ref()
            .map(|user| user.id)
            .ok_or(ClientError::NotAuthenticated)?;
        let recipient_id = self
            .current_chat
            .as_ref()
            .map(|chat| chat.id)
            .ok_or(ClientError::NoChatSelected)?;
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        if sender_id == recipient_id {
            return Err(ClientError::SelfMessage);
        }

        Ok(OutgoingMessage {
            content: text.to_string(),
            chat_id: recipient_id,
            sender_id,
            recipient_id,
        })
    }

    /// Validate, then POST.
    pub async fn send_message(&mut self, text: &str) -> ClientResult<ChatMessage> {
        let outgoing = self.outgoing(text)?;
        self.request().send(outgoing).await
    }

    pub async fn search_users(&mut self, query: &str) -> ClientResult<Vec<User>> {
        let exclude = self.current_user.as_ref().map(|user| user.id);
        self.request().search(query.to_string(), exclude).await
    }

    pub async fn mark_read(&mut self, message_id: i64) -> ClientResult<()> {
        match self.channel.as_mut() {
            Some(channel) => channel.mark_read(message_id).await,
            None => {
                log::debug!("No open channel; read receipt for {message_id} skipped");
                Ok(())
            }
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
    }
}

async fn forward(completions: &mpsc::Sender<Completion>, completion: Completion) {
    if let Err(err) = completions.send(completion).await {
        log::warn!("Session stopped before a request completed: {err}");
    }
}
