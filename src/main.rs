mod common;
mod config;
mod error;
mod network;
mod storage;
mod ui;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use common::{ChatMessage, ChatPeer, ClientCommand, ClientEvent};
use config::AppConfig;
use error::ClientResult;
use network::{ChatSession, RestClient};
use storage::SessionStore;
use ui::ChatApp;
use ui::render::{Direction, MessagePane};

#[derive(Parser)]
#[command(
    name = "bittalk_client",
    version,
    about = "Desktop client for BitTalk one-to-one chats"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Store the bearer token issued by the auth service
    SetToken { token: String },
    /// Forget the token, the cached user and all cached messages
    Logout,
    /// Show the user the stored token belongs to
    Whoami,
    /// List chats of the current user
    Chats,
    /// Search users by name
    Search { query: String },
    /// Print the history of a chat
    History {
        chat_id: i64,
        /// Read the last loaded snapshot instead of asking the server
        #[arg(long)]
        offline: bool,
    },
    /// Send a message to a chat
    Send { chat_id: i64, text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);

    storage::ensure_data_dir(&app_config.storage_path)?;
    let store = SessionStore::with_path(&app_config.storage_path)?;

    match cli.command {
        None => run_full_client(app_config, store).await?,
        Some(command) => run_command(command, &app_config, store).await?,
    }
    Ok(())
}

fn build_session(
    config: &AppConfig,
    store: SessionStore,
    event_sender: mpsc::Sender<ClientEvent>,
) -> ChatSession {
    let rest = RestClient::new(config.http_base(), config.authenticated_search);
    ChatSession::new(rest, store, config.ws_base(), event_sender)
}

async fn run_full_client(config: AppConfig, store: SessionStore) -> Result<(), eframe::Error> {
    // UI -> session
    let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_capacity);
    // session and realtime channel -> UI
    let (event_tx, event_rx) = mpsc::channel(config.channel_capacity);

    let session = build_session(&config, store, event_tx);
    tokio::spawn(session.run(cmd_rx));

    for command in [ClientCommand::LoadCurrentUser, ClientCommand::LoadChats] {
        if let Err(err) = cmd_tx.try_send(command) {
            log::warn!("Failed to queue startup command: {err}");
        }
    }

    let options = eframe::NativeOptions::default();
    log::info!("Client started against {}", config.http_base());

    eframe::run_native(
        "BitTalk",
        options,
        Box::new(move |cc| Ok(Box::new(ChatApp::new(cc, cmd_tx, event_rx)))),
    )
}

/// Session for one-shot commands. Events are only logged.
fn headless_session(config: &AppConfig, store: SessionStore) -> ChatSession {
    let (event_tx, mut event_rx) = mpsc::channel(config.channel_capacity);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            log::debug!("Event: {event:?}");
        }
    });
    build_session(config, store, event_tx)
}

async fn run_command(
    command: Command,
    config: &AppConfig,
    store: SessionStore,
) -> ClientResult<()> {
    match command {
        Command::SetToken { token } => {
            store.set_token(token.trim())?;
            println!("Token saved to {}", config.storage_path);
        }
        Command::Logout => {
            store.clear()?;
            println!("Session cleared");
        }
        Command::History {
            chat_id,
            offline: true,
        } => {
            let me = store.current_user()?.map(|user| user.id);
            print_messages(&store.load_messages(chat_id)?, me);
        }
        Command::Whoami => {
            let mut session = headless_session(config, store);
            let user = session.load_current_user().await?;
            println!("{} (#{})", user.name, user.id);
        }
        Command::Chats => {
            let mut session = headless_session(config, store);
            for chat in session.load_chats().await? {
                let last = chat.last_message_content.unwrap_or_default();
                println!("{:>6}  {:<24} {last}", chat.id, chat.name);
            }
        }
        Command::Search { query } => {
            let mut session = headless_session(config, store);
            for user in session.search_users(&query).await? {
                println!("{:>6}  {}", user.id, user.name);
            }
        }
        Command::History { chat_id, .. } => {
            let mut session = headless_session(config, store);
            let messages = session.load_messages_for_chat(chat_id).await?;
            let me = session.current_user().map(|user| user.id);
            print_messages(&messages, me);
        }
        Command::Send { chat_id, text } => {
            let mut session = headless_session(config, store);
            if session.current_user().is_none() {
                session.load_current_user().await?;
            }
            session
                .select_chat(ChatPeer {
                    id: chat_id,
                    name: format!("chat {chat_id}"),
                    avatar: None,
                })
                .await?;
            let result = session.send_message(&text).await;
            session.shutdown().await;
            let message = result?;
            println!("Sent message {}", message.id);
        }
    }
    Ok(())
}

fn print_messages(messages: &[ChatMessage], current_user_id: Option<i64>) {
    let mut pane = MessagePane::new();
    pane.replace_all(messages, current_user_id);
    for node in pane.nodes() {
        let arrow = match node.direction {
            Direction::Sent => ">>",
            Direction::Received => "<<",
        };
        let read = if node.read { " (read)" } else { "" };
        println!("[{}] {arrow} {}{read}", node.time, node.content);
    }
}
