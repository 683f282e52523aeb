use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::common::{ChannelState, ChatMessage, ClientEvent};
use crate::error::ClientResult;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `close` waits for the server to acknowledge before aborting the reader.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Frame pushed by the server on the realtime channel.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub read_by: Option<i64>,
}

pub fn channel_url(ws_base: &str, chat_id: i64, user_id: i64) -> String {
    format!(
        "{}/bittalk-mes/ws/{chat_id}/{user_id}",
        ws_base.trim_end_matches('/')
    )
}

/// Route a frame by its `action`. Frames without an action but with a message
/// are treated as new messages.
pub fn route_frame(chat_id: i64, frame: InboundFrame) -> Option<ClientEvent> {
    match (frame.action.as_deref(), frame.message, frame.message_id) {
        (None | Some("new_message") | Some("new_file"), Some(message), _) => {
            Some(ClientEvent::MessageReceived { chat_id, message })
        }
        (Some("message_read"), _, Some(message_id)) => Some(ClientEvent::MessageRead {
            chat_id,
            message_id,
            read_by: frame.read_by,
        }),
        (Some("edit_message"), Some(message), _) => {
            Some(ClientEvent::MessageEdited { chat_id, message })
        }
        (Some("delete_message"), _, Some(message_id)) => {
            Some(ClientEvent::MessageDeleted { chat_id, message_id })
        }
        (action, _, _) => {
            log::debug!("Ignoring realtime frame for chat {chat_id} (action {action:?})");
            None
        }
    }
}

pub fn parse_frame(chat_id: i64, text: &str) -> Option<ClientEvent> {
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => route_frame(chat_id, frame),
        Err(err) => {
            log::warn!("Dropping malformed realtime frame for chat {chat_id}: {err}");
            None
        }
    }
}

/// The live WebSocket for one chat. Inbound frames are forwarded as `ClientEvent`s
/// by a reader task; the write half stays here.
pub struct RealtimeChannel {
    chat_id: i64,
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
    events: mpsc::Sender<ClientEvent>,
}

impl RealtimeChannel {
    pub async fn open(
        url: &str,
        chat_id: i64,
        events: mpsc::Sender<ClientEvent>,
    ) -> ClientResult<Self> {
        notify_state(&events, chat_id, ChannelState::Connecting).await;
        let stream = match connect_async(url).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                log::error!("Realtime channel for chat {chat_id} failed to connect: {err}");
                notify_state(&events, chat_id, ChannelState::Closed).await;
                return Err(err.into());
            }
        };
        log::info!("Realtime channel for chat {chat_id} open");
        notify_state(&events, chat_id, ChannelState::Open).await;

        let (sink, source) = stream.split();
        let reader = tokio::spawn(read_loop(chat_id, source, events.clone()));
        Ok(Self {
            chat_id,
            sink,
            reader,
            events,
        })
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Ask the server to mark a message as read; it broadcasts `message_read` back.
    pub async fn mark_read(&mut self, message_id: i64) -> ClientResult<()> {
        let frame = json!({ "action": "read_message", "message_id": message_id });
        self.sink.send(Message::text(frame.to_string())).await?;
        Ok(())
    }

    /// Send a close frame and wait for the reader to observe the server's reply.
    pub async fn close(mut self) {
        if let Err(err) = self.sink.send(Message::Close(None)).await {
            log::debug!("Close frame for chat {} not sent: {err}", self.chat_id);
        }
        if tokio::time::timeout(CLOSE_GRACE, &mut self.reader)
            .await
            .is_err()
        {
            log::warn!(
                "Realtime channel for chat {} did not finish closing; aborting reader",
                self.chat_id
            );
            self.reader.abort();
            notify_state(&self.events, self.chat_id, ChannelState::Closed).await;
        }
    }
}

async fn read_loop(
    chat_id: i64,
    mut source: SplitStream<WsStream>,
    events: mpsc::Sender<ClientEvent>,
) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let Some(event) = parse_frame(chat_id, text.as_str()) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    log::debug!("Event receiver dropped; stopping reader for chat {chat_id}");
                    return;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                log::error!("Realtime channel for chat {chat_id} failed: {err}");
                break;
            }
        }
    }
    log::info!("Realtime channel for chat {chat_id} closed");
    notify_state(&events, chat_id, ChannelState::Closed).await;
}

async fn notify_state(events: &mpsc::Sender<ClientEvent>, chat_id: i64, state: ChannelState) {
    if let Err(err) = events
        .send(ClientEvent::ChannelStatus { chat_id, state })
        .await
    {
        log::debug!("Failed to report channel state {state:?}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::{spawn_ws_server, wait_for_log};

    #[test]
    fn url_carries_chat_and_user() {
        assert_eq!(
            channel_url("ws://127.0.0.1:8000/", 2, 3),
            "ws://127.0.0.1:8000/bittalk-mes/ws/2/3"
        );
    }

    #[test]
    fn new_message_frame_routes_to_message_received() {
        let event = parse_frame(
            2,
            r#"{"action": "new_message", "chat_id": 2,
                "message": {"id": 1, "chat_id": 2, "sender_id": 2, "content": "hi"}}"#,
        );
        match event {
            Some(ClientEvent::MessageReceived { chat_id, message }) => {
                assert_eq!(chat_id, 2);
                assert_eq!(message.content, "hi");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn frame_without_action_is_still_a_message() {
        let event = parse_frame(
            2,
            r#"{"message": {"id": 1, "chat_id": 2, "sender_id": 2, "content": "hi",
                            "created_at": "2024-01-01T00:00:00Z"}}"#,
        );
        assert!(matches!(event, Some(ClientEvent::MessageReceived { .. })));
    }

    #[test]
    fn message_read_frame_is_reachable() {
        let event = parse_frame(
            2,
            r#"{"action": "message_read", "message_id": 9, "read_by": 3, "chat_id": 2}"#,
        );
        match event {
            Some(ClientEvent::MessageRead {
                message_id,
                read_by,
                ..
            }) => {
                assert_eq!(message_id, 9);
                assert_eq!(read_by, Some(3));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn edit_and_delete_frames_route() {
        let edited = parse_frame(
            2,
            r#"{"action": "edit_message",
                "message": {"id": 1, "chat_id": 2, "sender_id": 2, "content": "fixed"}}"#,
        );
        assert!(matches!(edited, Some(ClientEvent::MessageEdited { .. })));

        let deleted = parse_frame(2, r#"{"action": "delete_message", "message_id": 1}"#);
        assert!(matches!(
            deleted,
            Some(ClientEvent::MessageDeleted { message_id: 1, .. })
        ));
    }

    #[test]
    fn unknown_or_malformed_frames_are_dropped() {
        assert!(parse_frame(2, r#"{"action": "typing"}"#).is_none());
        assert!(parse_frame(2, r#"{"action": "message_read"}"#).is_none());
        assert!(parse_frame(2, "not json").is_none());
    }

    #[tokio::test]
    async fn channel_forwards_frames_and_closes_cleanly() {
        let frame = r#"{"action": "new_message",
            "message": {"id": 5, "chat_id": 2, "sender_id": 2, "content": "pushed"}}"#;
        let server = spawn_ws_server(vec![frame.to_string()]).await;
        let (tx, mut rx) = mpsc::channel(16);

        let url = channel_url(&server.ws_base(), 2, 3);
        let mut channel = RealtimeChannel::open(&url, 2, tx).await.unwrap();
        assert_eq!(channel.chat_id(), 2);

        let mut received = None;
        while let Some(event) = rx.recv().await {
            if let ClientEvent::MessageReceived { message, .. } = event {
                received = Some(message);
                break;
            }
        }
        assert_eq!(received.unwrap().content, "pushed");

        channel.mark_read(5).await.unwrap();
        channel.close().await;

        let log = wait_for_log(&server.log, 3).await;
        assert_eq!(log[0], "open /bittalk-mes/ws/2/3");
        assert!(log[1].contains("\"read_message\""));
        assert_eq!(log[2], "close /bittalk-mes/ws/2/3");
    }

    #[tokio::test]
    async fn failed_connect_reports_closed() {
        let (tx, mut rx) = mpsc::channel(16);
        // Port 9 (discard) is not listening locally.
        let result = RealtimeChannel::open("ws://127.0.0.1:9/bittalk-mes/ws/1/2", 1, tx).await;

        assert!(result.is_err());
        assert!(matches!(
            rx.recv().await,
            Some(ClientEvent::ChannelStatus {
                state: ChannelState::Connecting,
                ..
            })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ClientEvent::ChannelStatus {
                state: ChannelState::Closed,
                ..
            })
        ));
    }
}
