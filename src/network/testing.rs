//! In-process WebSocket server for channel tests. Records `open`, `recv` and
//! `close` per connection path, in the order the server observes them.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub(crate) type ServerLog = Arc<Mutex<Vec<String>>>;

pub(crate) struct WsTestServer {
    pub addr: SocketAddr,
    pub log: ServerLog,
}

impl WsTestServer {
    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }
}

/// Every accepted connection first receives `frames`, then is read until it closes.
pub(crate) async fn spawn_ws_server(frames: Vec<String>) -> WsTestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: ServerLog = Arc::new(Mutex::new(Vec::new()));

    let accept_log = log.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let log = accept_log.clone();
            let frames = frames.clone();
            tokio::spawn(async move {
                let mut path = String::new();
                let callback = |request: &Request, response: Response| {
                    path = request.uri().path().to_string();
                    Ok::<_, ErrorResponse>(response)
                };
                let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
                    return;
                };
                log.lock().unwrap().push(format!("open {path}"));

                for frame in frames {
                    if ws.send(Message::text(frame)).await.is_err() {
                        return;
                    }
                }
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(text) => log
                            .lock()
                            .unwrap()
                            .push(format!("recv {path} {}", text.as_str())),
                        Message::Close(_) => log.lock().unwrap().push(format!("close {path}")),
                        _ => {}
                    }
                }
            });
        }
    });

    WsTestServer { addr, log }
}

/// Poll the log until it holds at least `len` entries or a second has passed.
pub(crate) async fn wait_for_log(log: &ServerLog, len: usize) -> Vec<String> {
    for _ in 0..50 {
        {
            let entries = log.lock().unwrap();
            if entries.len() >= len {
                return entries.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    log.lock().unwrap().clone()
}
