//! In-process stand-in for the RemNote companion, used by the unit and
//! end-to-end tests. Binds an ephemeral port, speaks the same one-request/
//! one-reply protocol and records everything it was asked to create.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMsg};

use crate::protocol::CreateRemRequest;

/// Scripted behavior for one connection, chosen per incoming request.
pub enum MockReply {
    /// Send these text frames, then close.
    Frames(Vec<String>),
    /// Wait, then send these text frames.
    Delayed(Duration, Vec<String>),
    /// Send one binary frame where a text reply belongs.
    Binary(Vec<u8>),
    /// Accept the request and never answer.
    Silent,
    /// Close the connection without a reply.
    CloseImmediately,
}

impl MockReply {
    /// A well-formed success reply; the payload keeps its extra fields.
    pub fn success(mut payload: Value) -> Self {
        if let Some(map) = payload.as_object_mut() {
            map.insert("success".to_owned(), json!(true));
        }
        MockReply::Frames(vec![payload.to_string()])
    }

    /// A well-formed failure reply with the given error message.
    pub fn failure(message: &str) -> Self {
        MockReply::Frames(vec![json!({"success": false, "error": message}).to_string()])
    }

    /// A frame that is not JSON.
    pub fn malformed() -> Self {
        MockReply::Frames(vec!["][ not json".to_owned()])
    }
}

pub struct MockRemServer {
    port: u16,
    received: Arc<Mutex<Vec<CreateRemRequest>>>,
    accept_task: JoinHandle<()>,
}

impl MockRemServer {
    /// Bind `127.0.0.1:0` and serve connections until dropped. `script`
    /// picks the reply for each parsed request.
    pub async fn spawn<F>(script: F) -> Self
    where
        F: Fn(&CreateRemRequest) -> MockReply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("mock server bind");
        let port = listener.local_addr().expect("mock server addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);
        let recorded = Arc::clone(&received);

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = Arc::clone(&script);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(frame)) = ws.next().await {
                        let WsMsg::Text(txt) = frame else { continue };
                        let Ok(request) = serde_json::from_str::<CreateRemRequest>(txt.as_str())
                        else {
                            break;
                        };
                        let reply = script(&request);
                        recorded.lock().await.push(request);
                        match reply {
                            MockReply::Frames(frames) => {
                                for f in frames {
                                    let _ = ws.send(WsMsg::Text(f.into())).await;
                                }
                            }
                            MockReply::Delayed(delay, frames) => {
                                time::sleep(delay).await;
                                for f in frames {
                                    let _ = ws.send(WsMsg::Text(f.into())).await;
                                }
                            }
                            MockReply::Binary(bytes) => {
                                let _ = ws.send(WsMsg::Binary(bytes.into())).await;
                            }
                            MockReply::Silent => {
                                // Hold the connection open until the client
                                // gives up and drops it.
                                while ws.next().await.is_some() {}
                                return;
                            }
                            MockReply::CloseImmediately => {}
                        }
                        break;
                    }
                    let _ = ws.close(None).await;
                });
            }
        });

        Self {
            port,
            received,
            accept_task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Every request the server has parsed so far, in arrival order.
    pub async fn received(&self) -> Vec<CreateRemRequest> {
        self.received.lock().await.clone()
    }
}

impl Drop for MockRemServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}
