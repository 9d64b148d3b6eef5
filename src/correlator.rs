use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMsg,
};
use tracing::debug;

use crate::error::CreateError;
use crate::protocol::{CreateRemRequest, Reply};

/// Fixed per-request deadline, measured from call start.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Execute one create-Rem exchange over a fresh connection.
///
/// Opens `ws://localhost:<port>`, sends exactly one request frame and waits
/// for the first terminal event: a reply, a transport failure, or the
/// deadline. The connection is single-use and is closed on every exit path;
/// nothing is retained afterward and nothing is retried.
pub async fn send_create_request(
    text: &str,
    parent_id: Option<&str>,
    port: u16,
    timeout: Duration,
) -> Result<Value, CreateError> {
    match time::timeout(timeout, exchange(text, parent_id, port)).await {
        Ok(outcome) => outcome,
        // Dropping the exchange future tears down the socket, so a reply
        // racing the deadline can never resolve a second time.
        Err(_) => Err(CreateError::Timeout),
    }
}

async fn exchange(text: &str, parent_id: Option<&str>, port: u16) -> Result<Value, CreateError> {
    let url = format!("ws://localhost:{}", port);
    let (mut ws, _) = connect_async(&url).await?;
    debug!(port, "connected to companion");

    let frame = serde_json::to_string(&CreateRemRequest::new(text, parent_id))?;
    if let Err(err) = ws.send(WsMsg::Text(frame.into())).await {
        let _ = ws.close(None).await;
        return Err(err.into());
    }

    let outcome = await_reply(&mut ws).await;
    let _ = ws.close(None).await;
    outcome
}

/// Wait for the single reply this connection is good for. Control frames
/// are not replies; anything after the first text frame is never read.
async fn await_reply(ws: &mut Socket) -> Result<Value, CreateError> {
    while let Some(frame) = ws.next().await {
        match frame? {
            WsMsg::Text(txt) => {
                return match Reply::classify(txt.as_str())? {
                    Reply::Success(payload) => Ok(payload),
                    Reply::Failure(message) => Err(CreateError::Application(message)),
                };
            }
            WsMsg::Binary(_) => {
                return Err(CreateError::Protocol(
                    "binary frame where a text reply was expected".to_owned(),
                ));
            }
            WsMsg::Close(_) => break,
            WsMsg::Ping(_) | WsMsg::Pong(_) | WsMsg::Frame(_) => continue,
        }
    }
    Err(CreateError::Transport(
        "connection closed before a reply arrived".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{MockReply, MockRemServer};
    use serde_json::json;

    #[tokio::test]
    async fn resolves_with_the_full_success_payload() {
        let server =
            MockRemServer::spawn(|_| MockReply::success(json!({"remId": "r42", "depth": 3}))).await;

        let payload = send_create_request("buy milk", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect("exchange should succeed");
        assert_eq!(
            payload,
            json!({"success": true, "remId": "r42", "depth": 3})
        );

        let received = server.received().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], CreateRemRequest::new("buy milk", None));
    }

    #[tokio::test]
    async fn parent_id_travels_on_the_wire() {
        let server = MockRemServer::spawn(|_| MockReply::success(json!({}))).await;

        send_create_request("child", Some("rem-9"), server.port(), DEFAULT_TIMEOUT)
            .await
            .expect("exchange should succeed");

        let received = server.received().await;
        assert_eq!(received[0].parent_id.as_deref(), Some("rem-9"));
    }

    #[tokio::test]
    async fn remote_failure_becomes_an_application_error() {
        let server = MockRemServer::spawn(|_| MockReply::failure("duplicate")).await;

        let err = send_create_request("note", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect_err("companion rejected the request");
        assert_eq!(err.kind(), "application");
        assert_eq!(err.to_string(), "duplicate");
    }

    #[tokio::test]
    async fn malformed_reply_is_a_protocol_error() {
        let server = MockRemServer::spawn(|_| MockReply::malformed()).await;

        let err = send_create_request("note", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect_err("frame is not JSON");
        assert_eq!(err.kind(), "protocol");
    }

    #[tokio::test]
    async fn binary_reply_is_a_protocol_error() {
        let server = MockRemServer::spawn(|_| MockReply::Binary(vec![0xde, 0xad])).await;

        let err = send_create_request("note", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect_err("companion replied with a binary frame");
        assert_eq!(err.kind(), "protocol");
    }

    #[tokio::test]
    async fn frames_after_the_first_are_never_processed() {
        // A malformed first frame settles the exchange; the valid reply
        // queued behind it must not resurrect the connection.
        let server = MockRemServer::spawn(|_| {
            MockReply::Frames(vec![
                "garbage".to_owned(),
                r#"{"success":true}"#.to_owned(),
            ])
        })
        .await;

        let err = send_create_request("note", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect_err("first frame decides the outcome");
        assert_eq!(err.kind(), "protocol");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let err = send_create_request("note", None, port, DEFAULT_TIMEOUT)
            .await
            .expect_err("nothing is listening");
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn close_before_reply_is_a_transport_error() {
        let server = MockRemServer::spawn(|_| MockReply::CloseImmediately).await;

        let err = send_create_request("note", None, server.port(), DEFAULT_TIMEOUT)
            .await
            .expect_err("companion hung up");
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn silent_companion_times_out() {
        let server = MockRemServer::spawn(|_| MockReply::Silent).await;

        let err = send_create_request("note", None, server.port(), Duration::from_millis(100))
            .await
            .expect_err("no reply within the deadline");
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.to_string(), "connection timed out");
    }

    #[tokio::test]
    async fn reply_racing_the_deadline_cannot_resolve_twice() {
        let server = MockRemServer::spawn(|_| {
            MockReply::Delayed(
                Duration::from_millis(300),
                vec![r#"{"success":true}"#.to_owned()],
            )
        })
        .await;

        let err = send_create_request("note", None, server.port(), Duration::from_millis(50))
            .await
            .expect_err("deadline fires first");
        assert_eq!(err.kind(), "timeout");

        // The late frame lands on a torn-down socket; nothing to observe
        // but the absence of a panic once the server task has run.
        time::sleep(Duration::from_millis(400)).await;
    }
}
