//! End-to-end tests against a local WebSocket server standing in for aria2.

use aria2_client::{
    Aria2Client, ClientOptions, CloseOutcome, Inbound, MessageId, ProtocolEvent, ReadyState,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Accept one connection, answer every request with a version result and
/// return the raw request frames once the client goes away.
async fn start_fake_daemon() -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let request: Value = serde_json::from_str(&text).unwrap();
                let reply = json!({
                    "jsonrpc": "2.0",
                    "result": {"version": "1.37.0", "enabledFeatures": ["BitTorrent"]},
                    "id": request["id"],
                });
                ws.send(Message::Text(reply.to_string())).await.unwrap();
                received.push(text);
            }
        }
        received
    });

    (addr, handle)
}

async fn next_event(client: &mut Aria2Client) -> ProtocolEvent {
    tokio::time::timeout(WAIT, client.next_event())
        .await
        .expect("timed out waiting for an event")
}

#[tokio::test]
async fn test_round_trip_against_local_server() {
    let (addr, daemon) = start_fake_daemon().await;
    let mut client = Aria2Client::new(ClientOptions {
        url: format!("ws://{}/jsonrpc", addr),
        token: Some("secret".to_string()),
        ..Default::default()
    });

    let opened = Arc::new(Mutex::new(Vec::new()));
    let opened_clone = opened.clone();
    client.on_open(move |event| opened_clone.lock().unwrap().push(event.ready_state()));
    let inbound = Arc::new(Mutex::new(Vec::new()));
    let inbound_clone = inbound.clone();
    client.on_message(move |message| inbound_clone.lock().unwrap().push(message.clone()));

    client.connect(None, None, None).unwrap();
    assert_eq!(next_event(&mut client).await, ProtocolEvent::Opened);
    assert_eq!(*opened.lock().unwrap(), vec![ReadyState::Open]);

    assert!(client.get_version().is_sent());
    match next_event(&mut client).await {
        ProtocolEvent::Message(Inbound::Response(response)) => {
            assert_eq!(response.id, Some(MessageId::from(1)));
            let result = response.into_result().unwrap();
            assert_eq!(result["version"], "1.37.0");
        }
        other => panic!("Expected a response, got: {:?}", other),
    }
    assert_eq!(inbound.lock().unwrap().len(), 1);

    assert_eq!(client.disconnect(), CloseOutcome::Closing);
    loop {
        if let ProtocolEvent::Closed(_) = next_event(&mut client).await {
            break;
        }
    }
    assert_eq!(client.ready_state(), Some(ReadyState::Closed));

    let frames = tokio::time::timeout(WAIT, daemon).await.unwrap().unwrap();
    assert_eq!(frames.len(), 1);
    let request: Value = serde_json::from_str(&frames[0]).unwrap();
    assert_eq!(request["method"], "aria2.getVersion");
    assert_eq!(request["params"], json!(["token:secret"]));
}

#[tokio::test]
async fn test_refused_connection_reports_close_without_open() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let mut client = Aria2Client::new(ClientOptions {
        url: format!("ws://{}/jsonrpc", addr),
        ..Default::default()
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let opened = events.clone();
    client.on_open(move |_| opened.lock().unwrap().push("open"));
    let closed = events.clone();
    client.on_close(move |_| closed.lock().unwrap().push("close"));

    client.connect(None, None, None).unwrap();
    assert!(matches!(
        next_event(&mut client).await,
        ProtocolEvent::Errored(_)
    ));
    assert!(matches!(
        next_event(&mut client).await,
        ProtocolEvent::Closed(_)
    ));

    assert_eq!(*events.lock().unwrap(), vec!["close"]);
    assert!(!client.get_version().is_sent());
}
