//! WebSocket connector built on `tokio-tungstenite`.
//!
//! Each connection gets one driver task on the current tokio runtime. The task
//! performs the handshake, then multiplexes outbound frames from the handle
//! with inbound frames from the socket until either side closes.
//!
//! ```text
//!  WebSocketConnection ──Outbound──► driver task ──frames──► socket
//!        (handle)                        │
//!  Transport ◄────────── Signal ─────────┘◄──────frames────── socket
//! ```

use super::connection::{
    CloseInfo, Connection, Connector, ReadyState, SharedReadyState, SignalSink,
};
use crate::{Aria2Error, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, warn};
use url::Url;

/// Commands from the handle to its driver.
#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Opens WebSocket connections on the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, url: &Url, sink: SignalSink) -> Result<Box<dyn Connection>> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| Aria2Error::Runtime {
            message: e.to_string(),
        })?;

        let state = SharedReadyState::new(ReadyState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        runtime.spawn(drive(url.clone(), state.clone(), sink, outbound_rx));

        Ok(Box::new(WebSocketConnection {
            state,
            outbound: outbound_tx,
        }))
    }
}

/// Handle to a connection driven by a background task.
///
/// Dropping the handle closes the socket.
#[derive(Debug)]
pub struct WebSocketConnection {
    state: SharedReadyState,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Connection for WebSocketConnection {
    fn ready_state(&self) -> ReadyState {
        self.state.load()
    }

    fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| Aria2Error::Transport {
                message: "connection driver has stopped".to_string(),
            })
    }

    fn close(&mut self) {
        self.state.store(ReadyState::Closing);
        if self.outbound.send(Outbound::Close).is_err() {
            debug!("Connection driver already stopped");
        }
    }
}

async fn drive(
    url: Url,
    state: SharedReadyState,
    sink: SignalSink,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", url, e);
            state.store(ReadyState::Errored);
            sink.error(e.to_string());
            state.store(ReadyState::Closed);
            sink.close(CloseInfo::default());
            return;
        }
    };

    state.store(ReadyState::Open);
    sink.open();

    let (mut writer, mut reader) = stream.split();
    let mut close_info = CloseInfo::default();
    let mut outbound_open = true;

    loop {
        tokio::select! {
            command = outbound.recv(), if outbound_open => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = writer.send(Message::Text(text)).await {
                        fail(&state, &sink, &e);
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    outbound_open = false;
                    state.store(ReadyState::Closing);
                    if let Err(e) = writer.send(Message::Close(None)).await {
                        debug!("Failed to send close frame: {}", e);
                        break;
                    }
                }
            },
            frame = reader.next() => match frame {
                Some(Ok(Message::Text(text))) => sink.message(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => sink.message(text),
                    Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    // Keep reading so tungstenite can flush the close reply.
                    state.store(ReadyState::Closing);
                    if let Some(frame) = frame {
                        close_info = CloseInfo::new(u16::from(frame.code), frame.reason.into_owned());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed)) => break,
                Some(Err(e)) => {
                    fail(&state, &sink, &e);
                    break;
                }
                None => break,
            },
        }
    }

    state.store(ReadyState::Closed);
    sink.close(close_info);
}

fn fail(state: &SharedReadyState, sink: &SignalSink, err: &tungstenite::Error) {
    warn!("WebSocket connection #{} failed: {}", sink.epoch(), err);
    state.store(ReadyState::Errored);
    sink.error(err.to_string());
}
