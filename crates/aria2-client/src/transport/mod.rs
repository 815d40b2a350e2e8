//! Connection ownership and lifecycle signal routing.
//!
//! [`Transport`] owns at most one [`Connection`] at a time, the URL it was
//! opened with, and the identifier generator for outbound requests. Signals
//! from the connection are queued on an internal channel and handed out one at
//! a time by [`Transport::try_next_signal`] / [`Transport::next_signal`]. Each
//! handed-out signal has already been traced by the matching `on_*` hook.
//!
//! # Connection epochs
//!
//! Every call to [`Transport::create_connection`] starts a new epoch. Signals
//! stamped with an older epoch belong to a replaced connection and are dropped
//! without reaching any hook.

pub mod connection;
pub mod websocket;

pub use connection::{
    CloseInfo, Connection, Connector, ReadyState, SharedReadyState, Signal, SignalKind,
    SignalSink,
};
pub use websocket::WebSocketConnector;

use crate::config::ClientConfig;
use crate::protocol::{IdGenerator, IdMode, MessageId, Request};
use crate::{Aria2Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

/// Result of handing a request to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was queued on an open connection.
    Sent(MessageId),
    /// No connection has been created yet.
    NotConnected,
    /// A connection exists but is not open.
    NotOpen(ReadyState),
    /// The frame could not be serialized or queued.
    Failed(String),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }

    /// Identifier of the sent request, for out-of-band correlation.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            SendOutcome::Sent(id) => Some(id),
            _ => None,
        }
    }
}

/// Result of a graceful close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Close was requested; a close signal follows.
    Closing,
    NotConnected,
    NotOpen(ReadyState),
}

impl CloseOutcome {
    pub fn is_closing(&self) -> bool {
        matches!(self, CloseOutcome::Closing)
    }
}

/// Owner of the single live connection.
#[derive(Debug)]
pub struct Transport {
    url: String,
    connector: Arc<dyn Connector>,
    connection: Option<Box<dyn Connection>>,
    epoch: u64,
    ids: IdGenerator,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
}

impl Transport {
    pub fn new(url: impl Into<String>, connector: Arc<dyn Connector>, id_mode: IdMode) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            connector,
            connection: None,
            epoch: 0,
            ids: IdGenerator::new(id_mode),
            signal_tx,
            signal_rx,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Change the target URL. Takes effect on the next [`Self::create_connection`].
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// Epoch of the current connection (0 before the first connect).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn id_mode(&self) -> IdMode {
        self.ids.mode()
    }

    /// Ready state of the current connection, if one exists.
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.connection.as_ref().map(|c| c.ready_state())
    }

    /// Open a new connection to the stored URL, replacing any existing one.
    ///
    /// Returns as soon as the connector has started; the open (or error and
    /// close) signal arrives later.
    pub fn create_connection(&mut self) -> Result<()> {
        let url = parse_url(&self.url)?;
        let epoch = self.epoch + 1;
        let sink = SignalSink::new(epoch, self.signal_tx.clone());
        let connection = self.connector.connect(&url, sink)?;

        info!("Opening connection #{} to {}", epoch, self.url);
        self.epoch = epoch;
        if self.connection.replace(connection).is_some() {
            debug!("Replaced previous connection; its signals will be ignored");
        }
        Ok(())
    }

    /// Next identifier for an outbound request.
    pub fn next_message_id(&mut self) -> MessageId {
        self.ids.next_id()
    }

    /// Serialize and queue `request` on the current connection.
    ///
    /// Never raises: an absent or non-open connection is logged and reported
    /// in the outcome. Nothing is queued for later delivery.
    pub fn send(&mut self, request: &Request) -> SendOutcome {
        let Some(connection) = self.connection.as_mut() else {
            warn!("No connection has been created; dropping {}", request.method);
            return SendOutcome::NotConnected;
        };

        let state = connection.ready_state();
        if !state.is_open() {
            warn!(
                "Connection is {} rather than open; dropping {}",
                state, request.method
            );
            return SendOutcome::NotOpen(state);
        }

        let json = match serde_json::to_string(request) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {}: {}", request.method, e);
                return SendOutcome::Failed(e.to_string());
            }
        };

        info!(
            "Sending {} (id {}, {} params)",
            request.method,
            request.id,
            request.params.as_ref().map_or(0, Vec::len)
        );
        match connection.send_text(json) {
            Ok(()) => SendOutcome::Sent(request.id.clone()),
            Err(e) => {
                warn!("Failed to send {}: {}", request.method, e);
                SendOutcome::Failed(e.to_string())
            }
        }
    }

    /// Request a graceful close of the current connection.
    pub fn close(&mut self) -> CloseOutcome {
        let Some(connection) = self.connection.as_mut() else {
            warn!("No connection has been created; nothing to close");
            return CloseOutcome::NotConnected;
        };

        let state = connection.ready_state();
        if !state.is_open() {
            warn!("Connection is {} rather than open; not closing", state);
            return CloseOutcome::NotOpen(state);
        }

        info!("Closing connection #{}", self.epoch);
        connection.close();
        CloseOutcome::Closing
    }

    /// Take the next queued signal for the current connection, if any.
    pub fn try_next_signal(&mut self) -> Option<SignalKind> {
        while let Ok(signal) = self.signal_rx.try_recv() {
            if let Some(kind) = self.accept(signal) {
                return Some(kind);
            }
        }
        None
    }

    /// Wait for the next signal for the current connection.
    ///
    /// The transport holds a sender of its own, so the queue never closes:
    /// once a connection has closed this waits until a new one is created.
    pub async fn next_signal(&mut self) -> SignalKind {
        loop {
            let Some(signal) = self.signal_rx.recv().await else {
                return std::future::pending().await;
            };
            if let Some(kind) = self.accept(signal) {
                return kind;
            }
        }
    }

    fn accept(&self, signal: Signal) -> Option<SignalKind> {
        if signal.epoch != self.epoch {
            debug!(
                "Ignoring {:?} from replaced connection #{}",
                signal.kind, signal.epoch
            );
            return None;
        }
        match &signal.kind {
            SignalKind::Open => self.on_open(),
            SignalKind::Message(text) => self.on_message(text),
            SignalKind::Close(info) => self.on_close(info),
            SignalKind::Error(message) => self.on_error(message),
        }
        Some(signal.kind)
    }

    fn on_open(&self) {
        debug!("Connection #{} opened", self.epoch);
    }

    fn on_message(&self, text: &str) {
        debug!("Connection #{} received {} bytes", self.epoch, text.len());
    }

    fn on_close(&self, info: &CloseInfo) {
        debug!(
            "Connection #{} closed (code {:?}, reason {:?})",
            self.epoch, info.code, info.reason
        );
    }

    fn on_error(&self, message: &str) {
        debug!("Connection #{} error: {}", self.epoch, message);
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Aria2Error::invalid_url(raw, e.to_string()))?;
    if !ClientConfig::SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(Aria2Error::invalid_url(
            raw,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}
