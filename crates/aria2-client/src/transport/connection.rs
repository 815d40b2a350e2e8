//! Connection abstraction shared by the WebSocket driver and test doubles.
//!
//! A [`Connector`] opens a [`Connection`] and reports everything that happens
//! on it afterwards through a [`SignalSink`]. Signals are queued on the
//! transport's channel and only handled when the owner of the client drives
//! them, so lifecycle callbacks never run concurrently with client calls.

use crate::Result;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
    Errored = 4,
}

impl ReadyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Connecting => "connecting",
            ReadyState::Open => "open",
            ReadyState::Closing => "closing",
            ReadyState::Closed => "closed",
            ReadyState::Errored => "errored",
        }
    }

    /// Whether the connection can carry outbound frames.
    pub fn is_open(&self) -> bool {
        matches!(self, ReadyState::Open)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ready state shared between a connection handle and its driver.
#[derive(Debug, Clone)]
pub struct SharedReadyState(Arc<AtomicU8>);

impl SharedReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn load(&self) -> ReadyState {
        match self.0.load(Ordering::SeqCst) {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            3 => ReadyState::Closed,
            _ => ReadyState::Errored,
        }
    }

    pub fn store(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// Close details reported by the remote end or the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, if a close frame was received.
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }
}

/// What happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    Open,
    Message(String),
    Close(CloseInfo),
    Error(String),
}

/// A lifecycle or message signal tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub epoch: u64,
    pub kind: SignalKind,
}

/// Sending half handed to a connector for one connection.
///
/// Every signal is stamped with the epoch of the connection it belongs to.
/// Once the transport has moved on to a newer connection, signals from this
/// sink are discarded.
#[derive(Debug, Clone)]
pub struct SignalSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn open(&self) {
        self.emit(SignalKind::Open);
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(SignalKind::Message(text.into()));
    }

    pub fn close(&self, info: CloseInfo) {
        self.emit(SignalKind::Close(info));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(SignalKind::Error(message.into()));
    }

    fn emit(&self, kind: SignalKind) {
        // The receiver only goes away with the client; nothing left to notify.
        let _ = self.tx.send(Signal {
            epoch: self.epoch,
            kind,
        });
    }
}

/// One live bidirectional message stream.
pub trait Connection: Send + fmt::Debug {
    /// Current lifecycle state.
    fn ready_state(&self) -> ReadyState;

    /// Queue a text frame for delivery. Only called while the state is open.
    fn send_text(&mut self, text: String) -> Result<()>;

    /// Request a graceful close.
    fn close(&mut self);
}

/// Factory for connections.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Start opening a connection to `url` without blocking.
    ///
    /// The returned handle starts in [`ReadyState::Connecting`]; progress is
    /// reported through `sink`.
    fn connect(&self, url: &Url, sink: SignalSink) -> Result<Box<dyn Connection>>;
}
