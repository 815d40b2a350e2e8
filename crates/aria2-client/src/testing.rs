//! In-memory connector for tests.
//!
//! [`MockConnector`] hands out [`MockConnection`]s and keeps a [`MockRemote`]
//! for each one. A test plays the daemon through the remote: it flips the
//! ready state, injects signals, and inspects the frames the client sent.
//!
//! ```rust,ignore
//! let connector = MockConnector::new();
//! let mut client = Aria2Client::with_connector(
//!     ClientOptions::default(),
//!     Arc::new(connector.clone()),
//!     IdMode::Integer,
//! );
//! client.connect(None, None, None)?;
//! let remote = connector.latest().unwrap();
//! remote.open();
//! client.process_pending();
//! ```

use crate::transport::{
    CloseInfo, Connection, Connector, ReadyState, SharedReadyState, SignalSink,
};
use crate::{Aria2Error, Result};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connector that records every connection it opens.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    remotes: Arc<Mutex<Vec<MockRemote>>>,
    refuse: bool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose `connect` always fails.
    pub fn refusing() -> Self {
        Self {
            remotes: Arc::default(),
            refuse: true,
        }
    }

    pub fn connection_count(&self) -> usize {
        lock(&self.remotes).len()
    }

    /// Remote side of the `index`-th connection (0-based).
    pub fn remote(&self, index: usize) -> Option<MockRemote> {
        lock(&self.remotes).get(index).cloned()
    }

    /// Remote side of the most recent connection.
    pub fn latest(&self) -> Option<MockRemote> {
        lock(&self.remotes).last().cloned()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &Url, sink: SignalSink) -> Result<Box<dyn Connection>> {
        if self.refuse {
            return Err(Aria2Error::Transport {
                message: format!("mock connector refused {}", url),
            });
        }

        let remote = MockRemote {
            url: url.to_string(),
            state: SharedReadyState::new(ReadyState::Connecting),
            sent: Arc::default(),
            close_requested: Arc::default(),
            sink,
        };
        let connection = MockConnection {
            state: remote.state.clone(),
            sent: remote.sent.clone(),
            close_requested: remote.close_requested.clone(),
        };
        lock(&self.remotes).push(remote);
        Ok(Box::new(connection))
    }
}

/// Client-side handle produced by [`MockConnector`].
#[derive(Debug)]
pub struct MockConnection {
    state: SharedReadyState,
    sent: Arc<Mutex<Vec<String>>>,
    close_requested: Arc<AtomicBool>,
}

impl Connection for MockConnection {
    fn ready_state(&self) -> ReadyState {
        self.state.load()
    }

    fn send_text(&mut self, text: String) -> Result<()> {
        lock(&self.sent).push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.state.store(ReadyState::Closing);
        self.close_requested.store(true, Ordering::SeqCst);
    }
}

/// The daemon's side of a mock connection.
#[derive(Debug, Clone)]
pub struct MockRemote {
    url: String,
    state: SharedReadyState,
    sent: Arc<Mutex<Vec<String>>>,
    close_requested: Arc<AtomicBool>,
    sink: SignalSink,
}

impl MockRemote {
    /// URL the client connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state.load()
    }

    /// Change the ready state without emitting a signal.
    pub fn set_ready_state(&self, state: ReadyState) {
        self.state.store(state);
    }

    /// Complete the handshake: state becomes open, then an open signal is queued.
    pub fn open(&self) {
        self.state.store(ReadyState::Open);
        self.sink.open();
    }

    /// Queue an inbound text frame.
    pub fn deliver(&self, text: impl Into<String>) {
        self.sink.message(text);
    }

    /// Close from the daemon's side: state becomes closed, then a close signal.
    pub fn close(&self, code: u16, reason: &str) {
        self.state.store(ReadyState::Closed);
        self.sink.close(CloseInfo::new(code, reason));
    }

    /// Fail the connection: an error signal followed by a close signal.
    pub fn fail(&self, message: &str) {
        self.state.store(ReadyState::Errored);
        self.sink.error(message);
        self.state.store(ReadyState::Closed);
        self.sink.close(CloseInfo::default());
    }

    /// Whether the client asked for a graceful close.
    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    /// Raw text frames the client sent, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Sent frames parsed as JSON. Unparseable frames become `Value::Null`.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent_frames()
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap_or(Value::Null))
            .collect()
    }
}
