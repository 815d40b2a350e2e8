//! Authenticated control client for an aria2 daemon.
//!
//! Wraps a [`ProtocolClient`] and adds three things:
//!
//! - the configured secret is prepended to every request's parameters as
//!   `"token:<secret>"`;
//! - typed operations (`aria2.addUri`, `aria2.getVersion`) built on that;
//! - connection open/close transitions republished as [`Aria2Event`]s on an
//!   [`EventBus`].
//!
//! Operations are fire-and-forget. They return a [`SendOutcome`] describing
//! what happened to the outbound frame; the daemon's reply only shows up
//! later through [`Aria2Client::on_message`].
//!
//! Replies and lifecycle signals wait on an unbounded queue until the owner
//! calls [`Aria2Client::process_pending`] or [`Aria2Client::next_event`]. A
//! client that only submits calls and never drains keeps every reply queued.
//!
//! # Example
//!
//! ```rust,ignore
//! use aria2_client::{Aria2Client, ClientOptions, ProtocolEvent};
//!
//! let mut client = Aria2Client::new(ClientOptions::default());
//! client.on_open(|event| tracing::info!("aria2 is {}", event.ready_state()));
//! client.connect(None, Some("s3cret"), None)?;
//! loop {
//!     match client.next_event().await {
//!         ProtocolEvent::Opened => {
//!             client.add_uri("https://example.com/file.iso", None, None);
//!         }
//!         ProtocolEvent::Closed(_) => break,
//!         _ => {}
//!     }
//! }
//! ```

use super::event::Aria2Event;
use super::options::{DownloadOptions, UriList};
use super::status::ConnectionStatus;
use crate::config::{Aria2Methods, ClientConfig, ClientOptions};
use crate::events::{EventBus, ListenerId, SubscribeOptions};
use crate::protocol::{IdMode, Inbound, ProtocolClient, ProtocolEvent, Request};
use crate::transport::{
    CloseOutcome, Connector, ReadyState, SendOutcome, Transport, WebSocketConnector,
};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Control client for one aria2 daemon.
#[derive(Debug)]
pub struct Aria2Client {
    rpc: ProtocolClient,
    token: Option<String>,
    timeout: Duration,
    events: EventBus<Aria2Event>,
}

impl Aria2Client {
    /// Create a client that connects over WebSocket with integer message ids.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_connector(options, Arc::new(WebSocketConnector), IdMode::Integer)
    }

    /// Create a client over an arbitrary connector.
    pub fn with_connector(
        options: ClientOptions,
        connector: Arc<dyn Connector>,
        id_mode: IdMode,
    ) -> Self {
        let transport = Transport::new(options.url, connector, id_mode);
        Self {
            rpc: ProtocolClient::new(transport),
            token: options.token,
            timeout: options.timeout,
            events: EventBus::new(),
        }
    }

    pub fn url(&self) -> &str {
        self.rpc.transport().url()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Advisory deadline; the client itself never times a request out.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ready_state(&self) -> Option<ReadyState> {
        self.rpc.transport().ready_state()
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::from_ready_state(self.ready_state())
    }

    /// Wire form of the secret, derived on every call.
    pub fn build_secret(&self) -> Option<String> {
        self.token
            .as_ref()
            .map(|token| format!("{}{}", ClientConfig::TOKEN_PREFIX, token))
    }

    /// Prepend the secret (when configured) to `inputs`.
    pub fn build_params(&self, inputs: Vec<Value>) -> Vec<Value> {
        let mut params = Vec::with_capacity(inputs.len() + 1);
        if let Some(secret) = self.build_secret() {
            params.push(Value::String(secret));
        }
        params.extend(inputs);
        params
    }

    /// Build an authenticated request. Advances the id counter.
    pub fn build_request(&mut self, method: &str, inputs: Vec<Value>) -> Request {
        let params = self.build_params(inputs);
        self.rpc.build_request(method, params)
    }

    /// Open a new connection.
    ///
    /// Each `Some` argument replaces the stored value first; `None` keeps it.
    /// An existing connection is always replaced, never reused.
    pub fn connect(
        &mut self,
        url: Option<&str>,
        token: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        if let Some(url) = url {
            self.rpc.transport_mut().set_url(url);
        }
        if let Some(token) = token {
            self.token = Some(token.to_string());
        }
        if let Some(timeout) = timeout {
            self.timeout = timeout;
        }
        self.rpc.transport_mut().create_connection()
    }

    /// Request a graceful close. A no-op (logged) unless the connection is open.
    pub fn disconnect(&mut self) -> CloseOutcome {
        self.rpc.transport_mut().close()
    }

    /// Submit an authenticated call to any remote method.
    pub fn call(&mut self, method: &str, inputs: Vec<Value>) -> SendOutcome {
        let request = self.build_request(method, inputs);
        self.rpc.submit(&request)
    }

    /// Queue a new download.
    ///
    /// `position` without `options` sends an empty option record so the
    /// position lands in the third slot. Trailing absent arguments are left out.
    pub fn add_uri(
        &mut self,
        uris: impl Into<UriList>,
        options: Option<DownloadOptions>,
        position: Option<u32>,
    ) -> SendOutcome {
        let uris: UriList = uris.into();
        let mut inputs = vec![uris.to_value()];
        match (options, position) {
            (Some(options), Some(position)) => {
                inputs.push(options.to_value());
                inputs.push(Value::from(position));
            }
            (None, Some(position)) => {
                inputs.push(DownloadOptions::new().to_value());
                inputs.push(Value::from(position));
            }
            (Some(options), None) => inputs.push(options.to_value()),
            (None, None) => {}
        }
        self.call(Aria2Methods::ADD_URI, inputs)
    }

    /// Ask the daemon for its version and enabled features.
    pub fn get_version(&mut self) -> SendOutcome {
        self.call(Aria2Methods::GET_VERSION, Vec::new())
    }

    /// Subscribe to an event name (`"open"` or `"close"`).
    pub fn subscribe<F>(
        &mut self,
        name: impl Into<String>,
        listener: F,
        options: SubscribeOptions,
    ) -> ListenerId
    where
        F: FnMut(&Aria2Event) + Send + 'static,
    {
        self.events.subscribe(name, listener, options)
    }

    pub fn unsubscribe(&mut self, name: &str, id: ListenerId) -> bool {
        self.events.unsubscribe(name, id)
    }

    pub fn on_open<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Aria2Event) + Send + 'static,
    {
        self.subscribe(Aria2Event::OPEN, listener, SubscribeOptions::default())
    }

    pub fn on_close<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Aria2Event) + Send + 'static,
    {
        self.subscribe(Aria2Event::CLOSE, listener, SubscribeOptions::default())
    }

    /// Observe every inbound frame (responses, notifications, unreadable frames).
    pub fn on_message<F>(&mut self, handler: F)
    where
        F: FnMut(&Inbound) + Send + 'static,
    {
        self.rpc.set_inbound_handler(handler);
    }

    /// Handle every signal queued so far. Returns how many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.rpc.try_next_event() {
            self.dispatch(&event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next signal, handle it, and return it.
    ///
    /// Never resolves while no connection is producing signals; bound it with
    /// a timeout or stop after [`ProtocolEvent::Closed`].
    pub async fn next_event(&mut self) -> ProtocolEvent {
        let event = self.rpc.next_event().await;
        self.dispatch(&event);
        event
    }

    fn dispatch(&mut self, event: &ProtocolEvent) {
        // A signal only gets here for the current connection, so one exists.
        let ready_state = self.ready_state().unwrap_or(ReadyState::Closed);
        match event {
            ProtocolEvent::Opened => {
                info!("Connected to aria2 at {}", self.url());
                self.events.publish(&Aria2Event::Opened { ready_state });
            }
            ProtocolEvent::Closed(info) => {
                info!("Disconnected from aria2 (code {:?})", info.code);
                self.events.publish(&Aria2Event::Closed { ready_state });
            }
            ProtocolEvent::Errored(message) => {
                debug!("Not republishing transport error: {}", message);
            }
            ProtocolEvent::Message(_) => {}
        }
    }
}
