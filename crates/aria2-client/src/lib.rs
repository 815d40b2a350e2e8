//! aria2 Client - JSON-RPC 2.0 control client for the aria2 download daemon.
//!
//! The crate talks to a running `aria2c --enable-rpc` over one long-lived
//! WebSocket. It is layered by composition:
//!
//! - [`transport`] owns the connection, its lifecycle and message ids;
//! - [`protocol`] builds JSON-RPC envelopes and classifies inbound frames;
//! - [`aria2`] adds the secret token, typed operations and lifecycle events;
//! - [`events`] is the publish/subscribe registry those events go through.
//!
//! Calls are fire-and-forget: an operation returns once its frame has been
//! queued (or refused), and replies are only visible through the inbound
//! hook. Signals from the socket are handled when the owner drives the client
//! with [`Aria2Client::process_pending`] or [`Aria2Client::next_event`]; until
//! then they stay on an unbounded queue.
//!
//! # Example
//!
//! ```rust,ignore
//! use aria2_client::{Aria2Client, ClientOptions, DownloadOptions, ProtocolEvent};
//!
//! #[tokio::main]
//! async fn main() -> aria2_client::Result<()> {
//!     let mut client = Aria2Client::new(ClientOptions::default());
//!     client.on_message(|inbound| println!("{:?}", inbound));
//!     client.connect(None, Some("s3cret"), None)?;
//!
//!     loop {
//!         match client.next_event().await {
//!             ProtocolEvent::Opened => {
//!                 client.add_uri(
//!                     "https://example.com/file.iso",
//!                     Some(DownloadOptions::new().dir("/downloads")),
//!                     None,
//!                 );
//!                 client.get_version();
//!             }
//!             ProtocolEvent::Closed(_) => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod aria2;
pub mod config;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types
pub use aria2::{Aria2Client, Aria2Event, ConnectionStatus, DownloadOptions, UriList};
pub use config::{ClientConfig, ClientOptions, ClientOptionsUpdate};
pub use error::{Aria2Error, Result};
pub use events::{Event, EventBus, ListenerId, SubscribeOptions};
pub use protocol::{
    IdMode, Inbound, MessageId, Notification, ProtocolClient, ProtocolEvent, Request, Response,
    RpcError,
};
pub use transport::{
    CloseInfo, CloseOutcome, Connection, Connector, ReadyState, SendOutcome, Transport,
    WebSocketConnector,
};
