//! aria2 download-daemon specialization of the JSON-RPC client.

pub mod client;
pub mod event;
pub mod options;
pub mod status;

pub use client::Aria2Client;
pub use event::Aria2Event;
pub use options::{DownloadOptions, UriList};
pub use status::ConnectionStatus;
