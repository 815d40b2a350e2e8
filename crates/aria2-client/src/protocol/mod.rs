//! JSON-RPC 2.0 layer: envelope types, identifiers, and the protocol client.

pub mod client;
pub mod envelope;

pub use client::{InboundHandler, ProtocolClient, ProtocolEvent};
pub use envelope::{
    IdGenerator, IdMode, Inbound, MessageId, Notification, Request, Response, RpcError,
};
