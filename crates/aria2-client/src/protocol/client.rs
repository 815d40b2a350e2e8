//! Generic JSON-RPC client over a [`Transport`].
//!
//! Builds request envelopes, submits them, and classifies inbound frames.
//! There is no pending-request table: a submitted request is never matched to
//! its response here. Consumers that need results correlate inbound
//! [`Inbound::Response`] ids with [`SendOutcome::Sent`] ids themselves.

use super::envelope::{Inbound, Request};
use crate::transport::{CloseInfo, SendOutcome, SignalKind, Transport};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Callback receiving every parsed inbound frame.
pub type InboundHandler = Box<dyn FnMut(&Inbound) + Send>;

/// A transport signal after protocol-level handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    Opened,
    Message(Inbound),
    Closed(CloseInfo),
    Errored(String),
}

/// JSON-RPC request builder and inbound dispatcher.
pub struct ProtocolClient {
    transport: Transport,
    inbound_handler: Option<InboundHandler>,
}

impl fmt::Debug for ProtocolClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolClient")
            .field("transport", &self.transport)
            .field("inbound_handler", &self.inbound_handler.is_some())
            .finish()
    }
}

impl ProtocolClient {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            inbound_handler: None,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport {
        &mut self.transport
    }

    /// Build a request with a fresh identifier. Advances the id counter.
    pub fn build_request(&mut self, method: &str, params: Vec<Value>) -> Request {
        let id = self.transport.next_message_id();
        Request::new(method, params, id)
    }

    /// Hand `request` to the transport.
    pub fn submit(&mut self, request: &Request) -> SendOutcome {
        self.transport.send(request)
    }

    /// Install the hook that sees every inbound frame, replacing any previous one.
    pub fn set_inbound_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Inbound) + Send + 'static,
    {
        self.inbound_handler = Some(Box::new(handler));
    }

    pub fn clear_inbound_handler(&mut self) {
        self.inbound_handler = None;
    }

    /// Handle the next queued signal, if any, without waiting.
    pub fn try_next_event(&mut self) -> Option<ProtocolEvent> {
        let kind = self.transport.try_next_signal()?;
        Some(self.handle(kind))
    }

    /// Wait for and handle the next signal. Pends while no connection is active.
    pub async fn next_event(&mut self) -> ProtocolEvent {
        let kind = self.transport.next_signal().await;
        self.handle(kind)
    }

    fn handle(&mut self, kind: SignalKind) -> ProtocolEvent {
        match kind {
            SignalKind::Open => ProtocolEvent::Opened,
            SignalKind::Close(info) => ProtocolEvent::Closed(info),
            SignalKind::Error(message) => ProtocolEvent::Errored(message),
            SignalKind::Message(text) => {
                let inbound = Inbound::parse(&text);
                self.on_inbound(&inbound);
                ProtocolEvent::Message(inbound)
            }
        }
    }

    fn on_inbound(&mut self, inbound: &Inbound) {
        match inbound {
            Inbound::Response(response) => match &response.error {
                Some(error) => warn!(
                    "Remote error for request {:?}: {} ({})",
                    response.id, error.message, error.code
                ),
                None => debug!("Response for request {:?}", response.id),
            },
            Inbound::Notification(notification) => {
                debug!("Notification {}", notification.method);
            }
            Inbound::Malformed { reason, .. } => {
                warn!("Unreadable inbound frame: {}", reason);
            }
        }
        if let Some(handler) = self.inbound_handler.as_mut() {
            handler(inbound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::protocol::{IdMode, MessageId};
    use crate::testing::MockConnector;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn client(connector: &MockConnector, mode: IdMode) -> ProtocolClient {
        ProtocolClient::new(Transport::new(
            ClientConfig::DEFAULT_URL,
            Arc::new(connector.clone()),
            mode,
        ))
    }

    #[test]
    fn test_build_request_ids_strictly_increase() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Integer);

        let ids: Vec<MessageId> = (0..100)
            .map(|_| rpc.build_request("aria2.getVersion", vec![]).id)
            .collect();

        assert_eq!(ids.first(), Some(&MessageId::from(1)));
        assert!(ids.windows(2).all(|pair| match (&pair[0], &pair[1]) {
            (MessageId::Number(a), MessageId::Number(b)) => b.as_u64() > a.as_u64(),
            _ => false,
        }));
    }

    #[test]
    fn test_build_request_uuid_mode() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Uuid);
        let a = rpc.build_request("m", vec![]);
        let b = rpc.build_request("m", vec![]);
        assert!(matches!(a.id, MessageId::String(_)));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_build_request_keeps_params() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Integer);
        let request = rpc.build_request("aria2.tellStatus", vec![json!("2089b05ecca3d829")]);
        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.params, Some(vec![json!("2089b05ecca3d829")]));
    }

    #[test]
    fn test_inbound_handler_sees_messages() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Integer);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        rpc.set_inbound_handler(move |inbound| seen_clone.lock().unwrap().push(inbound.clone()));

        rpc.transport_mut().create_connection().unwrap();
        let remote = connector.latest().unwrap();
        remote.open();
        remote.deliver(r#"{"jsonrpc":"2.0","result":"OK","id":1}"#);
        remote.deliver("garbage");

        assert_eq!(rpc.try_next_event(), Some(ProtocolEvent::Opened));
        assert!(matches!(
            rpc.try_next_event(),
            Some(ProtocolEvent::Message(Inbound::Response(_)))
        ));
        assert!(matches!(
            rpc.try_next_event(),
            Some(ProtocolEvent::Message(Inbound::Malformed { .. }))
        ));
        assert_eq!(rpc.try_next_event(), None);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_clear_inbound_handler() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Integer);
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        rpc.set_inbound_handler(move |_| *count_clone.lock().unwrap() += 1);
        rpc.clear_inbound_handler();

        rpc.transport_mut().create_connection().unwrap();
        connector.latest().unwrap().deliver(r#"{"jsonrpc":"2.0","result":1,"id":1}"#);
        rpc.try_next_event();

        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_close_and_error_signals() {
        let connector = MockConnector::new();
        let mut rpc = client(&connector, IdMode::Integer);
        rpc.transport_mut().create_connection().unwrap();
        let remote = connector.latest().unwrap();
        remote.fail("connection reset");

        assert_eq!(
            rpc.try_next_event(),
            Some(ProtocolEvent::Errored("connection reset".into()))
        );
        assert!(matches!(
            rpc.try_next_event(),
            Some(ProtocolEvent::Closed(_))
        ));
    }
}
