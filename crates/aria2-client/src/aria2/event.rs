//! Lifecycle events published by [`super::Aria2Client`].

use crate::events::Event;
use crate::transport::ReadyState;

/// A connection state transition, carrying the ready state observed when it
/// was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aria2Event {
    Opened { ready_state: ReadyState },
    Closed { ready_state: ReadyState },
}

impl Aria2Event {
    pub const OPEN: &'static str = "open";
    pub const CLOSE: &'static str = "close";

    pub fn ready_state(&self) -> ReadyState {
        match self {
            Aria2Event::Opened { ready_state } | Aria2Event::Closed { ready_state } => {
                *ready_state
            }
        }
    }
}

impl Event for Aria2Event {
    fn name(&self) -> &str {
        match self {
            Aria2Event::Opened { .. } => Self::OPEN,
            Aria2Event::Closed { .. } => Self::CLOSE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let opened = Aria2Event::Opened {
            ready_state: ReadyState::Open,
        };
        let closed = Aria2Event::Closed {
            ready_state: ReadyState::Closed,
        };
        assert_eq!(opened.name(), "open");
        assert_eq!(closed.name(), "close");
        assert_eq!(closed.ready_state(), ReadyState::Closed);
    }
}
