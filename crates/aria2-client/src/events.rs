//! Generic multi-listener publish/subscribe.
//!
//! [`EventBus`] knows nothing about the payload beyond its name. Listeners are
//! invoked synchronously, in registration order, on the task that calls
//! [`EventBus::publish`]. A panicking listener is not caught: the panic unwinds
//! into the publisher and later listeners for that event are skipped.

use std::collections::HashMap;
use std::fmt;

/// A payload that can be routed by name.
pub trait Event {
    /// Name listeners subscribe to (for example `"open"`).
    fn name(&self) -> &str;
}

/// Registration flags.
///
/// `once` removes the listener after its first invocation. `capture` is
/// carried with the registration for callers that mirror DOM-style listener
/// options; the bus does not interpret it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub once: bool,
    pub capture: bool,
}

impl SubscribeOptions {
    /// Options for a listener that fires at most once.
    pub fn once() -> Self {
        Self {
            once: true,
            capture: false,
        }
    }
}

/// Identity of a registered listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Boxed listener callback.
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

struct Registration<E> {
    id: ListenerId,
    options: SubscribeOptions,
    listener: Listener<E>,
}

/// Named publish/subscribe registry for one payload type.
pub struct EventBus<E> {
    listeners: HashMap<String, Vec<Registration<E>>>,
    next_id: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, regs)| (name.as_str(), regs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("listeners", &counts)
            .finish()
    }
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events named `name`.
    pub fn subscribe<F>(
        &mut self,
        name: impl Into<String>,
        listener: F,
        options: SubscribeOptions,
    ) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(name.into())
            .or_default()
            .push(Registration {
                id,
                options,
                listener: Box::new(listener),
            });
        id
    }

    /// Remove the listener registered under `name` with identity `id`.
    ///
    /// Returns `false` if no such registration exists.
    pub fn unsubscribe(&mut self, name: &str, id: ListenerId) -> bool {
        let Some(registrations) = self.listeners.get_mut(name) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|reg| reg.id != id);
        let removed = registrations.len() != before;
        if registrations.is_empty() {
            self.listeners.remove(name);
        }
        removed
    }

    /// Deliver `event` to every listener registered for its name.
    ///
    /// Returns the number of listeners invoked.
    pub fn publish(&mut self, event: &E) -> usize {
        let Some(registrations) = self.listeners.get_mut(event.name()) else {
            return 0;
        };
        let mut invoked = 0;
        registrations.retain_mut(|reg| {
            (reg.listener)(event);
            invoked += 1;
            !reg.options.once
        });
        invoked
    }

    /// Number of listeners currently registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    /// Options a listener was registered with.
    pub fn options(&self, name: &str, id: ListenerId) -> Option<SubscribeOptions> {
        self.listeners
            .get(name)?
            .iter()
            .find(|reg| reg.id == id)
            .map(|reg| reg.options)
    }
}
