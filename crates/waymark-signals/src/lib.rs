//! # waymark-signals
//!
//! A small decoupled event system. [`Signal`] is a single ordered list of
//! receivers; [`EventBus`] groups signals under string event names and adds
//! *deferred* listener groups, which the dispatcher drains at a fixed point
//! of every request (the CSRF hook).
//!
//! ## Usage
//!
//! ```
//! use waymark_signals::Signal;
//! use std::sync::Arc;
//!
//! struct RouteRegistered;
//!
//! let signal: Signal<RouteRegistered> = Signal::new();
//!
//! signal.connect("my_handler", Arc::new(|_sender: &RouteRegistered| {
//!     println!("A route was registered!");
//!     None
//! }));
//!
//! let results = signal.send(&RouteRegistered);
//! assert_eq!(results.len(), 1);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Event name the dispatcher drains for deferred CSRF verdicts.
pub const CSRF_VERIFY: &str = "csrf.verify";

/// The value a receiver may hand back to the sender.
pub type ReceiverResult = Option<Box<dyn Any + Send>>;

/// The type signature for a signal receiver callback.
///
/// Receivers accept a reference to the signal payload and may optionally
/// return a boxed value. Receivers must be `Send + Sync` so that signals
/// can be dispatched from any thread.
pub type SignalReceiver<T> = Arc<dyn Fn(&T) -> ReceiverResult + Send + Sync>;

/// A signal that can be connected to and dispatched.
///
/// Each signal carries a payload type `T`. Receivers are called in the order
/// they were connected.
pub struct Signal<T: 'static> {
    receivers: RwLock<Vec<(String, SignalReceiver<T>)>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("receiver_count", &self.receiver_count())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a new signal with no connected receivers.
    pub fn new() -> Self {
        Self {
            receivers: RwLock::new(Vec::new()),
        }
    }

    /// Connects a receiver to this signal.
    ///
    /// If a receiver with the same ID is already connected, it is replaced in place.
    pub fn connect(&self, receiver_id: impl Into<String>, callback: SignalReceiver<T>) {
        let id = receiver_id.into();
        let mut receivers = self.receivers.write().expect("signal lock poisoned");

        if let Some(entry) = receivers.iter_mut().find(|(rid, _)| *rid == id) {
            entry.1 = callback;
        } else {
            receivers.push((id, callback));
        }
    }

    /// Disconnects the receiver with the given ID.
    ///
    /// Returns `true` if a receiver was found and removed.
    pub fn disconnect(&self, receiver_id: &str) -> bool {
        let mut receivers = self.receivers.write().expect("signal lock poisoned");
        let len_before = receivers.len();
        receivers.retain(|(id, _)| id != receiver_id);
        receivers.len() < len_before
    }

    /// Sends the signal to all connected receivers, in connection order.
    pub fn send(&self, sender: &T) -> Vec<ReceiverResult> {
        // Clone the list so receivers may connect/disconnect while being called.
        let receivers: Vec<SignalReceiver<T>> = self
            .receivers
            .read()
            .expect("signal lock poisoned")
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        receivers.iter().map(|callback| callback(sender)).collect()
    }

    /// Returns the number of connected receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers.read().expect("signal lock poisoned").len()
    }
}

struct EventSlots<T: 'static> {
    immediate: Arc<Signal<T>>,
    deferred: Vec<Arc<Signal<T>>>,
}

/// A registry of named events.
///
/// Every event has one immediate signal, fired by [`emit`](Self::emit), and
/// any number of deferred listener groups opened with
/// [`deferred`](Self::deferred) and drained by
/// [`emit_deferred`](Self::emit_deferred). Deferred results come back grouped,
/// one inner vector per group, in the order the groups were opened.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use waymark_signals::EventBus;
///
/// let bus: EventBus<u32> = EventBus::new();
/// bus.deferred("audit").connect("a", Arc::new(|n: &u32| Some(Box::new(*n) as Box<dyn std::any::Any + Send>)));
/// bus.deferred("audit").connect("b", Arc::new(|_: &u32| None));
///
/// let groups = bus.emit_deferred("audit", &7);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0][0].as_ref().unwrap().downcast_ref::<u32>(), Some(&7));
/// assert!(groups[1][0].is_none());
/// ```
pub struct EventBus<T: 'static> {
    events: RwLock<HashMap<String, EventSlots<T>>>,
}

impl<T: 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events = self.events.read().expect("event bus lock poisoned");
        let mut names: Vec<&String> = events.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

impl<T: 'static> EventBus<T> {
    /// Creates an event bus with no events.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the immediate signal for `event`, creating it if needed.
    pub fn signal(&self, event: &str) -> Arc<Signal<T>> {
        {
            let events = self.events.read().expect("event bus lock poisoned");
            if let Some(slots) = events.get(event) {
                return Arc::clone(&slots.immediate);
            }
        }

        let mut events = self.events.write().expect("event bus lock poisoned");
        Arc::clone(
            &events
                .entry(event.to_string())
                .or_insert_with(|| EventSlots {
                    immediate: Arc::new(Signal::new()),
                    deferred: Vec::new(),
                })
                .immediate,
        )
    }

    /// Connects an immediate listener to `event`.
    pub fn listen(&self, event: &str, receiver_id: impl Into<String>, callback: SignalReceiver<T>) {
        self.signal(event).connect(receiver_id, callback);
    }

    /// Opens a new deferred listener group for `event` and returns it for connecting.
    pub fn deferred(&self, event: &str) -> Arc<Signal<T>> {
        let group = Arc::new(Signal::new());
        let mut events = self.events.write().expect("event bus lock poisoned");
        events
            .entry(event.to_string())
            .or_insert_with(|| EventSlots {
                immediate: Arc::new(Signal::new()),
                deferred: Vec::new(),
            })
            .deferred
            .push(Arc::clone(&group));
        group
    }

    /// Fires the immediate listeners of `event`.
    pub fn emit(&self, event: &str, payload: &T) -> Vec<ReceiverResult> {
        let signal = {
            let events = self.events.read().expect("event bus lock poisoned");
            match events.get(event) {
                Some(slots) => Arc::clone(&slots.immediate),
                None => return Vec::new(),
            }
        };
        signal.send(payload)
    }

    /// Runs every deferred group of `event` and returns the results per group.
    pub fn emit_deferred(&self, event: &str, payload: &T) -> Vec<Vec<ReceiverResult>> {
        let groups: Vec<Arc<Signal<T>>> = {
            let events = self.events.read().expect("event bus lock poisoned");
            events
                .get(event)
                .map(|slots| slots.deferred.clone())
                .unwrap_or_default()
        };
        tracing::trace!(event, groups = groups.len(), "emitting deferred event");
        groups.iter().map(|group| group.send(payload)).collect()
    }

    /// Returns `true` if `event` has any immediate or deferred listener.
    pub fn has_listeners(&self, event: &str) -> bool {
        let events = self.events.read().expect("event bus lock poisoned");
        events.get(event).is_some_and(|slots| {
            slots.immediate.receiver_count() > 0
                || slots.deferred.iter().any(|g| g.receiver_count() > 0)
        })
    }
}
