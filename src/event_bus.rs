//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

//-------------------------------------------------------------------------------------------------------------------

/// A handler registered with an [`EventBus`].
type Handler<T> = Box<dyn Fn(&T) + Send + 'static>;

//-------------------------------------------------------------------------------------------------------------------

struct Listener<T>
{
    handler : Handler<T>,
    /// `true` if this listener must be removed after its first invocation.
    once    : bool,
}

//-------------------------------------------------------------------------------------------------------------------

/// Typed publish/subscribe registry.
///
/// Handlers for a given event name fire in registration order. A handler that panics is caught and logged; delivery
/// continues to subsequent handlers. This mirrors the base runtime's Event Bus component: the runtime uses one
/// `EventBus<RuntimeEvent<..>>` internally, but the type itself is generic so it can be reused for any payload.
pub struct EventBus<T>
{
    listeners    : HashMap<String, Vec<Listener<T>>>,
    max_listeners : usize,
    warned        : HashMap<String, ()>,
    emit_depth    : AtomicUsize,
}

impl<T> std::fmt::Debug for EventBus<T>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("EventBus")
            .field("event_names", &self.event_names())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl<T> Default for EventBus<T>
{
    fn default() -> Self
    {
        Self{
            listeners     : HashMap::new(),
            max_listeners : 10,
            warned        : HashMap::new(),
            emit_depth    : AtomicUsize::new(0),
        }
    }
}

impl<T> EventBus<T>
{
    /// Make a new, empty event bus.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Set the per-event listener count above which a warning is emitted once.
    pub fn set_max_listeners(&mut self, max: usize)
    {
        self.max_listeners = max;
    }

    /// Register a handler that fires on every emission of `event`.
    pub fn on(&mut self, event: impl Into<String>, handler: impl Fn(&T) + Send + 'static)
    {
        self.push(event.into(), Listener{ handler: Box::new(handler), once: false });
    }

    /// Register a handler that fires at most once, then self-removes.
    ///
    /// The listener is removed *before* the handler body runs, so a panicking handler still only fires once.
    pub fn once(&mut self, event: impl Into<String>, handler: impl Fn(&T) + Send + 'static)
    {
        self.push(event.into(), Listener{ handler: Box::new(handler), once: true });
    }

    fn push(&mut self, event: String, listener: Listener<T>)
    {
        let bucket = self.listeners.entry(event.clone()).or_default();
        bucket.push(listener);

        if bucket.len() > self.max_listeners && !self.warned.contains_key(&event)
        {
            tracing::warn!(event = %event, count = bucket.len(), "event bus listener count exceeds max_listeners");
            self.warned.insert(event, ());
        }
    }

    /// Remove handlers for `event`. If this bus could distinguish handler identity it would remove only one; since
    /// Rust closures have no stable identity here, `off` removes all handlers for the event (matching the common
    /// "clear this event" usage of the base design when no specific handler reference is passed).
    pub fn off(&mut self, event: &str)
    {
        self.listeners.remove(event);
        self.warned.remove(event);
    }

    /// Remove all handlers for all events.
    pub fn remove_all(&mut self)
    {
        self.listeners.clear();
        self.warned.clear();
    }

    /// Number of handlers currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize
    {
        self.listeners.get(event).map(Vec::len).unwrap_or(0)
    }

    /// Whether any handler is registered for `event`.
    pub fn has_listeners(&self, event: &str) -> bool
    {
        self.listener_count(event) > 0
    }

    /// Names of all events with at least one handler.
    pub fn event_names(&self) -> Vec<String>
    {
        self.listeners.keys().cloned().collect()
    }

    /// Invoke all handlers registered for `event` with `data`, in registration order.
    ///
    /// `once` handlers are removed before their handler body runs. A handler that panics is caught (via
    /// [`std::panic::catch_unwind`]) and logged; later handlers still run. Structural modification performed by a
    /// handler (calling `on`/`off` on this same bus re-entrantly is not supported since `&mut self` is required to
    /// emit) cannot disturb the in-flight handler list because we snapshot it up front whenever a `once` listener is
    /// present, and otherwise drain-and-restore the permanent listeners.
    pub fn emit(&mut self, event: &str, data: &T)
    {
        let Some(mut bucket) = self.listeners.remove(event) else { return; };

        // split off `once` listeners permanently; keep permanent ones to put back after emission
        let mut permanent = Vec::with_capacity(bucket.len());
        let mut to_fire = Vec::with_capacity(bucket.len());
        while let Some(listener) = bucket.pop()
        {
            // pop() reverses order, so we prepend to restore registration order
            to_fire.insert(0, listener);
        }

        for listener in to_fire
        {
            let handler = &listener.handler;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(data)));
            if let Err(panic) = result
            {
                tracing::error!(event = %event, ?panic, "event bus handler panicked");
            }
            if !listener.once
            {
                permanent.push(listener);
            }
        }

        if !permanent.is_empty()
        {
            self.listeners.insert(event.to_string(), permanent);
        }
        else
        {
            self.warned.remove(event);
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn handlers_fire_in_registration_order()
    {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut bus: EventBus<()> = EventBus::new();

        let o1 = order.clone();
        bus.on("x", move |_| o1.lock().unwrap().push(1));
        let o2 = order.clone();
        bus.on("x", move |_| o2.lock().unwrap().push(2));

        bus.emit("x", &());
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn once_fires_at_most_once()
    {
        let count = Arc::new(AtomicU32::new(0));
        let mut bus: EventBus<()> = EventBus::new();
        let c = count.clone();
        bus.once("x", move |_| { c.fetch_add(1, Ordering::SeqCst); });

        bus.emit("x", &());
        bus.emit("x", &());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.has_listeners("x"));
    }

    #[test]
    fn empty_event_entry_is_deleted()
    {
        let mut bus: EventBus<()> = EventBus::new();
        bus.once("x", |_| {});
        bus.emit("x", &());
        assert_eq!(bus.listener_count("x"), 0);
        assert!(!bus.event_names().contains(&"x".to_string()));
    }

    #[test]
    fn panicking_handler_does_not_abort_delivery()
    {
        let count = Arc::new(AtomicU32::new(0));
        let mut bus: EventBus<()> = EventBus::new();
        bus.on("x", |_| panic!("boom"));
        let c = count.clone();
        bus.on("x", move |_| { c.fetch_add(1, Ordering::SeqCst); });

        bus.emit("x", &());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_clears_listeners_for_event()
    {
        let mut bus: EventBus<()> = EventBus::new();
        bus.on("x", |_| {});
        bus.on("y", |_| {});
        bus.off("x");
        assert!(!bus.has_listeners("x"));
        assert!(bus.has_listeners("y"));
    }
}

//-------------------------------------------------------------------------------------------------------------------
