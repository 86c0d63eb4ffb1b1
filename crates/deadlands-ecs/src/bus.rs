//! Synchronous publish/subscribe channel.
//!
//! One [`EventBus`] exists per simulation. It is an explicitly constructed
//! handle: cloning it yields another handle to the same listener table, which
//! is how the engine, every system, and the state-sync adapter share it.
//!
//! Dispatch is synchronous and in subscription order. `emit` snapshots the
//! matching listeners before calling any of them, so a handler that subscribes
//! or unsubscribes during dispatch affects the next emit, not the current one.
//!
//! A handler cannot run inside its own call. When it emits, directly or
//! through another handler, an event on a topic it listens to, that event is
//! parked in the handler's backlog and delivered right after its current call
//! returns. Every other listener of the nested event still runs during the
//! nested emit, so nested events are reordered for the busy handler but never
//! lost.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::events::{GameEvent, Topic};
use crate::EventError;

struct HandlerCell<F: ?Sized> {
    backlog: RefCell<VecDeque<GameEvent>>,
    call: RefCell<F>,
}

type Handler = Rc<HandlerCell<dyn FnMut(&GameEvent)>>;

fn deliver(handler: &Handler, event: &GameEvent) {
    let Ok(mut call) = handler.call.try_borrow_mut() else {
        tracing::trace!(topic = %event.topic(), "deferring re-entrant delivery");
        handler.backlog.borrow_mut().push_back(event.clone());
        return;
    };
    (&mut *call)(event);
    loop {
        let next = handler.backlog.borrow_mut().pop_front();
        match next {
            Some(parked) => (&mut *call)(&parked),
            None => break,
        }
    }
}

/// Subscription token returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Listener {
    id: HandlerId,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Cloneable handle to a shared listener table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventBus")
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`.
    pub fn on<F>(&self, topic: Topic, handler: F) -> HandlerId
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            topic,
            handler: Rc::new(HandlerCell {
                backlog: RefCell::new(VecDeque::new()),
                call: RefCell::new(handler),
            }),
        });
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        inner.listeners.len() != before
    }

    /// Deliver `event` to every listener of its topic, in subscription order.
    /// Returns after all handlers have run.
    pub fn emit(&self, event: GameEvent) {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.topic == topic)
            .map(|l| Rc::clone(&l.handler))
            .collect();

        tracing::trace!(topic = %topic, listeners = handlers.len(), "emit");

        for handler in &handlers {
            deliver(handler, &event);
        }
    }

    /// Parse a JSON payload for `topic` and emit it.
    ///
    /// Unknown topics and malformed payloads are logged, discarded, and
    /// returned as errors so callers may surface them if they care.
    pub fn emit_json(&self, topic: &str, payload: serde_json::Value) -> Result<(), EventError> {
        match GameEvent::from_json(topic, payload) {
            Ok(event) => {
                self.emit(event);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(topic, error = %err, "discarding external event");
                Err(err)
            }
        }
    }

    /// Number of listeners subscribed to `topic`.
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.topic == topic)
            .count()
    }

    /// Whether two handles share one listener table.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::events::PlayerLevelUp;
    use std::cell::Cell;

    fn level_up(level: u32) -> GameEvent {
        GameEvent::PlayerLevelUp(PlayerLevelUp {
            entity: EntityId::new(0, 0),
            level,
        })
    }

    #[test]
    fn dispatch_follows_subscription_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            bus.on(Topic::PlayerLevelUp, move |_| log.borrow_mut().push(tag));
        }
        bus.emit(level_up(2));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn only_matching_topic_is_called() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        bus.on(Topic::EnemyKilled, move |_| h.set(h.get() + 1));
        bus.emit(level_up(2));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn off_removes_listener() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = bus.on(Topic::PlayerLevelUp, move |_| h.set(h.get() + 1));
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit(level_up(2));
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.listener_count(Topic::PlayerLevelUp), 0);
    }

    #[test]
    fn subscribe_during_dispatch_applies_to_next_emit() {
        let bus = EventBus::new();
        let late_hits = Rc::new(Cell::new(0));
        let inner_bus = bus.clone();
        let lh = Rc::clone(&late_hits);
        bus.on(Topic::PlayerLevelUp, move |_| {
            let lh = Rc::clone(&lh);
            inner_bus.on(Topic::PlayerLevelUp, move |_| lh.set(lh.get() + 1));
        });
        bus.emit(level_up(2));
        assert_eq!(late_hits.get(), 0);
        bus.emit(level_up(3));
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn reentrant_emit_reaches_the_running_handler_afterwards() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let inner_bus = bus.clone();
        bus.on(Topic::PlayerLevelUp, move |event| {
            if let GameEvent::PlayerLevelUp(e) = event {
                log.borrow_mut().push(("chain", e.level));
                if e.level < 5 {
                    inner_bus.emit(level_up(e.level + 1));
                }
            }
        });
        let log = Rc::clone(&seen);
        bus.on(Topic::PlayerLevelUp, move |event| {
            if let GameEvent::PlayerLevelUp(e) = event {
                log.borrow_mut().push(("tail", e.level));
            }
        });

        bus.emit(level_up(2));

        let seen = seen.borrow();
        let chain: Vec<u32> = seen.iter().filter(|(t, _)| *t == "chain").map(|&(_, l)| l).collect();
        let mut tail: Vec<u32> = seen.iter().filter(|(t, _)| *t == "tail").map(|&(_, l)| l).collect();
        assert_eq!(chain, vec![2, 3, 4, 5]);
        tail.sort_unstable();
        assert_eq!(tail, vec![2, 3, 4, 5]);
    }

    #[test]
    fn emit_json_discards_malformed_payloads() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        bus.on(Topic::XpCollected, move |_| h.set(h.get() + 1));
        assert!(bus
            .emit_json("xpCollected", serde_json::json!({"amount": 5.0}))
            .is_ok());
        assert!(bus
            .emit_json("xpCollected", serde_json::json!({"entity": 1}))
            .is_err());
        assert!(bus.emit_json("bogus", serde_json::json!({})).is_err());
        assert_eq!(hits.get(), 1);
    }
}
