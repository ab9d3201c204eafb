//! Typed simulation events with buffered post-tick delivery.
//!
//! Events are emitted during the command/schedule/agent phases and delivered
//! in batch during post-tick. Passive listeners registered per kind receive
//! them read-only; polling consumers call [`EventBus::drain`] instead. Kinds
//! can be suppressed, which makes emitting them free.

use crate::fixed::Ticks;
use crate::id::{ItemId, OrderId, StageId, TaskId, WorkerId};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Tasks --
    TaskCreated {
        task: TaskId,
        dept: StageId,
        carry: bool,
        tick: Ticks,
    },
    TaskCompleted {
        task: TaskId,
        dept: StageId,
        tick: Ticks,
    },
    TaskFailed {
        task: TaskId,
        dept: StageId,
        tick: Ticks,
    },

    // -- Items --
    ItemArrived {
        item: ItemId,
        stage: StageId,
        tick: Ticks,
    },
    ItemDelivered {
        item: ItemId,
        order: OrderId,
        tick: Ticks,
    },

    // -- Department observability --
    DepartmentStalled {
        stage: StageId,
        tick: Ticks,
    },
    DepartmentResumed {
        stage: StageId,
        tick: Ticks,
    },

    // -- Staffing --
    WorkerHired {
        worker: WorkerId,
        stage: StageId,
        tick: Ticks,
    },
    WorkerFired {
        worker: WorkerId,
        stage: StageId,
        tick: Ticks,
    },

    // -- Orders --
    OrderAccepted {
        order: OrderId,
        units: u32,
        tick: Ticks,
    },
    OrderCompleted {
        order: OrderId,
        tick: Ticks,
    },

    // -- Commands --
    CommandRejected {
        reason: String,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and listener
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TaskCreated,
    TaskCompleted,
    TaskFailed,
    ItemArrived,
    ItemDelivered,
    DepartmentStalled,
    DepartmentResumed,
    WorkerHired,
    WorkerFired,
    OrderAccepted,
    OrderCompleted,
    CommandRejected,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 12;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TaskCreated { .. } => EventKind::TaskCreated,
            Event::TaskCompleted { .. } => EventKind::TaskCompleted,
            Event::TaskFailed { .. } => EventKind::TaskFailed,
            Event::ItemArrived { .. } => EventKind::ItemArrived,
            Event::ItemDelivered { .. } => EventKind::ItemDelivered,
            Event::DepartmentStalled { .. } => EventKind::DepartmentStalled,
            Event::DepartmentResumed { .. } => EventKind::DepartmentResumed,
            Event::WorkerHired { .. } => EventKind::WorkerHired,
            Event::WorkerFired { .. } => EventKind::WorkerFired,
            Event::OrderAccepted { .. } => EventKind::OrderAccepted,
            Event::OrderCompleted { .. } => EventKind::OrderCompleted,
            Event::CommandRejected { .. } => EventKind::CommandRejected,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only during post-tick delivery.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// The event bus: one pending buffer filled during the tick, a bounded
/// retained queue for polling consumers, suppression flags and per-kind
/// passive listeners.
pub struct EventBus {
    /// Events emitted during the current tick, awaiting delivery.
    pending: Vec<Event>,
    /// Delivered events retained for `drain()`. Bounded; oldest drop first.
    retained: VecDeque<Event>,
    retained_capacity: usize,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<PassiveListener>; EVENT_KIND_COUNT],
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending)
            .field("retained", &self.retained)
            .field("retained_capacity", &self.retained_capacity)
            .field("suppressed", &self.suppressed)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Create a bus retaining up to `retained_capacity` delivered events for
    /// polling consumers. A capacity of 0 is clamped to 1.
    pub fn new(retained_capacity: usize) -> Self {
        Self {
            pending: Vec::new(),
            retained: VecDeque::new(),
            retained_capacity: retained_capacity.max(1),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Emit an event. Suppressed kinds are discarded without allocation.
    pub fn emit(&mut self, event: Event) {
        if self.suppressed[event.kind().index()] {
            return;
        }
        self.pending.push(event);
    }

    /// Suppress an event kind entirely.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Register a passive listener for one event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(listener);
    }

    /// Post-tick delivery: run listeners over this tick's events, then move
    /// them into the retained queue.
    pub fn deliver(&mut self) {
        for event in self.pending.drain(..) {
            for listener in &mut self.listeners[event.kind().index()] {
                listener(&event);
            }
            if self.retained.len() >= self.retained_capacity {
                self.retained.pop_front();
            }
            self.retained.push_back(event);
        }
    }

    /// Take all retained events, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        self.retained.drain(..).collect()
    }

    /// Number of events awaiting post-tick delivery.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn stalled(tick: Ticks) -> Event {
        Event::DepartmentStalled { stage: StageId(0), tick }
    }

    #[test]
    fn deliver_moves_pending_to_retained() {
        let mut bus = EventBus::default();
        bus.emit(stalled(1));
        assert_eq!(bus.pending_count(), 1);

        bus.deliver();
        assert_eq!(bus.pending_count(), 0);
        let drained = bus.drain();
        assert_eq!(drained, vec![stalled(1)]);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn suppressed_kinds_are_discarded() {
        let mut bus = EventBus::default();
        bus.suppress(EventKind::DepartmentStalled);
        bus.emit(stalled(1));
        bus.deliver();
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn listeners_see_only_their_kind() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(0u32));
        let seen_in_listener = Rc::clone(&seen);
        bus.on_passive(
            EventKind::DepartmentStalled,
            Box::new(move |_| *seen_in_listener.borrow_mut() += 1),
        );

        bus.emit(stalled(1));
        bus.emit(Event::DepartmentResumed { stage: StageId(0), tick: 2 });
        bus.deliver();
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn retained_queue_is_bounded() {
        let mut bus = EventBus::new(2);
        for tick in 0..5 {
            bus.emit(stalled(tick));
        }
        bus.deliver();
        let drained = bus.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0], stalled(3));
        assert_eq!(drained[1], stalled(4));
    }
}
