//! Shift events and the outbox bus that delivers them.
//!
//! Events are emitted while a step runs and delivered together in the
//! post-tick phase, in emission order, to every subscriber of their kind.
//! Render and audio adapters are passive listeners; reactive handlers may
//! return [`Command`]s, which are queued for the next step.
//!
//! Delivered events are also kept in a bounded [`EventHistory`] so
//! late readers (debug overlays, tests) can look back a few ticks.
//!
//! Kinds can be suppressed with [`EventBus::suppress`]; a suppressed event
//! is dropped at emission and never reaches the outbox or the history.

use crate::command_queue::Command;
use crate::customer::CustomerState;
use crate::fixed::{Cents, Ticks};
use crate::id::*;

/// Something that happened during a step. Every event carries its tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TraySpawned {
        tray: TrayId,
        customer: CustomerId,
        order_num: u32,
        dock_slot: DockSlotId,
        prep_slot: PrepSlotId,
        tick: Ticks,
    },
    IngredientPlaced {
        tray: TrayId,
        ingredient: IngredientId,
        tick: Ticks,
    },
    /// A rejected pick-up or placement. `tray` is `None` when nothing was
    /// targeted (out-of-stock pick-up).
    IngredientWrong {
        tray: Option<TrayId>,
        item: Pickup,
        tick: Ticks,
    },
    TreatmentApplied {
        tray: TrayId,
        treatment: TreatmentId,
        tick: Ticks,
    },
    TrayCompleted {
        tray: TrayId,
        tick: Ticks,
    },
    TrayDelivered {
        tray: TrayId,
        order_num: u32,
        money: Cents,
        points: u64,
        combo: u32,
        spawned_at: Ticks,
        tick: Ticks,
    },
    TrayMissed {
        tray: TrayId,
        order_num: u32,
        missed_count: u32,
        spawned_at: Ticks,
        tick: Ticks,
    },
    CustomerStateChanged {
        customer: CustomerId,
        from: CustomerState,
        to: CustomerState,
        tick: Ticks,
    },
    ShiftTerminated {
        earned: Cents,
        penalty: Cents,
        kept: Cents,
        tick: Ticks,
    },
    ShiftClosed {
        earned: Cents,
        orders_completed: u32,
        tick: Ticks,
    },
}

/// Discriminant tag for events, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TraySpawned,
    IngredientPlaced,
    IngredientWrong,
    TreatmentApplied,
    TrayCompleted,
    TrayDelivered,
    TrayMissed,
    CustomerStateChanged,
    ShiftTerminated,
    ShiftClosed,
}

const EVENT_KIND_COUNT: usize = 10;

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::TraySpawned,
        EventKind::IngredientPlaced,
        EventKind::IngredientWrong,
        EventKind::TreatmentApplied,
        EventKind::TrayCompleted,
        EventKind::TrayDelivered,
        EventKind::TrayMissed,
        EventKind::CustomerStateChanged,
        EventKind::ShiftTerminated,
        EventKind::ShiftClosed,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TraySpawned { .. } => EventKind::TraySpawned,
            Event::IngredientPlaced { .. } => EventKind::IngredientPlaced,
            Event::IngredientWrong { .. } => EventKind::IngredientWrong,
            Event::TreatmentApplied { .. } => EventKind::TreatmentApplied,
            Event::TrayCompleted { .. } => EventKind::TrayCompleted,
            Event::TrayDelivered { .. } => EventKind::TrayDelivered,
            Event::TrayMissed { .. } => EventKind::TrayMissed,
            Event::CustomerStateChanged { .. } => EventKind::CustomerStateChanged,
            Event::ShiftTerminated { .. } => EventKind::ShiftTerminated,
            Event::ShiftClosed { .. } => EventKind::ShiftClosed,
        }
    }

    pub fn tick(&self) -> Ticks {
        match *self {
            Event::TraySpawned { tick, .. }
            | Event::IngredientPlaced { tick, .. }
            | Event::IngredientWrong { tick, .. }
            | Event::TreatmentApplied { tick, .. }
            | Event::TrayCompleted { tick, .. }
            | Event::TrayDelivered { tick, .. }
            | Event::TrayMissed { tick, .. }
            | Event::CustomerStateChanged { tick, .. }
            | Event::ShiftTerminated { tick, .. }
            | Event::ShiftClosed { tick, .. } => tick,
        }
    }

    /// The tray this event is about, if any.
    pub fn tray(&self) -> Option<TrayId> {
        match *self {
            Event::TraySpawned { tray, .. }
            | Event::IngredientPlaced { tray, .. }
            | Event::TreatmentApplied { tray, .. }
            | Event::TrayCompleted { tray, .. }
            | Event::TrayDelivered { tray, .. }
            | Event::TrayMissed { tray, .. } => Some(tray),
            Event::IngredientWrong { tray, .. } => tray,
            Event::CustomerStateChanged { .. } | Event::ShiftTerminated { .. } | Event::ShiftClosed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventHistory: ring buffer of delivered events
// ---------------------------------------------------------------------------

/// Fixed-capacity ring buffer; when full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventHistory {
    events: Vec<Option<Event>>,
    /// Next write position.
    head: usize,
    len: usize,
    total_written: u64,
}

impl EventHistory {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn latest(&self) -> Option<&Event> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        self.events[idx].as_ref()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// Read-only listener (render, audio, analytics).
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Handler that answers an event with commands for the next step.
pub type ReactiveHandler = Box<dyn FnMut(&Event) -> Vec<Command>>;

/// Optional predicate that narrows what a subscriber sees.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

enum Subscriber {
    Passive(PassiveListener),
    Reactive(ReactiveHandler),
}

/// Lower priorities run first; ties run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    subscriber: Subscriber,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.subscriber {
            Subscriber::Passive(_) => "passive",
            Subscriber::Reactive(_) => "reactive",
        };
        f.debug_struct("SubscriberEntry")
            .field("kind", &kind)
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EventBus {
    /// Emitted this step, in order, awaiting delivery.
    outbox: Vec<Event>,
    history: EventHistory,
    suppressed: [bool; EVENT_KIND_COUNT],
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],
    emitted: [u64; EVENT_KIND_COUNT],
    /// Commands returned by reactive handlers, drained by the shift.
    pending_commands: Vec<Command>,
    next_insertion_order: u64,
}

impl EventBus {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            outbox: Vec::new(),
            history: EventHistory::new(history_capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: std::array::from_fn(|_| Vec::new()),
            emitted: [0; EVENT_KIND_COUNT],
            pending_commands: Vec::new(),
            next_insertion_order: 0,
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.outbox.retain(|e| e.kind() != kind);
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        self.emitted[idx] += 1;
        self.outbox.push(event);
    }

    /// Passive listener at normal priority with no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, SubscriberPriority::Normal, None, listener);
    }

    /// Reactive handler at normal priority with no filter.
    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.on_reactive_filtered(kind, SubscriberPriority::Normal, None, handler);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.register(kind, priority, filter, Subscriber::Passive(listener));
    }

    pub fn on_reactive_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        handler: ReactiveHandler,
    ) {
        self.register(kind, priority, filter, Subscriber::Reactive(handler));
    }

    fn register(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        subscriber: Subscriber,
    ) {
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.subscribers[kind.index()];
        list.push(SubscriberEntry {
            subscriber,
            priority,
            filter,
            insertion_order,
        });
        list.sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Deliver the outbox. Events go out in emission order; for each event
    /// its kind's subscribers run by `(priority, registration)`. Returns the
    /// number of events delivered.
    pub fn deliver(&mut self) -> usize {
        let events = std::mem::take(&mut self.outbox);
        let delivered = events.len();

        for event in events {
            for entry in &mut self.subscribers[event.kind().index()] {
                if let Some(filter) = &entry.filter
                    && !filter(&event)
                {
                    continue;
                }
                match &mut entry.subscriber {
                    Subscriber::Passive(listener) => listener(&event),
                    Subscriber::Reactive(handler) => {
                        self.pending_commands.extend(handler(&event));
                    }
                }
            }
            self.history.push(event);
        }

        delivered
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending_commands)
    }

    pub fn pending_command_count(&self) -> usize {
        self.pending_commands.len()
    }

    /// Events emitted but not yet delivered.
    pub fn outbox(&self) -> &[Event] {
        &self.outbox
    }

    pub fn history(&self) -> &EventHistory {
        &self.history
    }

    /// Total events of `kind` accepted since creation.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers[kind.index()].len()
    }

    /// Drop undelivered events, history and pending commands. Subscribers
    /// and suppression survive.
    pub fn clear_all(&mut self) {
        self.outbox.clear();
        self.history.clear();
        self.pending_commands.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
