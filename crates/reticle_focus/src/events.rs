//! # Input Events
//!
//! Focus and button transitions become [`InputEvent`]s that are routed two ways:
//!
//! ```text
//! ┌─────────────────┐  send_event(entity, event)  ┌──────────────────────┐
//! │ InputProcessor  │────────────────────────────►│     Dispatcher       │
//! │ GrabSystem      │                             │                      │
//! └─────────────────┘                             │ (entity, kind) ──► handlers (same thread)
//!                                                 │ every event    ──► EventBus (bounded)
//!                                                 └──────────────────────┘
//!                                                            │
//!                                                            ▼
//!                                                    EventReceiver::drain
//!                                                    (any thread, any time)
//! ```
//!
//! Handlers run synchronously after the sender released its own locks, so a
//! handler may call back into the processor, the locker or the grab system.
//! The bus never blocks the frame: when it is full, events are dropped from the
//! bus (handlers still see them) and a warning is logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glam::Vec3;
use parking_lot::RwLock;
use reticle_core::EntityId;
use reticle_input::{ButtonId, DeviceType};

// =============================================================================
// EVENT TYPES
// =============================================================================

/// Kind of input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // ========================================
    // DEVICE EVENTS
    // ========================================
    /// Device started focusing the target.
    FocusStart,
    /// Device stopped focusing the target.
    FocusStop,

    // ========================================
    // BUTTON EVENTS
    // ========================================
    /// Button went down while focusing the target.
    Press,
    /// Button went up.
    Release,
    /// Press and release on the same target within the drag slop.
    Click,
    /// Button held past the long-press threshold within the drag slop.
    LongPress,
    /// Ray left the drag slop while pressing a draggable target.
    DragStart,
    /// Drag ended by release or cancel.
    DragStop,
    /// Press abandoned: focus changed or the ray left the cancel slop.
    Cancel,

    // ========================================
    // GRAB EVENTS
    // ========================================
    /// Grab ended normally.
    GrabReleased,
    /// Grab was canceled.
    GrabCanceled,
}

/// One input event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    /// What happened.
    pub kind: EventKind,
    /// Entity the event is about, null when nothing was focused.
    pub target: EntityId,
    /// Device that caused the event.
    pub device: DeviceType,
    /// Button for button events.
    pub button: Option<ButtonId>,
    /// Press point in the target's local space (press, drag start), or the
    /// entity's world position (grab events).
    pub location: Vec3,
    /// Time the button was held (click).
    pub duration: Duration,
}

impl InputEvent {
    /// Event with no button, location or duration.
    #[must_use]
    pub fn new(kind: EventKind, target: EntityId, device: DeviceType) -> Self {
        Self {
            kind,
            target,
            device,
            button: None,
            location: Vec3::ZERO,
            duration: Duration::ZERO,
        }
    }

    /// Sets the button.
    #[must_use]
    pub fn with_button(mut self, button: ButtonId) -> Self {
        self.button = Some(button);
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

// =============================================================================
// DISPATCH INTERFACE
// =============================================================================

/// Identifies who connected a handler, so it can be disconnected later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Callback invoked for matching events.
pub type EventHandler = Arc<dyn Fn(&InputEvent) + Send + Sync>;

/// Routes events to per-entity handlers.
pub trait EventDispatch: Send + Sync {
    /// Delivers `event` to handlers connected on `(entity, event.kind)`.
    fn send_event(&self, entity: EntityId, event: InputEvent);

    /// Connects `handler` to `kind` events on `entity`.
    fn connect(&self, entity: EntityId, kind: EventKind, subscriber: SubscriberId, handler: EventHandler);

    /// Removes every handler `subscriber` connected to `kind` events on `entity`.
    fn disconnect(&self, entity: EntityId, kind: EventKind, subscriber: SubscriberId);
}

// =============================================================================
// EVENT BUS
// =============================================================================

/// Bounded multi-producer, multi-consumer event channel.
pub struct EventBus {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
}

impl EventBus {
    /// Creates a bus holding up to `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a new pair of sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<InputEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the channel is full or every receiver is gone.
    #[inline]
    pub fn send(&self, event: InputEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(kind = ?event.kind, "event bus full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<InputEvent>,
}

impl EventReceiver {
    /// Takes every pending event.
    #[inline]
    pub fn drain(&self) -> Vec<InputEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Takes one event, `None` if nothing is pending.
    #[inline]
    pub fn try_recv(&self) -> Option<InputEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

type HandlerList = Vec<(SubscriberId, EventHandler)>;

/// Handler table plus an event bus.
///
/// Every sent event is published on the bus. Events with a non-null entity
/// are also delivered to the handlers connected on that entity.
pub struct Dispatcher {
    handlers: RwLock<HashMap<(EntityId, EventKind), HandlerList>>,
    bus: EventBus,
    sender: EventSender,
}

impl Dispatcher {
    /// Creates a dispatcher whose bus holds up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let bus = EventBus::new(capacity);
        let sender = bus.sender();
        Self {
            handlers: RwLock::new(HashMap::new()),
            bus,
            sender,
        }
    }

    /// Receiver for polling every dispatched event.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// Number of handlers connected on `(entity, kind)`.
    #[must_use]
    pub fn handler_count(&self, entity: EntityId, kind: EventKind) -> usize {
        self.handlers.read().get(&(entity, kind)).map_or(0, Vec::len)
    }
}

impl EventDispatch for Dispatcher {
    fn send_event(&self, entity: EntityId, event: InputEvent) {
        // Snapshot so handlers may connect, disconnect or send re-entrantly.
        let handlers: Vec<EventHandler> = if entity.is_null() {
            Vec::new()
        } else {
            self.handlers
                .read()
                .get(&(entity, event.kind))
                .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
                .unwrap_or_default()
        };

        // Bus overflow is logged by the sender; handlers still run.
        self.sender.send(event);
        for handler in handlers {
            handler(&event);
        }
    }

    fn connect(&self, entity: EntityId, kind: EventKind, subscriber: SubscriberId, handler: EventHandler) {
        self.handlers
            .write()
            .entry((entity, kind))
            .or_default()
            .push((subscriber, handler));
    }

    fn disconnect(&self, entity: EntityId, kind: EventKind, subscriber: SubscriberId) {
        let mut handlers = self.handlers.write();
        if let Some(list) = handlers.get_mut(&(entity, kind)) {
            list.retain(|(id, _)| *id != subscriber);
            if list.is_empty() {
                handlers.remove(&(entity, kind));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_send_receive() {
        let (sender, receiver) = EventBus::create_pair(100);
        let event = InputEvent::new(EventKind::Click, EntityId::new(1, 0), DeviceType::Controller)
            .with_button(0)
            .with_duration(Duration::from_millis(120));

        assert!(sender.send(event));
        assert!(receiver.has_events());

        let received = receiver.try_recv().unwrap();
        assert_eq!(received.kind, EventKind::Click);
        assert_eq!(received.button, Some(0));
        assert_eq!(received.duration, Duration::from_millis(120));
    }

    #[test]
    fn test_full_bus_drops() {
        let (sender, receiver) = EventBus::create_pair(2);
        let event = InputEvent::new(EventKind::Press, EntityId::NULL, DeviceType::Hmd);
        assert!(sender.send(event));
        assert!(sender.send(event));
        assert!(!sender.send(event));
        assert_eq!(receiver.drain().len(), 2);
        assert!(!receiver.has_events());
    }

    #[test]
    fn test_dispatcher_routes_by_entity_and_kind() {
        let dispatcher = Dispatcher::new(16);
        let entity = EntityId::new(4, 0);
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        dispatcher.connect(
            entity,
            EventKind::FocusStart,
            SubscriberId(1),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher.send_event(entity, InputEvent::new(EventKind::FocusStart, entity, DeviceType::Controller));
        dispatcher.send_event(entity, InputEvent::new(EventKind::FocusStop, entity, DeviceType::Controller));
        let other = EntityId::new(5, 0);
        dispatcher.send_event(other, InputEvent::new(EventKind::FocusStart, other, DeviceType::Controller));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        // The bus sees all three.
        assert_eq!(dispatcher.receiver().drain().len(), 3);
    }

    #[test]
    fn test_full_bus_still_reaches_handlers() {
        let dispatcher = Dispatcher::new(1);
        let entity = EntityId::new(2, 0);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        dispatcher.connect(
            entity,
            EventKind::Click,
            SubscriberId(1),
            Arc::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        for _ in 0..3 {
            dispatcher.send_event(entity, InputEvent::new(EventKind::Click, entity, DeviceType::Controller));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(dispatcher.receiver().drain().len(), 1);
    }

    #[test]
    fn test_disconnect_removes_only_subscriber() {
        let dispatcher = Dispatcher::new(16);
        let entity = EntityId::new(1, 0);
        let noop: EventHandler = Arc::new(|_| {});
        dispatcher.connect(entity, EventKind::Click, SubscriberId(1), Arc::clone(&noop));
        dispatcher.connect(entity, EventKind::Click, SubscriberId(2), noop);

        dispatcher.disconnect(entity, EventKind::Click, SubscriberId(1));
        assert_eq!(dispatcher.handler_count(entity, EventKind::Click), 1);
        dispatcher.disconnect(entity, EventKind::Click, SubscriberId(2));
        assert_eq!(dispatcher.handler_count(entity, EventKind::Click), 0);
    }

    #[test]
    fn test_handler_may_send_reentrantly() {
        let dispatcher = Arc::new(Dispatcher::new(16));
        let entity = EntityId::new(2, 0);
        let inner = Arc::clone(&dispatcher);
        dispatcher.connect(
            entity,
            EventKind::DragStop,
            SubscriberId(9),
            Arc::new(move |event| {
                inner.send_event(event.target, InputEvent::new(EventKind::GrabReleased, event.target, event.device));
            }),
        );

        dispatcher.send_event(entity, InputEvent::new(EventKind::DragStop, entity, DeviceType::Controller));
        let kinds: Vec<_> = dispatcher.receiver().drain().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::DragStop, EventKind::GrabReleased]);
    }
}
