//! # Grab System
//!
//! Owns one grabbable record per entity and drives its input handler.
//!
//! ## Frame Flow
//!
//! ```text
//! DragStart ──► grab(entity, device) ── starting pose saved, handler.start_grab
//!                                        └─ refused: cancel
//! every frame ► advance_frame ── handler.update_grab ► transform
//!                              └─ handler.should_cancel ► cancel
//! DragStop / Cancel ► release(entity) ── GrabReleased, handler.end_grab
//! cancel(entity) ── snap back if snap_to_final, GrabCanceled, handler.end_grab
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::Mat4;
use parking_lot::Mutex;
use reticle_core::{EntityId, TransformProvider};
use reticle_focus::{EventDispatch, EventKind, InputBehaviorResolver, InputEvent, SubscriberId};
use reticle_input::DeviceType;
use serde::{Deserialize, Serialize};

use crate::handler::GrabInputInterface;

/// Subscriber id the grab system connects its handlers under.
pub const GRAB_SUBSCRIBER: SubscriberId = SubscriberId(0x6772_6162);

/// Per-entity grab wiring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabDef {
    /// Events on the entity that start a grab.
    pub grab_events: Vec<EventKind>,
    /// Events on the entity that release it.
    pub release_events: Vec<EventKind>,
    /// Device that holds the entity. `None` uses the device of the event.
    pub default_device: Option<DeviceType>,
    /// Snap back to the starting pose on cancel.
    pub snap_to_final: bool,
}

impl Default for GrabDef {
    fn default() -> Self {
        Self {
            grab_events: vec![EventKind::DragStart],
            release_events: vec![EventKind::DragStop, EventKind::Cancel],
            default_device: None,
            snap_to_final: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EndGrab {
    Released,
    Canceled,
    Destroyed,
}

#[derive(Default)]
struct Grabbable {
    handler: Option<Arc<dyn GrabInputInterface>>,
    holding: Option<DeviceType>,
    starting_pose: Mat4,
    snap_to_final: bool,
    subscriptions: Vec<EventKind>,
}

/// Coordinates grabbable entities and their input handlers.
pub struct GrabSystem {
    me: Weak<GrabSystem>,
    transforms: Arc<dyn TransformProvider>,
    dispatcher: Arc<dyn EventDispatch>,
    behaviors: Option<Arc<InputBehaviorResolver>>,
    grabbables: Mutex<HashMap<EntityId, Grabbable>>,
}

fn same_handler(a: &Arc<dyn GrabInputInterface>, b: &Arc<dyn GrabInputInterface>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl GrabSystem {
    /// Creates the system. Registered entities are marked draggable through
    /// `behaviors` when given.
    #[must_use]
    pub fn new(
        transforms: Arc<dyn TransformProvider>,
        dispatcher: Arc<dyn EventDispatch>,
        behaviors: Option<Arc<InputBehaviorResolver>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            transforms,
            dispatcher,
            behaviors,
            grabbables: Mutex::new(HashMap::new()),
        })
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Makes `entity` grabbable: its grab and release events drive
    /// [`GrabSystem::grab`] and [`GrabSystem::release`].
    ///
    /// A handler attached earlier through
    /// [`GrabSystem::set_input_handler`] is kept.
    pub fn register(&self, entity: EntityId, def: &GrabDef) {
        self.disconnect_events(entity);

        for kind in &def.grab_events {
            let me = self.me.clone();
            let fixed_device = def.default_device;
            self.dispatcher.connect(
                entity,
                *kind,
                GRAB_SUBSCRIBER,
                Arc::new(move |event: &InputEvent| {
                    if let Some(system) = me.upgrade() {
                        system.grab(entity, fixed_device.unwrap_or(event.device));
                    }
                }),
            );
        }
        for kind in &def.release_events {
            let me = self.me.clone();
            self.dispatcher.connect(
                entity,
                *kind,
                GRAB_SUBSCRIBER,
                Arc::new(move |_: &InputEvent| {
                    if let Some(system) = me.upgrade() {
                        system.release(entity);
                    }
                }),
            );
        }

        {
            let mut grabbables = self.grabbables.lock();
            let grabbable = grabbables.entry(entity).or_default();
            grabbable.snap_to_final = def.snap_to_final;
            grabbable.subscriptions = def
                .grab_events
                .iter()
                .chain(&def.release_events)
                .copied()
                .collect();
        }

        if let Some(behaviors) = self.behaviors.as_ref() {
            behaviors.set_draggable(entity, true);
        }
    }

    /// Ends any grab and forgets `entity`.
    pub fn destroy(&self, entity: EntityId) {
        self.end_grab(entity, EndGrab::Destroyed);
        self.disconnect_events(entity);
        self.grabbables.lock().remove(&entity);
    }

    fn disconnect_events(&self, entity: EntityId) {
        let subscriptions = self
            .grabbables
            .lock()
            .get_mut(&entity)
            .map(|grabbable| std::mem::take(&mut grabbable.subscriptions))
            .unwrap_or_default();
        for kind in subscriptions {
            self.dispatcher.disconnect(entity, kind, GRAB_SUBSCRIBER);
        }
    }

    /// Attaches `handler` to `entity`. A grab in progress moves to the new
    /// handler; if it refuses, the entity is released.
    pub fn set_input_handler(&self, entity: EntityId, handler: Arc<dyn GrabInputInterface>) {
        let (previous, holding) = {
            let mut grabbables = self.grabbables.lock();
            let grabbable = grabbables.entry(entity).or_default();
            let previous = grabbable.handler.replace(Arc::clone(&handler));
            (previous, grabbable.holding)
        };

        let Some(device) = holding else { return };
        if let Some(previous) = previous {
            previous.end_grab(entity, device);
        }
        if !handler.start_grab(entity, device) {
            self.release(entity);
        }
    }

    /// Detaches `handler` from `entity` if it is the attached one, canceling
    /// a grab in progress first.
    pub fn remove_input_handler(&self, entity: EntityId, handler: &Arc<dyn GrabInputInterface>) {
        let attached = self
            .grabbables
            .lock()
            .get(&entity)
            .and_then(|grabbable| grabbable.handler.as_ref())
            .is_some_and(|current| same_handler(current, handler));
        if !attached {
            return;
        }
        self.cancel(entity);
        if let Some(grabbable) = self.grabbables.lock().get_mut(&entity) {
            grabbable.handler = None;
        }
    }

    // =========================================================================
    // Grabbing
    // =========================================================================

    /// Device holding `entity`, if any.
    #[must_use]
    pub fn holding_device(&self, entity: EntityId) -> Option<DeviceType> {
        self.grabbables.lock().get(&entity).and_then(|grabbable| grabbable.holding)
    }

    /// Whether `entity` is held.
    #[must_use]
    pub fn is_held(&self, entity: EntityId) -> bool {
        self.holding_device(entity).is_some()
    }

    /// Starts holding `entity` with `device`. Ignored while another grab
    /// holds it.
    pub fn grab(&self, entity: EntityId, device: DeviceType) {
        let Some(pose) = self.transforms.world_matrix(entity) else {
            tracing::warn!(entity = ?entity, "grab on an entity without a transform");
            return;
        };

        let handler = {
            let mut grabbables = self.grabbables.lock();
            let Some(grabbable) = grabbables.get_mut(&entity) else {
                tracing::warn!(entity = ?entity, "grab on an entity that was never registered");
                return;
            };
            if let Some(holder) = grabbable.holding {
                tracing::warn!(entity = ?entity, holder = ?holder, device = ?device, "grab on an entity that is already held");
                return;
            }
            let Some(handler) = grabbable.handler.clone() else {
                tracing::warn!(entity = ?entity, "grab before an input handler was attached");
                return;
            };
            grabbable.holding = Some(device);
            grabbable.starting_pose = pose;
            handler
        };

        if !handler.start_grab(entity, device) {
            self.cancel(entity);
        }
    }

    /// Lets go of `entity` where it is.
    pub fn release(&self, entity: EntityId) {
        self.end_grab(entity, EndGrab::Released);
    }

    /// Lets go of `entity`, snapping back to the starting pose when the def
    /// asks for it.
    pub fn cancel(&self, entity: EntityId) {
        self.end_grab(entity, EndGrab::Canceled);
    }

    fn end_grab(&self, entity: EntityId, how: EndGrab) {
        let (handler, device, starting_pose, snap_to_final) = {
            let mut grabbables = self.grabbables.lock();
            let Some(grabbable) = grabbables.get_mut(&entity) else {
                if how != EndGrab::Destroyed {
                    tracing::warn!(entity = ?entity, "end of grab on an unregistered entity");
                }
                return;
            };
            // Several release events can fire for one grab.
            let Some(device) = grabbable.holding else { return };
            let Some(handler) = grabbable.handler.clone() else {
                tracing::warn!(entity = ?entity, "end of grab without an input handler");
                return;
            };
            grabbable.holding = None;
            (handler, device, grabbable.starting_pose, grabbable.snap_to_final)
        };

        match how {
            EndGrab::Canceled => {
                if snap_to_final {
                    self.transforms.set_world_matrix(entity, &starting_pose);
                }
                let event = InputEvent::new(EventKind::GrabCanceled, entity, device)
                    .with_location(starting_pose.w_axis.truncate());
                self.dispatcher.send_event(entity, event);
            }
            EndGrab::Released => {
                let location = self
                    .transforms
                    .world_matrix(entity)
                    .map_or(starting_pose.w_axis.truncate(), |world| world.w_axis.truncate());
                let event = InputEvent::new(EventKind::GrabReleased, entity, device).with_location(location);
                self.dispatcher.send_event(entity, event);
            }
            EndGrab::Destroyed => {}
        }

        tracing::debug!(entity = ?entity, device = ?device, end = ?how, "grab ended");
        handler.end_grab(entity, device);
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Moves every held entity and cancels the grabs their handlers give up.
    pub fn advance_frame(&self, _delta_time: Duration) {
        let held: Vec<(EntityId, DeviceType, Arc<dyn GrabInputInterface>)> = self
            .grabbables
            .lock()
            .iter()
            .filter_map(|(entity, grabbable)| {
                Some((*entity, grabbable.holding?, grabbable.handler.clone()?))
            })
            .collect();

        let mut canceled = Vec::new();
        for (entity, device, handler) in held {
            let Some(original) = self.transforms.world_matrix(entity) else {
                tracing::warn!(entity = ?entity, "held entity lost its transform");
                continue;
            };
            let updated = handler.update_grab(entity, device, &original);
            self.transforms.set_world_matrix(entity, &updated);

            if handler.should_cancel(entity, device) {
                canceled.push(entity);
            }
        }
        for entity in canceled {
            self.cancel(entity);
        }
    }
}
