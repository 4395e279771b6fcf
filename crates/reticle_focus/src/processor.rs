//! # Input Processor
//!
//! Keeps the current and previous [`InputFocus`] per device and turns them,
//! together with button states, into events.
//!
//! ## Press State Machine (per device and button)
//!
//! ```text
//!                JustPressed
//!   Released ─────────────────► InsideSlop ──(slop > drag, draggable)──► Dragging
//!       ▲                           │  │                                    │
//!       │                           │  └──────(slop > cancel)────┐         │
//!       │         focus changed     ▼                            ▼         ▼
//!       │   ┌──────────────── PressedBeforeFocus ──(slop > cancel)──► Canceled
//!       │   │                                                      (Cancel, DragStop)
//!       └───┴──── JustReleased: Release, then DragStop or Click ◄───────────┘
//! ```
//!
//! The slop is the angle, seen from the ray origin, between the press point
//! (tracked on the focused entity) and the current no-hit cursor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use reticle_core::{EntityId, TransformProvider};
use reticle_input::{ButtonId, ButtonState, DeviceType, InputManager};

use crate::config::FocusConfig;
use crate::events::{EventDispatch, EventKind, InputEvent};
use crate::focus::InputFocus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum PressState {
    #[default]
    Released,
    InsideSlop,
    Dragging,
    Canceled,
    PressedBeforeFocus,
}

#[derive(Clone, Copy, Debug, Default)]
struct ButtonTracker {
    state: PressState,
    pressed_entity: EntityId,
    focused_entity: EntityId,
    /// Press point in the focused entity's local space.
    pressed_location: Vec3,
    since_press: Duration,
}

#[derive(Clone, Copy, Debug)]
struct FocusPair {
    current: InputFocus,
    previous: InputFocus,
}

#[derive(Default)]
struct ProcessorState {
    foci: HashMap<DeviceType, FocusPair>,
    buttons: HashMap<(DeviceType, ButtonId), ButtonTracker>,
    primary: Option<DeviceType>,
}

/// Everything a button update needs, gathered before the state lock is taken.
struct FrameInput {
    device: DeviceType,
    delta_time: Duration,
    focus: InputFocus,
    /// World matrix of the focused interactive target.
    target_world: Option<Mat4>,
}

impl FrameInput {
    fn current(&self) -> EntityId {
        self.focus.interactive_target()
    }

    fn local_cursor(&self) -> Option<Vec3> {
        self.target_world
            .map(|world| world.inverse().transform_point3(self.focus.cursor_position))
    }
}

/// Focus and button transition detector.
pub struct InputProcessor {
    input: Arc<InputManager>,
    transforms: Option<Arc<dyn TransformProvider>>,
    dispatcher: Option<Arc<dyn EventDispatch>>,
    drag_slop: f32,
    cancel_slop: f32,
    state: Mutex<ProcessorState>,
}

impl InputProcessor {
    /// Creates a processor with slop angles from `config`.
    #[must_use]
    pub fn new(
        input: Arc<InputManager>,
        transforms: Option<Arc<dyn TransformProvider>>,
        dispatcher: Option<Arc<dyn EventDispatch>>,
        config: &FocusConfig,
    ) -> Self {
        Self {
            input,
            transforms,
            dispatcher,
            drag_slop: config.drag_slop(),
            cancel_slop: config.cancel_slop(),
            state: Mutex::new(ProcessorState::default()),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Latest focus of `device`.
    #[must_use]
    pub fn input_focus(&self, device: DeviceType) -> Option<InputFocus> {
        self.state.lock().foci.get(&device).map(|pair| pair.current)
    }

    /// Focus of `device` one update before the latest.
    #[must_use]
    pub fn previous_input_focus(&self, device: DeviceType) -> Option<InputFocus> {
        self.state.lock().foci.get(&device).map(|pair| pair.previous)
    }

    /// Records the primary device, `None` when nothing is connected.
    pub fn set_primary_device(&self, device: Option<DeviceType>) {
        self.state.lock().primary = device;
    }

    /// Primary device recorded by the pipeline.
    #[must_use]
    pub fn primary_device(&self) -> Option<DeviceType> {
        self.state.lock().primary
    }

    // =========================================================================
    // Frame update
    // =========================================================================

    /// Stores `focus` as the device's current focus and emits the events
    /// caused by the change.
    ///
    /// Events are dispatched after the internal lock is released.
    pub fn update_device(&self, delta_time: Duration, focus: InputFocus) {
        let device = focus.device;
        let target_world = self.world_matrix(focus.interactive_target());
        let button_states: Vec<ButtonState> = (0..self.input.num_buttons(device))
            .map(|button| self.input.button_state(device, button))
            .collect();
        let frame = FrameInput {
            device,
            delta_time,
            focus,
            target_world,
        };

        let mut events = Vec::new();
        {
            let mut guard = self.state.lock();
            let ProcessorState { foci, buttons, .. } = &mut *guard;

            let pair = foci.entry(device).or_insert(FocusPair {
                current: InputFocus::new(device),
                previous: InputFocus::new(device),
            });
            pair.previous = pair.current;
            pair.current = focus;
            Self::focus_events(pair, &mut events);

            let mut pressed_entity = EntityId::NULL;
            for (button, bits) in button_states.iter().copied().enumerate() {
                let tracker = buttons.entry((device, button)).or_default();
                self.update_button(&frame, button, bits, tracker, &mut events);
                if pressed_entity.is_null() && tracker.state != PressState::Released {
                    pressed_entity = tracker.pressed_entity;
                }
            }
            pair.current.pressed_entity = pressed_entity;
        }

        self.dispatch(events);
    }

    fn focus_events(pair: &FocusPair, events: &mut Vec<InputEvent>) {
        let current = pair.current.interactive_target();
        let previous = pair.previous.interactive_target();
        if current == previous {
            return;
        }
        let device = pair.current.device;
        if !previous.is_null() {
            events.push(InputEvent::new(EventKind::FocusStop, previous, device));
        }
        if !current.is_null() {
            events.push(InputEvent::new(EventKind::FocusStart, current, device));
        }
    }

    fn update_button(
        &self,
        frame: &FrameInput,
        button: ButtonId,
        bits: ButtonState,
        tracker: &mut ButtonTracker,
        events: &mut Vec<InputEvent>,
    ) {
        if bits.contains(ButtonState::JUST_PRESSED) {
            tracker.state = PressState::InsideSlop;
            tracker.pressed_entity = frame.current();
            tracker.since_press = Duration::ZERO;
            Self::set_button_target(frame, tracker);
            events.push(
                InputEvent::new(EventKind::Press, tracker.focused_entity, frame.device)
                    .with_button(button)
                    .with_location(tracker.pressed_location),
            );
        } else if bits.contains(ButtonState::PRESSED) {
            let current = frame.current();
            tracker.since_press += frame.delta_time;

            if tracker.focused_entity != current {
                if tracker.state != PressState::Canceled {
                    Self::cancel(frame.device, button, tracker, events);
                }
                Self::set_button_target(frame, tracker);
                // No click, long press or drag on a target acquired mid-press.
                tracker.state = PressState::PressedBeforeFocus;
            }

            let mut next = PressState::Canceled;
            if tracker.state != PressState::Canceled {
                let slop = Self::ray_slop(frame, tracker);
                if tracker.state == PressState::PressedBeforeFocus {
                    if slop <= self.cancel_slop {
                        next = PressState::PressedBeforeFocus;
                    }
                } else if slop <= self.drag_slop {
                    next = PressState::InsideSlop;
                } else if slop <= self.cancel_slop {
                    next = if frame.focus.draggable {
                        PressState::Dragging
                    } else {
                        PressState::InsideSlop
                    };
                }
            }

            if next == PressState::Canceled && tracker.state != PressState::Canceled {
                Self::cancel(frame.device, button, tracker, events);
                tracker.state = PressState::Canceled;
            }

            if next == PressState::Dragging && tracker.state == PressState::InsideSlop {
                tracker.state = PressState::Dragging;
                let location = frame.local_cursor().unwrap_or(Vec3::ZERO);
                let event = InputEvent::new(EventKind::DragStart, current, frame.device)
                    .with_button(button)
                    .with_location(location);
                events.push(event);
            }

            if bits.contains(ButtonState::JUST_LONG_PRESSED) && tracker.state == PressState::InsideSlop {
                events.push(
                    InputEvent::new(EventKind::LongPress, tracker.focused_entity, frame.device).with_button(button),
                );
            }
        }

        if bits.contains(ButtonState::JUST_RELEASED) {
            Self::release(frame, button, bits, tracker, events);
        } else if !bits.contains(ButtonState::PRESSED) && tracker.state != PressState::Released {
            // Pressed according to us but not to the device (pause/resume).
            Self::cancel(frame.device, button, tracker, events);
            *tracker = ButtonTracker::default();
        }
    }

    fn release(
        frame: &FrameInput,
        button: ButtonId,
        bits: ButtonState,
        tracker: &mut ButtonTracker,
        events: &mut Vec<InputEvent>,
    ) {
        let current = frame.current();
        let event = |kind, target| InputEvent::new(kind, target, frame.device).with_button(button);

        events.push(event(EventKind::Release, current));
        if current != tracker.pressed_entity {
            events.push(event(EventKind::Release, tracker.pressed_entity));
        }
        if tracker.state == PressState::Dragging {
            events.push(event(EventKind::DragStop, current));
        } else if tracker.state == PressState::InsideSlop
            && tracker.focused_entity == current
            && !bits.contains(ButtonState::LONG_PRESSED)
        {
            events.push(event(EventKind::Click, current).with_duration(tracker.since_press));
        }
        *tracker = ButtonTracker::default();
    }

    fn cancel(device: DeviceType, button: ButtonId, tracker: &ButtonTracker, events: &mut Vec<InputEvent>) {
        let target = tracker.focused_entity;
        events.push(InputEvent::new(EventKind::Cancel, target, device).with_button(button));
        if tracker.state == PressState::Dragging {
            events.push(InputEvent::new(EventKind::DragStop, target, device).with_button(button));
        }
    }

    fn set_button_target(frame: &FrameInput, tracker: &mut ButtonTracker) {
        tracker.focused_entity = frame.current();
        tracker.pressed_location = Vec3::ZERO;
        if tracker.state == PressState::Released || tracker.focused_entity.is_null() {
            return;
        }
        match frame.local_cursor() {
            Some(local) => tracker.pressed_location = local,
            None => {
                tracing::warn!(device = ?frame.device, entity = ?tracker.focused_entity, "focused entity has no transform");
            }
        }
    }

    /// Angle between the press point and the current no-hit cursor.
    ///
    /// Only called once `focused_entity` is the frame's target, so the frame's
    /// target matrix is the one to use.
    fn ray_slop(frame: &FrameInput, tracker: &ButtonTracker) -> f32 {
        if tracker.focused_entity.is_null() {
            return 0.0;
        }
        let Some(world) = frame.target_world else {
            return f32::MAX;
        };
        let origin = frame.focus.collision_ray.origin;
        let to_press = world.transform_point3(tracker.pressed_location) - origin;
        let to_cursor = frame.focus.no_hit_cursor_position - origin;
        if to_press.length_squared() < f32::EPSILON || to_cursor.length_squared() < f32::EPSILON {
            return 0.0;
        }
        to_press.angle_between(to_cursor)
    }

    fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        if entity.is_null() {
            return None;
        }
        self.transforms.as_ref()?.world_matrix(entity)
    }

    fn dispatch(&self, events: Vec<InputEvent>) {
        let Some(dispatcher) = self.dispatcher.as_ref() else {
            return;
        };
        for event in events {
            dispatcher.send_event(event.target, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Dispatcher, EventReceiver};
    use reticle_core::Scene;
    use reticle_input::DeviceProfile;

    const FRAME: Duration = Duration::from_millis(16);

    struct Harness {
        input: Arc<InputManager>,
        processor: InputProcessor,
        events: EventReceiver,
        target: EntityId,
    }

    fn harness() -> Harness {
        let input = Arc::new(InputManager::new());
        input.connect_device(DeviceType::Controller, DeviceProfile::controller_3dof());

        let scene = Arc::new(Scene::new());
        let target = scene.spawn();
        scene
            .set_local_matrix(target, Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)))
            .unwrap();

        let dispatcher = Arc::new(Dispatcher::new(64));
        let events = dispatcher.receiver();
        let processor = InputProcessor::new(
            Arc::clone(&input),
            Some(scene as Arc<dyn TransformProvider>),
            Some(dispatcher as Arc<dyn EventDispatch>),
            &FocusConfig::default(),
        );
        Harness {
            input,
            processor,
            events,
            target,
        }
    }

    fn focus(target: EntityId, cursor: Vec3, draggable: bool) -> InputFocus {
        let mut focus = InputFocus::new(DeviceType::Controller);
        focus.collision_ray = reticle_core::Ray::FORWARD;
        focus.cursor_position = cursor;
        focus.no_hit_cursor_position = cursor;
        focus.target = target;
        focus.interactive = !target.is_null();
        focus.draggable = draggable;
        focus
    }

    impl Harness {
        fn frame(&self, pressed: Option<bool>, focus: InputFocus) -> Vec<EventKind> {
            if let Some(pressed) = pressed {
                self.input.update_button(DeviceType::Controller, 0, pressed, false);
            }
            self.input.advance_frame(FRAME);
            self.processor.update_device(FRAME, focus);
            self.events.drain().iter().map(|event| event.kind).collect()
        }
    }

    const ON: Vec3 = Vec3::new(0.0, 0.0, -2.0);

    #[test]
    fn test_focus_start_and_stop() {
        let h = harness();
        assert_eq!(h.frame(None, focus(h.target, ON, false)), vec![EventKind::FocusStart]);
        assert!(h.frame(None, focus(h.target, ON, false)).is_empty());
        assert_eq!(h.frame(None, focus(EntityId::NULL, ON, false)), vec![EventKind::FocusStop]);
    }

    #[test]
    fn test_non_interactive_target_has_no_focus() {
        let h = harness();
        let mut hidden = focus(h.target, ON, false);
        hidden.interactive = false;
        assert!(h.frame(None, hidden).is_empty());
    }

    #[test]
    fn test_press_release_inside_slop_clicks() {
        let h = harness();
        h.frame(None, focus(h.target, ON, false));
        assert_eq!(h.frame(Some(true), focus(h.target, ON, false)), vec![EventKind::Press]);
        assert_eq!(
            h.processor.input_focus(DeviceType::Controller).unwrap().pressed_entity,
            h.target
        );

        // One degree of motion stays inside the drag slop.
        let nudge = Vec3::new(0.0349 * 0.5, 0.0, -2.0);
        assert!(h.frame(None, focus(h.target, nudge, false)).is_empty());
        assert_eq!(
            h.frame(Some(false), focus(h.target, nudge, false)),
            vec![EventKind::Release, EventKind::Click]
        );
        assert!(h.processor.input_focus(DeviceType::Controller).unwrap().pressed_entity.is_null());
    }

    #[test]
    fn test_drag_on_draggable_target() {
        let h = harness();
        h.frame(None, focus(h.target, ON, true));
        h.frame(Some(true), focus(h.target, ON, true));

        // atan(0.5 / 2) is about 14 degrees: past drag slop, inside cancel slop.
        let moved = Vec3::new(0.5, 0.0, -2.0);
        assert_eq!(h.frame(None, focus(h.target, moved, true)), vec![EventKind::DragStart]);
        assert!(h.frame(None, focus(h.target, moved, true)).is_empty());
        assert_eq!(
            h.frame(Some(false), focus(h.target, moved, true)),
            vec![EventKind::Release, EventKind::DragStop]
        );
    }

    #[test]
    fn test_same_motion_without_drag_still_clicks() {
        let h = harness();
        h.frame(None, focus(h.target, ON, false));
        h.frame(Some(true), focus(h.target, ON, false));
        let moved = Vec3::new(0.5, 0.0, -2.0);
        assert!(h.frame(None, focus(h.target, moved, false)).is_empty());
        assert_eq!(
            h.frame(Some(false), focus(h.target, moved, false)),
            vec![EventKind::Release, EventKind::Click]
        );
    }

    #[test]
    fn test_leaving_cancel_slop_cancels() {
        let h = harness();
        h.frame(None, focus(h.target, ON, true));
        h.frame(Some(true), focus(h.target, ON, true));
        h.frame(None, focus(h.target, Vec3::new(0.5, 0.0, -2.0), true));

        // 45 degrees: beyond the 35 degree cancel slop.
        let far = Vec3::new(2.0, 0.0, -2.0);
        assert_eq!(
            h.frame(None, focus(h.target, far, true)),
            vec![EventKind::Cancel, EventKind::DragStop]
        );
        // Released after cancel: release only, no click.
        assert_eq!(h.frame(Some(false), focus(h.target, far, true)), vec![EventKind::Release]);
    }

    #[test]
    fn test_focus_change_mid_press_cancels() {
        let h = harness();
        h.frame(None, focus(h.target, ON, false));
        h.frame(Some(true), focus(h.target, ON, false));

        let events = h.frame(None, focus(EntityId::NULL, ON, false));
        assert_eq!(events, vec![EventKind::FocusStop, EventKind::Cancel]);

        // Release elsewhere: release on the empty target and on the pressed one.
        let events = h.frame(Some(false), focus(EntityId::NULL, ON, false));
        assert_eq!(events, vec![EventKind::Release, EventKind::Release]);
    }

    #[test]
    fn test_long_press_suppresses_click() {
        let h = harness();
        h.frame(None, focus(h.target, ON, false));
        h.frame(Some(true), focus(h.target, ON, false));

        let mut saw_long_press = false;
        for _ in 0..40 {
            saw_long_press |= h.frame(None, focus(h.target, ON, false)).contains(&EventKind::LongPress);
        }
        assert!(saw_long_press);
        assert_eq!(h.frame(Some(false), focus(h.target, ON, false)), vec![EventKind::Release]);
    }

    #[test]
    fn test_press_location_is_local() {
        let h = harness();
        h.frame(None, focus(h.target, ON, false));
        h.input.update_button(DeviceType::Controller, 0, true, false);
        h.input.advance_frame(FRAME);
        h.processor
            .update_device(FRAME, focus(h.target, Vec3::new(0.25, 0.0, -2.0), false));
        let press = h.events.drain().into_iter().find(|e| e.kind == EventKind::Press).unwrap();
        assert_eq!(press.target, h.target);
        assert!((press.location - Vec3::new(0.25, 0.0, 0.0)).length() < 1e-5);
    }
}
