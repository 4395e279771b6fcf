//! # Grab Verification Tests
//!
//! Grabs driven the way an application drives them: device input through
//! the focus pipeline, drag events from the processor, then the grab system.
//!
//! 1. **Drag to grab**: press, move past the drag slop, follow, release
//! 2. **Contended grabs**: a second device cannot take a held entity, and a
//!    refused start leaves no lock or hidden cursor behind
//! 3. **Handler removal**: destroying a handler mid-grab cancels it and
//!    snaps the entity back to where the grab started

use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use reticle_core::{Aabb, CollisionProvider, EntityId, Scene, TransformProvider};
use reticle_focus::{
    CursorProvider, Dispatcher, EventDispatch, EventKind, EventReceiver, FocusConfig,
    InputBehaviorResolver, InputEvent, InputFocusLocker, InputProcessor, SimpleCursor,
    StandardInputPipeline,
};
use reticle_grab::{
    GrabContext, GrabDef, GrabSystem, LinearGrabDef, LinearGrabHandler, SphericalGrabDef,
    SphericalGrabHandler,
};
use reticle_input::{DeviceProfile, DeviceType, InputManager};

const FRAME: Duration = Duration::from_millis(16);
const CONTROLLER: DeviceType = DeviceType::Controller;

struct Harness {
    input: Arc<InputManager>,
    scene: Arc<Scene>,
    cursor: Arc<SimpleCursor>,
    locker: Arc<InputFocusLocker>,
    events: EventReceiver,
    pipeline: StandardInputPipeline,
    grabs: Arc<GrabSystem>,
    ctx: GrabContext,
}

fn harness() -> Harness {
    let config = FocusConfig::default();
    let input = Arc::new(InputManager::new());
    input.connect_device(CONTROLLER, DeviceProfile::controller_6dof());

    let scene = Arc::new(Scene::new());
    let transforms = Arc::clone(&scene) as Arc<dyn TransformProvider>;
    let cursor = Arc::new(SimpleCursor::new(config.no_hit_distance));
    let locker = Arc::new(InputFocusLocker::new(Some(Arc::clone(&transforms))));
    let behaviors = Arc::new(InputBehaviorResolver::new(Some(Arc::clone(&transforms))));
    let dispatcher = Arc::new(Dispatcher::new(config.event_capacity));
    let events = dispatcher.receiver();
    let processor = Arc::new(InputProcessor::new(
        Arc::clone(&input),
        Some(Arc::clone(&transforms)),
        Some(Arc::clone(&dispatcher) as Arc<dyn EventDispatch>),
        &config,
    ));

    let pipeline = StandardInputPipeline::builder()
        .config(config)
        .input_manager(Arc::clone(&input))
        .processor(Arc::clone(&processor))
        .cursor(Arc::clone(&cursor) as Arc<dyn CursorProvider>)
        .transforms(Arc::clone(&transforms))
        .collision(Arc::clone(&scene) as Arc<dyn CollisionProvider>)
        .locker(Arc::clone(&locker))
        .behaviors(Arc::clone(&behaviors))
        .build()
        .unwrap();

    let grabs = GrabSystem::new(
        Arc::clone(&transforms),
        Arc::clone(&dispatcher) as Arc<dyn EventDispatch>,
        Some(behaviors),
    );
    let ctx = GrabContext {
        input: Arc::clone(&input),
        processor,
        locker: Arc::clone(&locker),
        transforms,
        cursor: Some(Arc::clone(&cursor) as Arc<dyn CursorProvider>),
    };

    Harness {
        input,
        scene,
        cursor,
        locker,
        events,
        pipeline,
        grabs,
        ctx,
    }
}

impl Harness {
    fn panel(&self, center: Vec3) -> EntityId {
        let entity = self.scene.spawn();
        self.scene
            .set_local_matrix(entity, Mat4::from_translation(center))
            .unwrap();
        self.scene
            .set_aabb(entity, Some(Aabb::from_half_extents(Vec3::splat(0.25))))
            .unwrap();
        entity
    }

    fn frame(&self) {
        self.input.advance_frame(FRAME);
        self.pipeline.advance_frame(FRAME);
        self.grabs.advance_frame(FRAME);
    }

    /// Points the controller `degrees` to the right of straight ahead.
    fn yaw(&self, degrees: f32) {
        self.input
            .update_rotation(CONTROLLER, Quat::from_rotation_y(-degrees.to_radians()));
    }

    fn press(&self, pressed: bool) {
        self.input.update_button(CONTROLLER, 0, pressed, false);
    }

    fn origin(&self, entity: EntityId) -> Vec3 {
        self.scene.world_matrix(entity).unwrap().w_axis.truncate()
    }

    fn drain(&self) -> Vec<InputEvent> {
        self.events.drain()
    }

    fn count(events: &[InputEvent], kind: EventKind) -> usize {
        events.iter().filter(|event| event.kind == kind).count()
    }

    fn assert_unlocked(&self) {
        for device in DeviceType::ALL {
            assert!(self.locker.current_lock(device).is_null(), "{device:?} still locked");
            assert!(self.cursor.is_cursor_visible(device), "{device:?} cursor hidden");
        }
    }

    /// Press on the panel, then swing past the drag slop.
    fn start_drag(&self) {
        self.frame();
        self.press(true);
        self.frame();
        self.yaw(3.0);
        self.frame();
    }
}

// ============================================================================
// DRAG TO GRAB
// ============================================================================

#[test]
fn drag_slides_panel_along_line() {
    let h = harness();
    let panel = h.panel(Vec3::new(0.0, 0.0, -3.0));
    let linear = LinearGrabHandler::new(h.ctx.clone());
    h.grabs.register(panel, &GrabDef::default());
    linear.create(
        &h.grabs,
        panel,
        LinearGrabDef {
            hide_cursor: true,
            ..LinearGrabDef::default()
        },
    );

    h.start_drag();
    let kinds: Vec<EventKind> = h.drain().iter().map(|event| event.kind).collect();
    assert!(kinds.contains(&EventKind::Press));
    assert!(kinds.contains(&EventKind::DragStart));
    assert_eq!(h.grabs.holding_device(panel), Some(CONTROLLER));
    assert!(linear.is_grabbing(panel));
    assert_eq!(h.locker.current_lock(CONTROLLER), panel);
    assert!(!h.cursor.is_cursor_visible(CONTROLLER));

    // Front face at z = -2.75; the grab point sits where the 3 degree ray hit.
    let grab_x = 2.75 * 3.0_f32.to_radians().tan();
    for degrees in [5.0_f32, 7.0, 9.0] {
        h.yaw(degrees);
        h.frame();
        let expected = 2.75 * degrees.to_radians().tan() - grab_x;
        let origin = h.origin(panel);
        assert!((origin.x - expected).abs() < 1e-3, "{degrees}: {origin}");
        assert!(origin.y.abs() < 1e-5);
        assert!((origin.z + 3.0).abs() < 1e-5);
    }

    h.press(false);
    h.frame();
    let events = h.drain();
    let kinds: Vec<EventKind> = events.iter().map(|event| event.kind).collect();
    assert!(kinds.contains(&EventKind::DragStop));
    assert!(!kinds.contains(&EventKind::Click));
    let released = events
        .iter()
        .find(|event| event.kind == EventKind::GrabReleased)
        .unwrap();
    assert_eq!(released.target, panel);
    assert_eq!(released.location, h.origin(panel));

    assert!(!h.grabs.is_held(panel));
    assert!(h.locker.current_lock(CONTROLLER).is_null());
    assert!(h.cursor.is_cursor_visible(CONTROLLER));
}

#[test]
fn press_without_motion_clicks_instead() {
    let h = harness();
    let panel = h.panel(Vec3::new(0.0, 0.0, -3.0));
    let linear = LinearGrabHandler::new(h.ctx.clone());
    h.grabs.register(panel, &GrabDef::default());
    linear.create(&h.grabs, panel, LinearGrabDef::default());

    h.frame();
    h.press(true);
    h.frame();
    h.press(false);
    h.frame();

    let kinds: Vec<EventKind> = h.drain().iter().map(|event| event.kind).collect();
    assert!(kinds.contains(&EventKind::Click));
    assert!(!kinds.contains(&EventKind::DragStart));
    assert!(!h.grabs.is_held(panel));
    assert_eq!(h.origin(panel), Vec3::new(0.0, 0.0, -3.0));
}

// ============================================================================
// CONTENDED GRABS
// ============================================================================

fn hidden_cursor_linear(h: &Harness, panel: EntityId) -> Arc<LinearGrabHandler> {
    let linear = LinearGrabHandler::new(h.ctx.clone());
    h.grabs.register(panel, &GrabDef::default());
    linear.create(
        &h.grabs,
        panel,
        LinearGrabDef {
            hide_cursor: true,
            ..LinearGrabDef::default()
        },
    );
    linear
}

#[test]
fn second_device_cannot_take_held_panel() {
    let h = harness();
    let panel = h.panel(Vec3::new(0.0, 0.0, -3.0));
    let linear = hidden_cursor_linear(&h, panel);

    h.start_drag();
    assert_eq!(h.grabs.holding_device(panel), Some(CONTROLLER));
    h.drain();

    h.grabs.grab(panel, DeviceType::Hmd);
    assert_eq!(h.grabs.holding_device(panel), Some(CONTROLLER));
    assert!(linear.is_grabbing(panel));
    assert_eq!(h.locker.current_lock(CONTROLLER), panel);
    assert!(h.locker.current_lock(DeviceType::Hmd).is_null());
    assert!(!h.cursor.is_cursor_visible(CONTROLLER));
    assert_eq!(Harness::count(&h.drain(), EventKind::GrabCanceled), 0);

    h.yaw(6.0);
    h.frame();
    assert!(h.origin(panel).x > 0.1);

    h.press(false);
    h.frame();
    let events = h.drain();
    assert_eq!(Harness::count(&events, EventKind::GrabReleased), 1);
    assert_eq!(Harness::count(&events, EventKind::GrabCanceled), 0);
    assert!(!h.grabs.is_held(panel));
    h.assert_unlocked();

    // Focus reaches collision again: looking away ends the hover.
    h.yaw(40.0);
    h.frame();
    assert!(h.drain().iter().any(|event| event.kind == EventKind::FocusStop));
}

#[test]
fn refused_start_leaves_nothing_behind() {
    let h = harness();
    let panel = h.panel(Vec3::new(0.0, 0.0, -3.0));
    let linear = hidden_cursor_linear(&h, panel);
    h.frame();
    h.drain();

    // The HMD is not connected, so it has no focus to grab with.
    h.grabs.grab(panel, DeviceType::Hmd);
    assert!(!h.grabs.is_held(panel));
    assert!(!linear.is_grabbing(panel));
    h.assert_unlocked();
    let events = h.drain();
    assert_eq!(Harness::count(&events, EventKind::GrabCanceled), 1);
    assert_eq!(events.len(), 1);

    // The panel still grabs normally afterwards.
    h.press(true);
    h.frame();
    h.yaw(3.0);
    h.frame();
    assert_eq!(h.grabs.holding_device(panel), Some(CONTROLLER));
    assert_eq!(h.locker.current_lock(CONTROLLER), panel);
}

// ============================================================================
// HANDLER REMOVAL
// ============================================================================

#[test]
fn destroying_handler_snaps_panel_back() {
    let h = harness();
    let panel = h.panel(Vec3::new(0.0, 0.0, -3.0));
    let spherical = SphericalGrabHandler::new(h.ctx.clone());
    h.grabs.register(
        panel,
        &GrabDef {
            snap_to_final: true,
            ..GrabDef::default()
        },
    );
    spherical.create(&h.grabs, panel, SphericalGrabDef::default());

    h.start_drag();
    h.yaw(8.0);
    h.frame();
    let moved = h.origin(panel);
    assert!(moved.x > 0.2);
    assert!((moved.length() - 3.0).abs() < 1e-3);
    h.drain();

    spherical.destroy(&h.grabs, panel);
    assert!(!h.grabs.is_held(panel));
    assert!(!spherical.is_grabbing(panel));
    assert!(h.locker.current_lock(CONTROLLER).is_null());
    assert_eq!(h.origin(panel), Vec3::new(0.0, 0.0, -3.0));

    let canceled = h
        .drain()
        .into_iter()
        .find(|event| event.kind == EventKind::GrabCanceled)
        .unwrap();
    assert_eq!(canceled.location, Vec3::new(0.0, 0.0, -3.0));

    // Later drags find no handler and leave the panel alone.
    h.press(false);
    h.frame();
    h.yaw(0.0);
    h.start_drag();
    assert!(!h.grabs.is_held(panel));
    assert_eq!(h.origin(panel), Vec3::new(0.0, 0.0, -3.0));
}
