//! # Focus Pipeline Verification Tests
//!
//! Full frames through `StandardInputPipeline` against an in-memory scene:
//!
//! 1. **Ray construction**: rotation-only devices, cursor parents, touchscreens
//! 2. **Resolution order**: a held lock bypasses collision entirely
//! 3. **Behaviors**: ancestor hand-off and dead zones across frames
//! 4. **Events**: focus and click reach entity handlers through the dispatcher

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Quat, Vec2, Vec3};
use reticle_core::{
    Aabb, CollisionProvider, CollisionResult, EntityId, PerspectiveCamera, Ray, Scene,
    TransformProvider,
};
use reticle_focus::{
    Dispatcher, EventDispatch, EventKind, EventReceiver, FocusBehavior, FocusConfig,
    InputBehaviorResolver, InputFocusLocker, InputProcessor, SimpleCursor, StandardInputPipeline,
    SubscriberId,
};
use reticle_input::{DeviceProfile, DeviceType, InputManager};

const FRAME: Duration = Duration::from_millis(16);
const CONTROLLER: DeviceType = DeviceType::Controller;

/// Scene wrapper counting ray casts.
struct CountingCollision {
    scene: Arc<Scene>,
    casts: AtomicUsize,
}

impl CollisionProvider for CountingCollision {
    fn check_for_collision(&self, ray: &Ray) -> CollisionResult {
        self.casts.fetch_add(1, Ordering::SeqCst);
        self.scene.check_for_collision(ray)
    }

    fn is_interaction_enabled(&self, entity: EntityId) -> bool {
        self.scene.is_interaction_enabled(entity)
    }
}

struct World {
    input: Arc<InputManager>,
    scene: Arc<Scene>,
    collision: Arc<CountingCollision>,
    cursor: Arc<SimpleCursor>,
    locker: Arc<InputFocusLocker>,
    behaviors: Arc<InputBehaviorResolver>,
    dispatcher: Arc<Dispatcher>,
    events: EventReceiver,
    pipeline: StandardInputPipeline,
}

fn world_with(config: FocusConfig, camera: Option<Arc<PerspectiveCamera>>) -> World {
    let input = Arc::new(InputManager::new());
    let scene = Arc::new(Scene::new());
    let transforms = Arc::clone(&scene) as Arc<dyn TransformProvider>;
    let collision = Arc::new(CountingCollision {
        scene: Arc::clone(&scene),
        casts: AtomicUsize::new(0),
    });
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

    let mut builder = StandardInputPipeline::builder()
        .config(config)
        .input_manager(Arc::clone(&input))
        .processor(processor)
        .cursor(Arc::clone(&cursor) as Arc<dyn reticle_focus::CursorProvider>)
        .transforms(transforms)
        .collision(Arc::clone(&collision) as Arc<dyn CollisionProvider>)
        .locker(Arc::clone(&locker))
        .behaviors(Arc::clone(&behaviors));
    if let Some(camera) = camera {
        builder = builder.screen_projector(camera);
    }

    World {
        input,
        scene,
        collision,
        cursor,
        locker,
        behaviors,
        dispatcher,
        events,
        pipeline: builder.build().unwrap(),
    }
}

fn world() -> World {
    world_with(FocusConfig::default(), None)
}

impl World {
    fn boxed_entity(&self, center: Vec3, half_extents: Vec3) -> EntityId {
        let entity = self.scene.spawn();
        self.scene
            .set_local_matrix(entity, Mat4::from_translation(center))
            .unwrap();
        self.scene
            .set_aabb(entity, Some(Aabb::from_half_extents(half_extents)))
            .unwrap();
        entity
    }

    fn frame(&self) -> reticle_focus::InputFocus {
        self.input.advance_frame(FRAME);
        self.pipeline.advance_frame(FRAME).unwrap()
    }

    fn event_kinds(&self) -> Vec<EventKind> {
        self.events.drain().iter().map(|event| event.kind).collect()
    }
}

// ============================================================================
// RAY CONSTRUCTION
// ============================================================================

#[test]
fn rotation_only_device_places_no_hit_cursor() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let rotation = Quat::from_rotation_x(0.3) * Quat::from_rotation_y(-0.4);
    w.input.update_rotation(CONTROLLER, rotation);

    let focus = w.frame();
    let direction = rotation * Vec3::NEG_Z;
    assert_eq!(focus.origin, Vec3::ZERO);
    assert!((focus.collision_ray.direction - direction).length() < 1e-5);
    assert!((focus.cursor_position - direction * 2.0).length() < 1e-5);
    assert_eq!(focus.cursor_position, focus.no_hit_cursor_position);
    assert!(focus.target.is_null());
    assert!(!focus.interactive);
    assert_eq!(w.cursor.position(CONTROLLER), focus.cursor_position);
}

#[test]
fn cursor_parent_moves_the_ray() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let rig = w.scene.spawn();
    w.scene
        .set_local_matrix(rig, Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)))
        .unwrap();
    w.cursor.set_parent(CONTROLLER, rig);

    let focus = w.frame();
    assert_eq!(focus.origin, Vec3::new(0.0, 1.5, 0.0));
    assert!((focus.cursor_position - Vec3::new(0.0, 1.5, -2.0)).length() < 1e-5);
}

#[test]
fn hit_moves_cursor_onto_surface() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let panel = w.boxed_entity(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.5));

    let focus = w.frame();
    assert_eq!(focus.target, panel);
    assert!(focus.interactive);
    assert!((focus.cursor_position - Vec3::new(0.0, 0.0, -4.5)).length() < 1e-4);
    assert!((focus.no_hit_cursor_position - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
}

#[test]
fn touchscreen_touch_is_unprojected() {
    let camera = Arc::new(
        PerspectiveCamera::new(Mat4::IDENTITY, std::f32::consts::FRAC_PI_2, 1.0).unwrap(),
    );
    let config = FocusConfig {
        device_preference: vec![DeviceType::Hand],
        ..FocusConfig::default()
    };
    let w = world_with(config, Some(camera));
    w.input.connect_device(DeviceType::Hand, DeviceProfile::touchscreen());
    let panel = w.boxed_entity(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.5));

    // No finger down: zero-length ray, nothing cast.
    let focus = w.frame();
    assert!(focus.collision_ray.is_degenerate());
    assert!(focus.target.is_null());
    assert_eq!(w.collision.casts.load(Ordering::SeqCst), 0);

    w.input.update_touch(DeviceType::Hand, 0, 1, Vec2::new(0.5, 0.5), true);
    let focus = w.frame();
    assert_eq!(focus.target, panel);
    assert!((focus.collision_ray.direction - Vec3::NEG_Z).length() < 1e-5);
}

#[test]
fn missing_device_only_advances_cursor() {
    let w = world();
    assert!(w.pipeline.advance_frame(FRAME).is_none());
    assert_eq!(w.cursor.active_device(), None);
    assert_eq!(w.pipeline.processor().primary_device(), None);
    assert_eq!(w.collision.casts.load(Ordering::SeqCst), 0);
}

// ============================================================================
// RESOLUTION ORDER
// ============================================================================

#[test]
fn lock_bypasses_collision() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let near = w.boxed_entity(Vec3::new(0.0, 0.0, -3.0), Vec3::splat(0.5));
    let held = w.boxed_entity(Vec3::new(4.0, 0.0, 0.0), Vec3::splat(0.5));

    w.locker.lock_on(CONTROLLER, held, Vec3::new(0.0, 0.5, 0.0));
    for _ in 0..3 {
        let focus = w.frame();
        assert_eq!(focus.target, held);
        assert!((focus.cursor_position - Vec3::new(4.0, 0.5, 0.0)).length() < 1e-5);
    }
    assert_eq!(w.collision.casts.load(Ordering::SeqCst), 0);

    w.locker.unlock(CONTROLLER);
    let focus = w.frame();
    assert_eq!(focus.target, near);
    assert_eq!(w.collision.casts.load(Ordering::SeqCst), 1);
}

#[test]
fn manual_collision_overrides_geometry() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    w.boxed_entity(Vec3::new(0.0, 0.0, -3.0), Vec3::splat(0.5));
    let forced = w.scene.spawn();

    w.pipeline.start_manual_collision(forced, 1.0);
    let focus = w.frame();
    assert_eq!(focus.target, forced);
    assert!((focus.cursor_position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    assert_eq!(w.collision.casts.load(Ordering::SeqCst), 0);
}

// ============================================================================
// BEHAVIORS
// ============================================================================

#[test]
fn child_hit_focuses_handling_ancestor() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let group = w.scene.spawn();
    let button = w.scene.spawn_child(group).unwrap();
    w.scene
        .set_local_matrix(button, Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)))
        .unwrap();
    w.scene
        .set_aabb(button, Some(Aabb::from_half_extents(Vec3::splat(0.25))))
        .unwrap();
    w.behaviors.set_focus_behavior(group, FocusBehavior::HandleDescendants);
    w.behaviors.set_focus_behavior(button, FocusBehavior::FindAncestor);
    w.behaviors.set_draggable(group, true);

    let focus = w.frame();
    assert_eq!(focus.target, group);
    assert!(focus.draggable);
    assert_eq!(w.event_kinds(), vec![EventKind::FocusStart]);
}

#[test]
fn dead_zone_only_guards_acquisition() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let panel = w.boxed_entity(Vec3::new(0.0, 0.0, -4.0), Vec3::splat(1.0));
    w.behaviors.set_dead_zone(panel, Vec3::new(0.7, 0.7, 0.0));

    // Edge of the box, outside the shrunk core: suppressed.
    let edge = Quat::from_rotation_y(-0.2);
    w.input.update_rotation(CONTROLLER, edge);
    assert!(w.frame().target.is_null());

    // Center: acquired.
    w.input.update_rotation(CONTROLLER, Quat::IDENTITY);
    assert_eq!(w.frame().target, panel);

    // Back to the edge: the target is unchanged, so focus is kept.
    w.input.update_rotation(CONTROLLER, edge);
    assert_eq!(w.frame().target, panel);
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn click_reaches_entity_handler() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    let panel = w.boxed_entity(Vec3::new(0.0, 0.0, -3.0), Vec3::splat(0.5));

    let clicks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&clicks);
    w.dispatcher.connect(
        panel,
        EventKind::Click,
        SubscriberId(1),
        Arc::new(move |event: &reticle_focus::InputEvent| {
            assert_eq!(event.button, Some(0));
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    w.frame();
    assert_eq!(w.event_kinds(), vec![EventKind::FocusStart]);

    w.input.update_button(CONTROLLER, 0, true, false);
    let focus = w.frame();
    assert_eq!(focus.pressed_entity, panel);
    assert_eq!(w.event_kinds(), vec![EventKind::Press]);

    w.input.update_button(CONTROLLER, 0, false, false);
    w.frame();
    assert_eq!(w.event_kinds(), vec![EventKind::Release, EventKind::Click]);
    assert_eq!(clicks.load(Ordering::SeqCst), 1);

    w.dispatcher.disconnect(panel, EventKind::Click, SubscriberId(1));
    assert_eq!(w.dispatcher.handler_count(panel, EventKind::Click), 0);
}

#[test]
fn disconnect_stops_focus() {
    let w = world();
    w.input.connect_device(CONTROLLER, DeviceProfile::controller_3dof());
    w.boxed_entity(Vec3::new(0.0, 0.0, -3.0), Vec3::splat(0.5));
    w.frame();
    w.event_kinds();

    w.input.disconnect_device(CONTROLLER);
    assert!(w.pipeline.advance_frame(FRAME).is_none());
    assert!(w.event_kinds().is_empty());
}
