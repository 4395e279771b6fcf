//! # Standard Input Pipeline
//!
//! Computes one [`InputFocus`] per frame for the primary device.
//!
//! ```text
//! Frame:
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ 1. PRIMARY DEVICE                                                    │
//! │    └─ first connected entry of the preference list (none: cursor     │
//! │       still advances, nothing else runs)                             │
//! │                                                                      │
//! │ 2. DEVICE RAY                                                        │
//! │    ├─ touchscreen: primary touch unprojected by the screen projector │
//! │    ├─ otherwise: selection ray × rotation (+ position), under the    │
//! │    │  cursor parent's world matrix                                   │
//! │    ├─ movement fn replaces, smoothing fn filters the direction       │
//! │    └─ no-hit cursor at the cursor's no-hit distance                  │
//! │                                                                      │
//! │ 3. HMD SUBSTITUTION                                                  │
//! │    └─ origin → HMD, direction → towards the no-hit cursor            │
//! │                                                                      │
//! │ 4. RESOLUTION (fixed order)                                          │
//! │    ├─ focus locker   (lock held: skip collision)                     │
//! │    ├─ collision      (nearest hit or manual override)                │
//! │    ├─ behaviors      (non-null target only)                          │
//! │    └─ interaction-enabled flag                                       │
//! │                                                                      │
//! │ 5. EMIT                                                              │
//! │    ├─ processor: focus/button events                                 │
//! │    └─ cursor: placement                                              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use parking_lot::RwLock;
use reticle_core::{CollisionProvider, Ray, ScreenProjector, TransformProvider};
use reticle_input::{ControllerType, DeviceType, InputManager, TouchpadId};

use crate::behavior::InputBehaviorResolver;
use crate::collision::CollisionResolver;
use crate::config::{FocusConfig, RayOriginMode};
use crate::cursor::CursorProvider;
use crate::error::{FocusError, FocusResult};
use crate::focus::InputFocus;
use crate::locker::InputFocusLocker;
use crate::processor::InputProcessor;

/// Replaces the device ray.
pub type MovementFn = Box<dyn Fn(DeviceType) -> Ray + Send + Sync>;

/// Filters the ray direction given the frame time.
pub type SmoothingFn = Box<dyn Fn(Vec3, Duration) -> Vec3 + Send + Sync>;

/// Exponential low-pass filter on the ray direction.
///
/// ```rust,ignore
/// pipeline.set_smoothing_fn(DirectionLowPass::new(8.0).into_fn());
/// ```
pub struct DirectionLowPass {
    cutoff_hz: f32,
    state: parking_lot::Mutex<Option<Vec3>>,
}

impl DirectionLowPass {
    /// Filter with the given cutoff frequency.
    #[must_use]
    pub fn new(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            state: parking_lot::Mutex::new(None),
        }
    }

    /// Filters one sample. The first sample passes through.
    pub fn filter(&self, direction: Vec3, delta_time: Duration) -> Vec3 {
        let mut state = self.state.lock();
        let dt = delta_time.as_secs_f32();
        let rc = 1.0 / (2.0 * std::f32::consts::PI * self.cutoff_hz);
        let filtered = match *state {
            Some(previous) if dt > 0.0 => previous
                .lerp(direction, dt / (rc + dt))
                .try_normalize()
                .unwrap_or(direction),
            Some(previous) => previous,
            None => direction,
        };
        *state = Some(filtered);
        filtered
    }

    /// Wraps the filter as a [`SmoothingFn`].
    #[must_use]
    pub fn into_fn(self) -> SmoothingFn {
        Box::new(move |direction, delta_time| self.filter(direction, delta_time))
    }
}

struct PipelineSettings {
    device_preference: Vec<DeviceType>,
    ray_origin_mode: RayOriginMode,
}

/// Per-frame focus computation for the primary device.
pub struct StandardInputPipeline {
    input: Arc<InputManager>,
    processor: Arc<InputProcessor>,
    cursor: Arc<dyn CursorProvider>,
    transforms: Option<Arc<dyn TransformProvider>>,
    collision: CollisionResolver,
    locker: Option<Arc<InputFocusLocker>>,
    behaviors: Option<Arc<InputBehaviorResolver>>,
    projector: Option<Arc<dyn ScreenProjector>>,
    settings: RwLock<PipelineSettings>,
    movement_fn: RwLock<Option<MovementFn>>,
    smoothing_fn: RwLock<Option<SmoothingFn>>,
}

impl StandardInputPipeline {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> StandardInputPipelineBuilder {
        StandardInputPipelineBuilder::default()
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Replaces the device preference list.
    pub fn set_device_preference(&self, devices: &[DeviceType]) {
        self.settings.write().device_preference = devices.to_vec();
    }

    /// Sets the ray origin policy.
    pub fn set_ray_origin_mode(&self, mode: RayOriginMode) {
        self.settings.write().ray_origin_mode = mode;
    }

    /// Current ray origin policy.
    #[must_use]
    pub fn ray_origin_mode(&self) -> RayOriginMode {
        self.settings.read().ray_origin_mode
    }

    /// Replaces the device ray with `movement_fn(device)`.
    pub fn set_movement_fn(&self, movement_fn: MovementFn) {
        *self.movement_fn.write() = Some(movement_fn);
    }

    /// Returns to the device ray.
    pub fn clear_movement_fn(&self) {
        *self.movement_fn.write() = None;
    }

    /// Filters the ray direction with `smoothing_fn`.
    pub fn set_smoothing_fn(&self, smoothing_fn: SmoothingFn) {
        *self.smoothing_fn.write() = Some(smoothing_fn);
    }

    /// Stops filtering the ray direction.
    pub fn clear_smoothing_fn(&self) {
        *self.smoothing_fn.write() = None;
    }

    /// Forces collision to report `(entity, depth)`.
    pub fn start_manual_collision(&self, entity: reticle_core::EntityId, depth: f32) {
        self.collision.start_manual_collision(entity, depth);
    }

    /// Returns to geometric collision.
    pub fn stop_manual_collision(&self) {
        self.collision.stop_manual_collision();
    }

    /// Processor fed by this pipeline.
    #[must_use]
    pub fn processor(&self) -> &Arc<InputProcessor> {
        &self.processor
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// First connected device of the preference list.
    #[must_use]
    pub fn primary_device(&self) -> Option<DeviceType> {
        self.settings
            .read()
            .device_preference
            .iter()
            .copied()
            .find(|device| self.input.is_connected(*device))
    }

    /// Runs one frame. Returns the focus handed to the processor, `None` when
    /// no preferred device is connected.
    pub fn advance_frame(&self, delta_time: Duration) -> Option<InputFocus> {
        let device = self.primary_device();
        self.processor.set_primary_device(device);

        let Some(device) = device else {
            self.cursor.advance_frame(delta_time, None);
            return None;
        };

        let focus = self.compute_input_focus(delta_time, device);
        self.processor.update_device(delta_time, focus);
        self.cursor.advance_frame(delta_time, Some(&focus));
        Some(focus)
    }

    /// Computes the focus of `device` without emitting anything.
    #[must_use]
    pub fn compute_input_focus(&self, delta_time: Duration, device: DeviceType) -> InputFocus {
        let mut focus = InputFocus::new(device);

        focus.collision_ray = match self.movement_fn.read().as_ref() {
            Some(movement_fn) => movement_fn(device),
            None => self.device_selection_ray(device),
        };
        if let Some(smoothing_fn) = self.smoothing_fn.read().as_ref() {
            focus.collision_ray.direction = smoothing_fn(focus.collision_ray.direction, delta_time);
        }
        focus.origin = focus.collision_ray.origin;

        focus.cursor_position =
            focus.collision_ray.point_at(self.cursor.no_hit_distance(device));
        focus.no_hit_cursor_position = focus.cursor_position;

        self.maybe_make_ray_come_from_hmd(&mut focus);
        self.apply_resolvers(&mut focus);
        focus
    }

    /// World ray of `device` before any HMD substitution.
    ///
    /// Touchscreens without an active touch yield a zero-length ray.
    #[must_use]
    pub fn device_selection_ray(&self, device: DeviceType) -> Ray {
        let is_touchscreen = self
            .input
            .device_profile(device)
            .is_some_and(|profile| profile.controller_type == ControllerType::TouchScreen);
        if is_touchscreen {
            return self.touchscreen_ray(device);
        }

        let mut ray = self.input.selection_ray(device);
        if self.input.has_rotation_dof(device) {
            let rotation = self.input.dof_rotation(device);
            ray.origin = rotation * ray.origin;
            ray.direction = rotation * ray.direction;
            if self.input.has_position_dof(device) {
                ray.origin += self.input.dof_position(device);
            }
        }

        let parent = self.cursor.cursor_parent(device);
        if parent.is_null() {
            return ray;
        }
        match self.transforms.as_ref().and_then(|t| t.world_matrix(parent)) {
            Some(world_from_parent) => ray.transformed(&world_from_parent),
            None => ray,
        }
    }

    fn touchscreen_ray(&self, device: DeviceType) -> Ray {
        const TOUCHPAD: TouchpadId = 0;
        if !self.input.is_valid_touch(device, TOUCHPAD, None) {
            return Ray::ZERO;
        }
        let Some(projector) = self.projector.as_ref() else {
            tracing::warn!(device = ?device, "touchscreen device without a screen projector");
            return Ray::ZERO;
        };
        let location = self.input.touch_location(device, TOUCHPAD, None);
        projector.world_ray_from_screen(location).unwrap_or(Ray::ZERO)
    }

    fn maybe_make_ray_come_from_hmd(&self, focus: &mut InputFocus) {
        let from_hmd = match self.ray_origin_mode() {
            RayOriginMode::AlwaysFromController => false,
            RayOriginMode::AlwaysFromHmd => true,
            RayOriginMode::ControllerIfReal6Dof => !self.input.has_real_position_dof(focus.device),
        };
        if !from_hmd || focus.collision_ray.is_degenerate() || !self.input.has_position_dof(DeviceType::Hmd) {
            return;
        }
        let origin = self.input.dof_position(DeviceType::Hmd);
        focus.collision_ray = Ray::new(origin, (focus.cursor_position - origin).normalize_or_zero());
    }

    fn apply_resolvers(&self, focus: &mut InputFocus) {
        let locked = self
            .locker
            .as_ref()
            .is_some_and(|locker| locker.update_input_focus(focus));

        if !locked {
            let manual = self.collision.manual_collision().is_some();
            let hit = self.collision.resolve(&focus.collision_ray);
            if manual || hit.is_hit() {
                focus.target = hit.entity;
                focus.cursor_position = focus.collision_ray.point_at(hit.distance);
            }
        }

        if let Some(behaviors) = self.behaviors.as_ref() {
            if !focus.target.is_null() {
                let previous = self.processor.input_focus(focus.device);
                behaviors.update_input_focus(focus, previous.as_ref());
            }
        }

        focus.interactive = self.collision.is_interaction_enabled(focus.target);
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Builder for [`StandardInputPipeline`].
///
/// The input manager, processor and cursor are required; everything else
/// degrades when absent.
#[derive(Default)]
pub struct StandardInputPipelineBuilder {
    config: FocusConfig,
    input: Option<Arc<InputManager>>,
    processor: Option<Arc<InputProcessor>>,
    cursor: Option<Arc<dyn CursorProvider>>,
    transforms: Option<Arc<dyn TransformProvider>>,
    collision: Option<Arc<dyn CollisionProvider>>,
    locker: Option<Arc<InputFocusLocker>>,
    behaviors: Option<Arc<InputBehaviorResolver>>,
    projector: Option<Arc<dyn ScreenProjector>>,
}

impl StandardInputPipelineBuilder {
    /// Device preference and ray origin mode.
    #[must_use]
    pub fn config(mut self, config: FocusConfig) -> Self {
        self.config = config;
        self
    }

    /// Required.
    #[must_use]
    pub fn input_manager(mut self, input: Arc<InputManager>) -> Self {
        self.input = Some(input);
        self
    }

    /// Required.
    #[must_use]
    pub fn processor(mut self, processor: Arc<InputProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Required.
    #[must_use]
    pub fn cursor(mut self, cursor: Arc<dyn CursorProvider>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Scene transforms for cursor parents.
    #[must_use]
    pub fn transforms(mut self, transforms: Arc<dyn TransformProvider>) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// Ray casting and the interaction flag.
    #[must_use]
    pub fn collision(mut self, collision: Arc<dyn CollisionProvider>) -> Self {
        self.collision = Some(collision);
        self
    }

    /// Focus locks.
    #[must_use]
    pub fn locker(mut self, locker: Arc<InputFocusLocker>) -> Self {
        self.locker = Some(locker);
        self
    }

    /// Input behaviors.
    #[must_use]
    pub fn behaviors(mut self, behaviors: Arc<InputBehaviorResolver>) -> Self {
        self.behaviors = Some(behaviors);
        self
    }

    /// Touchscreen unprojection.
    #[must_use]
    pub fn screen_projector(mut self, projector: Arc<dyn ScreenProjector>) -> Self {
        self.projector = Some(projector);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// [`FocusError::MissingCollaborator`] if a required collaborator is
    /// absent, [`FocusError::InvalidConfig`] if the config is out of range.
    pub fn build(self) -> FocusResult<StandardInputPipeline> {
        self.config.validate()?;
        let input = self.input.ok_or(FocusError::MissingCollaborator("input manager"))?;
        let processor = self.processor.ok_or(FocusError::MissingCollaborator("input processor"))?;
        let cursor = self.cursor.ok_or(FocusError::MissingCollaborator("cursor"))?;

        Ok(StandardInputPipeline {
            input,
            processor,
            cursor,
            transforms: self.transforms,
            collision: CollisionResolver::new(self.collision),
            locker: self.locker,
            behaviors: self.behaviors,
            projector: self.projector,
            settings: RwLock::new(PipelineSettings {
                device_preference: self.config.device_preference,
                ray_origin_mode: self.config.ray_origin_mode,
            }),
            movement_fn: RwLock::new(None),
            smoothing_fn: RwLock::new(None),
        })
    }
}
