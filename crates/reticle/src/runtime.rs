//! # RETICLE Runtime
//!
//! Builds every component once, leaves first, and advances them in a fixed
//! order:
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. INPUT                                                            │
//! │    └─ InputManager::advance_frame: front → current → previous       │
//! │                                                                     │
//! │ 2. FOCUS                                                            │
//! │    ├─ primary device from the preference list                       │
//! │    ├─ ray, HMD substitution, lock → collision → behaviors           │
//! │    ├─ InputProcessor: focus/press/drag events                       │
//! │    │   └─ grab/release handlers run synchronously from here         │
//! │    └─ cursor advance                                                │
//! │                                                                     │
//! │ 3. GRAB                                                             │
//! │    └─ GrabSystem::advance_frame: constrained poses, cancels         │
//! │                                                                     │
//! │ 4. STATS                                                            │
//! │    └─ timings recorded, over-budget frames logged                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use reticle_core::{CollisionProvider, EntityId, Scene, ScreenProjector, TransformProvider};
use reticle_focus::{
    CursorProvider, Dispatcher, EventDispatch, EventReceiver, InputBehaviorResolver, InputEvent,
    InputFocus, InputFocusLocker, InputProcessor, SimpleCursor, StandardInputPipeline,
};
use reticle_grab::{
    GrabContext, GrabDef, GrabSystem, LinearGrabDef, LinearGrabHandler, PlanarGrabDef,
    PlanarGrabHandler, SphericalGrabDef, SphericalGrabHandler,
};
use reticle_input::InputManager;

use crate::config::RuntimeConfig;
use crate::error::RuntimeResult;

/// Longest frame delta passed on by [`Runtime::tick`].
pub const MAX_DELTA: Duration = Duration::from_millis(100);

/// Collaborators the runtime does not own.
#[derive(Clone)]
pub struct Collaborators {
    /// Entity transforms.
    pub transforms: Arc<dyn TransformProvider>,
    /// Scene ray casts. Without one, nothing is ever hit.
    pub collision: Option<Arc<dyn CollisionProvider>>,
    /// Cursor and laser. A [`SimpleCursor`] is created when absent.
    pub cursor: Option<Arc<dyn CursorProvider>>,
    /// Camera for touchscreen devices.
    pub projector: Option<Arc<dyn ScreenProjector>>,
}

impl Collaborators {
    /// Uses an in-memory scene for transforms and collision.
    #[must_use]
    pub fn from_scene(scene: &Arc<Scene>) -> Self {
        Self {
            transforms: Arc::clone(scene) as Arc<dyn TransformProvider>,
            collision: Some(Arc::clone(scene) as Arc<dyn CollisionProvider>),
            cursor: None,
            projector: None,
        }
    }

    /// Sets the cursor collaborator.
    #[must_use]
    pub fn with_cursor(mut self, cursor: Arc<dyn CursorProvider>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    /// Sets the touchscreen camera.
    #[must_use]
    pub fn with_projector(mut self, projector: Arc<dyn ScreenProjector>) -> Self {
        self.projector = Some(projector);
        self
    }
}

/// Constraint a grabbable entity moves under.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint {
    /// Along a line.
    Linear(LinearGrabDef),
    /// On a sphere shell.
    Spherical(SphericalGrabDef),
    /// Within a plane.
    Planar(PlanarGrabDef),
}

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Input advance time in microseconds.
    pub input_us: u64,
    /// Focus pipeline time in microseconds, event handlers included.
    pub focus_us: u64,
    /// Grab update time in microseconds.
    pub grab_us: u64,
    /// Events waiting on the bus after the frame.
    pub events_pending: usize,
}

fn micros(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Composition root: owns the input, focus and grab layers.
pub struct Runtime {
    config: RuntimeConfig,
    input: Arc<InputManager>,
    dispatcher: Arc<Dispatcher>,
    events: EventReceiver,
    processor: Arc<InputProcessor>,
    locker: Arc<InputFocusLocker>,
    behaviors: Arc<InputBehaviorResolver>,
    cursor: Arc<dyn CursorProvider>,
    pipeline: StandardInputPipeline,
    grabs: Arc<GrabSystem>,
    linear: Arc<LinearGrabHandler>,
    spherical: Arc<SphericalGrabHandler>,
    planar: Arc<PlanarGrabHandler>,
    focus: Option<InputFocus>,
    frame_count: u64,
    last_tick: Instant,
    stats: FrameStatsAccumulator,
}

impl Runtime {
    /// Validates `config`, builds every component and connects the
    /// configured devices.
    ///
    /// # Errors
    ///
    /// Any configuration error, or a composition error from the pipeline
    /// builder.
    pub fn new(config: RuntimeConfig, collaborators: Collaborators) -> RuntimeResult<Self> {
        config.validate()?;
        let Collaborators {
            transforms,
            collision,
            cursor,
            projector,
        } = collaborators;

        let input = Arc::new(InputManager::with_config(config.input.clone()));
        let dispatcher = Arc::new(Dispatcher::new(config.focus.event_capacity));
        let events = dispatcher.receiver();
        let processor = Arc::new(InputProcessor::new(
            Arc::clone(&input),
            Some(Arc::clone(&transforms)),
            Some(Arc::clone(&dispatcher) as Arc<dyn EventDispatch>),
            &config.focus,
        ));
        let locker = Arc::new(InputFocusLocker::new(Some(Arc::clone(&transforms))));
        let behaviors = Arc::new(InputBehaviorResolver::new(Some(Arc::clone(&transforms))));
        let cursor = cursor.unwrap_or_else(|| {
            Arc::new(SimpleCursor::new(config.focus.no_hit_distance)) as Arc<dyn CursorProvider>
        });

        let mut builder = StandardInputPipeline::builder()
            .config(config.focus.clone())
            .input_manager(Arc::clone(&input))
            .processor(Arc::clone(&processor))
            .cursor(Arc::clone(&cursor))
            .transforms(Arc::clone(&transforms))
            .locker(Arc::clone(&locker))
            .behaviors(Arc::clone(&behaviors));
        if let Some(collision) = collision {
            builder = builder.collision(collision);
        }
        if let Some(projector) = projector {
            builder = builder.screen_projector(projector);
        }
        let pipeline = builder.build()?;

        let grabs = GrabSystem::new(
            Arc::clone(&transforms),
            Arc::clone(&dispatcher) as Arc<dyn EventDispatch>,
            Some(Arc::clone(&behaviors)),
        );
        let ctx = GrabContext {
            input: Arc::clone(&input),
            processor: Arc::clone(&processor),
            locker: Arc::clone(&locker),
            transforms,
            cursor: Some(Arc::clone(&cursor)),
        };

        for (device, profile) in config.device_profiles()? {
            input.connect_device(device, profile);
        }

        Ok(Self {
            input,
            dispatcher,
            events,
            processor,
            locker,
            behaviors,
            cursor,
            pipeline,
            grabs,
            linear: LinearGrabHandler::new(ctx.clone()),
            spherical: SphericalGrabHandler::new(ctx.clone()),
            planar: PlanarGrabHandler::new(ctx),
            focus: None,
            frame_count: 0,
            last_tick: Instant::now(),
            stats: FrameStatsAccumulator::new(),
            config,
        })
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Advances one frame by the wall time since the previous tick, clamped
    /// to [`MAX_DELTA`].
    pub fn tick(&mut self) -> FrameStats {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).min(MAX_DELTA);
        self.last_tick = now;
        self.advance_frame(delta)
    }

    /// Advances one frame by `delta_time`.
    pub fn advance_frame(&mut self, delta_time: Duration) -> FrameStats {
        let frame_start = Instant::now();

        let started = Instant::now();
        self.input.advance_frame(delta_time);
        let input_us = micros(started);

        let started = Instant::now();
        self.focus = self.pipeline.advance_frame(delta_time);
        let focus_us = micros(started);

        let started = Instant::now();
        self.grabs.advance_frame(delta_time);
        let grab_us = micros(started);

        let stats = FrameStats {
            frame: self.frame_count,
            total_us: micros(frame_start),
            input_us,
            focus_us,
            grab_us,
            events_pending: self.events.pending_count(),
        };
        self.end_frame(stats);
        stats
    }

    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats.record(stats, self.config.frame_budget_us);

        if self.config.timing_logs && stats.total_us > self.config.frame_budget_us {
            tracing::warn!(
                frame = stats.frame,
                total_us = stats.total_us,
                budget_us = self.config.frame_budget_us,
                "frame exceeded budget"
            );
        }
    }

    /// Focus of the primary device from the last frame, `None` when no
    /// preferred device was connected.
    #[must_use]
    pub fn focus(&self) -> Option<InputFocus> {
        self.focus
    }

    /// Takes every event dispatched since the last call.
    pub fn drain_events(&self) -> Vec<InputEvent> {
        self.events.drain()
    }

    // =========================================================================
    // Grabbables
    // =========================================================================

    /// Makes `entity` grabbable under `constraint`.
    pub fn make_grabbable(&self, entity: EntityId, def: &GrabDef, constraint: Constraint) {
        self.grabs.register(entity, def);
        match constraint {
            Constraint::Linear(def) => self.linear.create(&self.grabs, entity, def),
            Constraint::Spherical(def) => self.spherical.create(&self.grabs, entity, def),
            Constraint::Planar(def) => self.planar.create(&self.grabs, entity, def),
        }
    }

    /// Ends any grab on `entity` and forgets it.
    pub fn remove_grabbable(&self, entity: EntityId) {
        self.linear.destroy(&self.grabs, entity);
        self.spherical.destroy(&self.grabs, entity);
        self.planar.destroy(&self.grabs, entity);
        self.grabs.destroy(entity);
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Configuration the runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Device input. Platform callbacks write here.
    #[must_use]
    pub fn input(&self) -> &Arc<InputManager> {
        &self.input
    }

    /// Event dispatcher; connect entity handlers here.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Event processor holding per-device focus history.
    #[must_use]
    pub fn processor(&self) -> &Arc<InputProcessor> {
        &self.processor
    }

    /// Focus locks.
    #[must_use]
    pub fn locker(&self) -> &Arc<InputFocusLocker> {
        &self.locker
    }

    /// Per-entity input behaviors.
    #[must_use]
    pub fn behaviors(&self) -> &Arc<InputBehaviorResolver> {
        &self.behaviors
    }

    /// Cursor collaborator.
    #[must_use]
    pub fn cursor(&self) -> &Arc<dyn CursorProvider> {
        &self.cursor
    }

    /// Focus pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &StandardInputPipeline {
        &self.pipeline
    }

    /// Grab coordinator.
    #[must_use]
    pub fn grabs(&self) -> &Arc<GrabSystem> {
        &self.grabs
    }

    /// Linear grab handler.
    #[must_use]
    pub fn linear(&self) -> &Arc<LinearGrabHandler> {
        &self.linear
    }

    /// Spherical grab handler.
    #[must_use]
    pub fn spherical(&self) -> &Arc<SphericalGrabHandler> {
        &self.spherical
    }

    /// Planar grab handler.
    #[must_use]
    pub fn planar(&self) -> &Arc<PlanarGrabHandler> {
        &self.planar
    }

    /// Number of frames advanced.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Accumulated frame statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of focus pipeline times.
    pub focus_us_sum: u64,
    /// Sum of grab update times.
    pub grab_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            focus_us_sum: 0,
            grab_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records a frame against `budget_us`.
    pub fn record(&mut self, stats: FrameStats, budget_us: u64) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.focus_us_sum += stats.focus_us;
        self.grab_us_sum += stats.grab_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if stats.total_us > budget_us {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary at info level.
    pub fn log_summary(&self) {
        tracing::info!(
            frames = self.frames_recorded,
            avg_ms = self.avg_frame_ms(),
            min_us = self.min_frame_us,
            max_us = self.max_frame_us,
            over_budget = self.frames_over_budget,
            "frame statistics"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reticle_input::{DeviceProfile, DeviceType};

    fn runtime(config: RuntimeConfig) -> Runtime {
        let scene = Arc::new(Scene::new());
        Runtime::new(config, Collaborators::from_scene(&scene)).unwrap()
    }

    #[test]
    fn test_runtime_creation() {
        let runtime = runtime(RuntimeConfig::default());
        assert_eq!(runtime.frame_count(), 0);
        assert!(runtime.focus().is_none());
    }

    #[test]
    fn test_configured_devices_connect() {
        let config = RuntimeConfig::from_toml_str("[devices.hmd]\nrotation_dof = \"real\"\n").unwrap();
        let runtime = runtime(config);
        assert!(runtime.input().is_connected(DeviceType::Hmd));
        assert!(!runtime.input().is_connected(DeviceType::Controller));
    }

    #[test]
    fn test_frame_cycle() {
        let mut runtime = runtime(RuntimeConfig::default());
        let stats = runtime.advance_frame(Duration::from_millis(11));
        assert_eq!(stats.frame, 0);
        assert!(runtime.focus().is_none());

        runtime
            .input()
            .connect_device(DeviceType::Controller, DeviceProfile::controller_3dof());
        let stats = runtime.tick();
        assert_eq!(stats.frame, 1);
        assert_eq!(runtime.focus().map(|focus| focus.device), Some(DeviceType::Controller));
        assert_eq!(runtime.frame_count(), 2);
        assert_eq!(runtime.stats().frames_recorded, 2);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = RuntimeConfig {
            frame_budget_us: 0,
            ..RuntimeConfig::default()
        };
        let scene = Arc::new(Scene::new());
        assert!(Runtime::new(config, Collaborators::from_scene(&scene)).is_err());
    }

    #[test]
    fn test_stats_accumulator() {
        let mut acc = FrameStatsAccumulator::new();
        for i in 0..100 {
            acc.record(
                FrameStats {
                    total_us: 10_000 + i * 100,
                    frame: i,
                    ..FrameStats::default()
                },
                15_000,
            );
        }
        assert_eq!(acc.frames_recorded, 100);
        assert_eq!(acc.min_frame_us, 10_000);
        assert_eq!(acc.max_frame_us, 19_900);
        assert_eq!(acc.frames_over_budget, 49);
        assert!((acc.avg_frame_ms() - 14.95).abs() < 1e-9);
    }
}
