//! # RETICLE Focus
//!
//! Decides, once per frame, what the primary pointing device is aiming at and
//! turns focus and button changes into events:
//! - [`StandardInputPipeline`]: device ray, HMD substitution, resolution chain
//! - [`InputFocusLocker`], [`CollisionResolver`], [`InputBehaviorResolver`]:
//!   the resolvers, always run in that order
//! - [`InputProcessor`]: focus start/stop, press/release/click, drag and cancel
//! - [`Dispatcher`]: per-entity handlers plus a bounded event bus
//!
//! ## Architecture Rules
//!
//! 1. **No lock across a call-out** - collaborators are queried before an
//!    internal lock is taken and events are dispatched after it is released
//! 2. **Resolution order is fixed** - lock, collision, behaviors, interaction flag
//! 3. **Configuration errors degrade** - a misconfigured entity logs and keeps
//!    the unmodified target
//!
//! ## Example
//!
//! ```rust,ignore
//! use reticle_focus::{FocusConfig, InputProcessor, SimpleCursor, StandardInputPipeline};
//!
//! let processor = Arc::new(InputProcessor::new(input.clone(), None, None, &FocusConfig::default()));
//! let pipeline = StandardInputPipeline::builder()
//!     .input_manager(input)
//!     .processor(processor)
//!     .cursor(Arc::new(SimpleCursor::default()))
//!     .build()?;
//! let focus = pipeline.advance_frame(Duration::from_millis(16));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod behavior;
pub mod collision;
pub mod config;
pub mod cursor;
pub mod error;
pub mod events;
pub mod focus;
pub mod locker;
pub mod pipeline;
pub mod processor;

pub use behavior::{FocusBehavior, InputBehavior, InputBehaviorResolver};
pub use collision::CollisionResolver;
pub use config::{FocusConfig, RayOriginMode};
pub use cursor::{CursorProvider, SimpleCursor};
pub use error::{FocusError, FocusResult};
pub use events::{
    Dispatcher, EventBus, EventDispatch, EventHandler, EventKind, EventReceiver, EventSender,
    InputEvent, SubscriberId,
};
pub use focus::InputFocus;
pub use locker::{FocusLock, InputFocusLocker};
pub use pipeline::{
    DirectionLowPass, MovementFn, SmoothingFn, StandardInputPipeline, StandardInputPipelineBuilder,
};
pub use processor::InputProcessor;
