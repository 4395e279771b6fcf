//! # RETICLE
//!
//! Input focus resolution and constrained grabbing for pointer-driven 3D
//! interfaces.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              RETICLE RUNTIME                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐    │
//! │  │  reticle_input  │     │  reticle_focus  │     │  reticle_grab   │    │
//! │  │                 │────>│                 │────>│                 │    │
//! │  │  • Profiles     │     │  • Pipeline     │     │  • Linear       │    │
//! │  │  • Triple buffer│     │  • Resolvers    │     │  • Spherical    │    │
//! │  │  • Button state │     │  • Events       │     │  • Planar       │    │
//! │  └────────┬────────┘     └────────┬────────┘     └────────┬────────┘    │
//! │           │                       │                       │             │
//! │           │              ┌────────▼────────┐              │             │
//! │           └─────────────>│  reticle_core   │<─────────────┘             │
//! │                          │  • Entity ids   │                            │
//! │                          │  • Ray math     │                            │
//! │                          │  • Collaborators│                            │
//! │                          └─────────────────┘                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: one TOML document for every layer
//! - `runtime`: composition root and frame orchestration
//!
//! ## Example
//!
//! ```rust,ignore
//! let scene = Arc::new(Scene::new());
//! let config = RuntimeConfig::load("reticle.toml")?;
//! let mut runtime = Runtime::new(config, Collaborators::from_scene(&scene))?;
//! loop {
//!     runtime.tick();
//!     for event in runtime.drain_events() { /* ... */ }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod runtime;

// Re-export the layers
pub use reticle_core as core;
pub use reticle_focus as focus;
pub use reticle_grab as grab;
pub use reticle_input as input;

pub use config::{device_slot, RuntimeConfig, DEFAULT_FRAME_BUDGET_US};
pub use error::{RuntimeError, RuntimeResult};
pub use runtime::{Collaborators, Constraint, FrameStats, FrameStatsAccumulator, Runtime, MAX_DELTA};
