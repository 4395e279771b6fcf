//! # Reference Scene
//!
//! In-memory implementations of the collaborator traits:
//! - [`Scene`]: entity hierarchy with local transforms, boxes and enable flags
//! - [`PerspectiveCamera`]: touchscreen unprojection
//!
//! Both are small enough for tests and benches and are safe to share across
//! threads.

mod camera;
mod hierarchy;

pub use camera::PerspectiveCamera;
pub use hierarchy::Scene;
