//! # RETICLE Grab
//!
//! Moves held entities under a pointing device, constrained to a shape:
//! - [`LinearGrabHandler`]: along a line through the grab point
//! - [`SphericalGrabHandler`]: on a sphere shell around a center
//! - [`PlanarGrabHandler`]: within a plane through the grab point
//! - [`GrabSystem`]: wires drag events to handlers and drives them per frame
//!
//! ## Architecture Rules
//!
//! 1. **Handlers never touch transforms** - `update_grab` returns a matrix,
//!    the grab system writes it
//! 2. **A held entity keeps its focus** - handlers lock the device on the
//!    entity for the whole grab
//! 3. **No lock across a call-out** - handler callbacks and events run with
//!    the grabbable table unlocked
//!
//! ## Example
//!
//! ```rust,ignore
//! use reticle_grab::{GrabDef, GrabSystem, LinearGrabDef, LinearGrabHandler};
//!
//! let grabs = GrabSystem::new(transforms, dispatcher, Some(behaviors));
//! let linear = LinearGrabHandler::new(ctx);
//! grabs.register(slider, &GrabDef::default());
//! linear.create(&grabs, slider, LinearGrabDef::default());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod linear;
pub mod planar;
pub mod spherical;
pub mod system;

pub use error::{GrabError, GrabResult};
pub use handler::{parse_def, DefSpace, GrabContext, GrabInputInterface};
pub use linear::{LinearGrabDef, LinearGrabHandler};
pub use planar::{PlanarGrabDef, PlanarGrabHandler};
pub use spherical::{SphericalGrabDef, SphericalGrabHandler};
pub use system::{GrabDef, GrabSystem, GRAB_SUBSCRIBER};
