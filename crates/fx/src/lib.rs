//! Procedural particle effects.
//!
//! Particles carry no state between frames: every position, color and scale
//! is recomputed from (particle index, time, parameters). An
//! [`EffectInstance`] wraps one parameter set together with its render
//! resources, tracking target and audio cues.

pub mod error;
pub mod geometry;
pub mod instance;
pub mod kinematics;
pub mod orientation;
pub mod params;
pub mod render;

pub use error::*;
pub use geometry::*;
pub use instance::*;
pub use kinematics::*;
pub use orientation::*;
pub use params::*;
pub use render::*;
