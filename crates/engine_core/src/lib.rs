//! Core engine types shared by the effect and weather crates.
//!
//! This crate provides:
//! - Transform and spatial helpers
//! - Frame time management
//! - A named-object scene that answers lookups for effects and the weather controller

pub mod scene;
pub mod time;
pub mod transform;

pub use scene::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat2, UVec2, Vec2, Vec3};
pub use hecs::Entity;
