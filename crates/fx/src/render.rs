//! Rendering collaborator contract.
//!
//! Shader compilation, texture upload and drawing live in the host. An effect
//! only asks for its resources to be built and publishes named parameters
//! (uniforms) each frame.

use crate::{BuildError, EffectParameters, ParticleVertex};
use glam::{Vec2, Vec3};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Uniform names published by effect instances.
pub mod uniforms {
    pub const TIME: &str = "time";
    pub const REFERENCE_POSITION: &str = "ref_pos";
    pub const USE_TRACKING: &str = "use_tracking";
    pub const BILLBOARD_MODE: &str = "billboard_mode";
    pub const TEXTURE_COUNT: &str = "texture_count";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Vec2(Vec2),
    Vec3(Vec3),
}

/// Render resources of one effect instance.
pub trait EffectRenderer {
    /// Build (or rebuild) GPU resources for `params`. Rebuilding with the same
    /// parameters must have no effect beyond the cost of the rebuild.
    fn build_resources(&mut self, params: &EffectParameters) -> Result<(), BuildError>;

    fn set_parameter(&mut self, name: &str, value: ParamValue);

    fn set_visible(&mut self, visible: bool);

    /// CPU-expanded particles for hosts that draw them directly. Ignored by default.
    fn submit_vertices(&mut self, _vertices: &[ParticleVertex]) {}
}

/// What a [`HeadlessRenderer`] has been asked to do.
#[derive(Debug, Default)]
pub struct RenderLog {
    pub builds: u32,
    pub visible: bool,
    pub visibility_changes: u32,
    pub parameters: HashMap<String, ParamValue>,
    pub last_vertex_count: usize,
}

/// Shared view of a [`HeadlessRenderer`]'s log.
pub type RenderProbe = Rc<RefCell<RenderLog>>;

/// Renderer without a GPU. Validates parameters on build and records state.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    log: RenderProbe,
    fail_builds: bool,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer whose every build fails, as with a missing material.
    pub fn failing() -> Self {
        Self {
            fail_builds: true,
            ..Default::default()
        }
    }

    pub fn probe(&self) -> RenderProbe {
        Rc::clone(&self.log)
    }
}

impl EffectRenderer for HeadlessRenderer {
    fn build_resources(&mut self, params: &EffectParameters) -> Result<(), BuildError> {
        if self.fail_builds {
            return Err(BuildError("no material to build against".into()));
        }
        params.validate().map_err(|e| BuildError(e.to_string()))?;
        let mut log = self.log.borrow_mut();
        log.builds += 1;
        log.parameters.insert(
            uniforms::TEXTURE_COUNT.into(),
            ParamValue::Int(params.texture_frames as i32),
        );
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: ParamValue) {
        self.log.borrow_mut().parameters.insert(name.to_string(), value);
    }

    fn set_visible(&mut self, visible: bool) {
        let mut log = self.log.borrow_mut();
        if log.visible != visible {
            log.visibility_changes += 1;
        }
        log.visible = visible;
    }

    fn submit_vertices(&mut self, vertices: &[ParticleVertex]) {
        self.log.borrow_mut().last_vertex_count = vertices.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_build_validates_parameters() {
        let mut r = HeadlessRenderer::new();
        let probe = r.probe();
        assert!(r.build_resources(&EffectParameters::default()).is_ok());
        let bad = EffectParameters {
            lifespan: -1.0,
            ..Default::default()
        };
        assert!(r.build_resources(&bad).is_err());
        assert_eq!(probe.borrow().builds, 1);
        assert!(HeadlessRenderer::failing()
            .build_resources(&EffectParameters::default())
            .is_err());
    }

    #[test]
    fn headless_records_parameters_and_visibility() {
        let mut r = HeadlessRenderer::new();
        let probe = r.probe();
        r.set_parameter(uniforms::TIME, ParamValue::Float(2.5));
        r.set_visible(true);
        r.set_visible(true);
        r.set_visible(false);
        let log = probe.borrow();
        assert_eq!(log.parameters.get(uniforms::TIME), Some(&ParamValue::Float(2.5)));
        assert_eq!(log.visibility_changes, 2);
        assert!(!log.visible);
    }
}
