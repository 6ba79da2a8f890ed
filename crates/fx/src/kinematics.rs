//! Stateless per-particle simulation.
//!
//! A particle is fully described by its index and the current time. Nothing
//! is integrated across frames, so any frame can be evaluated in isolation and
//! restarting an effect needs no history.

use crate::{EffectParameters, EmissionMode, FadeModel};
use glam::{UVec2, Vec2, Vec3};

/// Per-index time shift so particles do not all respawn together.
pub const PHASE_OFFSET: f32 = 0.1;

/// Hash salts for the x, y and z dispersion axes.
pub const DISPERSION_SALTS: [f32; 3] = [0.5, 1.3, 2.7];

/// Width/height of the world area covered by depth-hybrid emission.
const HYBRID_EXTENT: f32 = 20.0;
const HYBRID_DEPTH_RANGE: f32 = 10.0;
const HYBRID_DEPTH_OFFSET: f32 = 5.0;

/// Screen depth provider for [`EmissionMode::DepthHybrid`].
pub trait DepthSource {
    fn resolution(&self) -> UVec2;

    /// Normalized depth at `uv` (both in 0..1).
    fn sample(&self, uv: Vec2) -> f32;
}

/// Constant depth over the whole screen.
#[derive(Debug, Clone, Copy)]
pub struct FlatDepth {
    pub resolution: UVec2,
    pub depth: f32,
}

impl Default for FlatDepth {
    fn default() -> Self {
        Self {
            resolution: UVec2::new(1280, 720),
            depth: 0.5,
        }
    }
}

impl DepthSource for FlatDepth {
    fn resolution(&self) -> UVec2 {
        self.resolution
    }

    fn sample(&self, _uv: Vec2) -> f32 {
        self.depth
    }
}

/// Per-frame inputs that do not come from the parameter set.
#[derive(Clone, Copy)]
pub struct EmissionInputs<'a> {
    /// World position of the reference object, if it resolved this frame.
    pub reference_position: Option<Vec3>,
    pub depth: &'a dyn DepthSource,
}

/// Everything needed to draw one particle this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSample {
    pub life: f32,
    pub position: Vec3,
    pub scale: f32,
    pub color: Vec3,
    pub alpha: f32,
    pub texture_frame: u32,
}

/// Normalized age of particle `index` at `time`, in `[0, 1)`.
pub fn life_fraction(index: u32, time: f32, lifespan: f32) -> f32 {
    if !lifespan.is_finite() || lifespan <= 0.0 {
        return 0.0;
    }
    let f = (time + index as f32 * PHASE_OFFSET).rem_euclid(lifespan) / lifespan;
    if f.is_finite() && f < 1.0 {
        f
    } else {
        0.0
    }
}

/// Deterministic hash of `(index, salt)` into `[0, 1)`.
pub fn hash_noise(index: u32, salt: f32) -> f32 {
    let dot = index as f64 * 12.9898 + salt as f64 * 78.233;
    let v = dot.sin() * 43758.5453;
    (v - v.floor()) as f32
}

/// Fixed spread of a particle around its path, within `[-extents, extents]`.
pub fn dispersion_offset(index: u32, extents: Vec3) -> Vec3 {
    let [sx, sy, sz] = DISPERSION_SALTS;
    Vec3::new(
        (hash_noise(index, sx) * 2.0 - 1.0) * extents.x,
        (hash_noise(index, sy) * 2.0 - 1.0) * extents.y,
        (hash_noise(index, sz) * 2.0 - 1.0) * extents.z,
    )
}

/// Three-stop color ramp: start → mid over the first half, mid → end after.
pub fn color_at(params: &EffectParameters, life: f32) -> Vec3 {
    if life < 0.5 {
        params.start_color.lerp(params.mid_color, life * 2.0)
    } else {
        params.mid_color.lerp(params.end_color, (life - 0.5) * 2.0)
    }
}

pub fn alpha_at(params: &EffectParameters, life: f32) -> f32 {
    match params.fade_model {
        FadeModel::Linear => 1.0 - life,
        FadeModel::InOut => {
            let fade_in = if params.fade_in > 0.0 {
                (life / params.fade_in).min(1.0)
            } else {
                1.0
            };
            let fade_out = if params.fade_out > 0.0 {
                ((1.0 - life) / params.fade_out).min(1.0)
            } else {
                1.0
            };
            (fade_in * fade_out).clamp(0.0, 1.0)
        }
    }
}

pub fn scale_at(params: &EffectParameters, life: f32) -> f32 {
    params.scale_start + (params.scale_end - params.scale_start) * life
}

/// Texture shown at `life`: the last frame whose start the particle has passed.
pub fn texture_frame(life: f32, frames: u32) -> u32 {
    (1..frames)
        .rev()
        .find(|&i| life > i as f32 / frames as f32)
        .unwrap_or(0)
}

/// Birth point of a particle for the configured emission mode.
pub fn emission_base(index: u32, params: &EffectParameters, inputs: &EmissionInputs<'_>) -> Vec3 {
    match params.emission_mode {
        EmissionMode::World => params.world_emission_center,
        EmissionMode::Camera => inputs.reference_position.unwrap_or(Vec3::ZERO),
        EmissionMode::DepthHybrid => {
            let res = inputs.depth.resolution().max(UVec2::ONE);
            let uv = Vec2::new(
                (index % res.x) as f32 / res.x as f32,
                (index / res.x) as f32 / res.y as f32,
            );
            let depth = inputs.depth.sample(uv);
            Vec3::new(
                (uv.x - 0.5) * HYBRID_EXTENT,
                (uv.y - 0.5) * HYBRID_EXTENT,
                depth * HYBRID_DEPTH_RANGE - HYBRID_DEPTH_OFFSET,
            )
        }
    }
}

/// Evaluate a particle at an explicit life fraction. A fraction of 1 or more
/// is a respawn and snaps the particle back to its birth point.
pub fn sample_at_fraction(
    index: u32,
    life: f32,
    params: &EffectParameters,
    inputs: &EmissionInputs<'_>,
) -> ParticleSample {
    let base = emission_base(index, params, inputs);
    let position = if life >= 1.0 {
        base
    } else {
        base + params.base_direction * params.movement_speed * life
            + dispersion_offset(index, params.dispersion)
    };
    ParticleSample {
        life,
        position,
        scale: scale_at(params, life),
        color: color_at(params, life),
        alpha: alpha_at(params, life),
        texture_frame: texture_frame(life, params.texture_frames),
    }
}

/// Evaluate particle `index` at `time`.
pub fn sample_particle(
    index: u32,
    time: f32,
    params: &EffectParameters,
    inputs: &EmissionInputs<'_>,
) -> ParticleSample {
    let life = life_fraction(index, time, params.lifespan);
    sample_at_fraction(index, life, params, inputs)
}
