//! Effect configuration.

use crate::{FxError, ParameterError};
use audio::AudioSettings;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where particles are born.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmissionMode {
    /// Fixed point in the world (`world_emission_center`).
    #[default]
    World,
    /// Follows the reference object (usually the camera).
    Camera,
    /// Spread over the depth buffer, one screen sample per particle.
    DepthHybrid,
}

/// How particle quads are oriented when tracking is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BillboardMode {
    #[default]
    None,
    /// Face the camera.
    Billboard2D,
    /// Face the reference target.
    Billboard3D,
}

impl FromStr for BillboardMode {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "nenhum" => Ok(Self::None),
            "2d" | "billboard2d" => Ok(Self::Billboard2D),
            "3d" | "billboard3d" => Ok(Self::Billboard3D),
            _ => Err(FxError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for BillboardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Billboard2D => "2d",
            Self::Billboard3D => "3d",
        };
        f.write_str(s)
    }
}

/// Alpha curve over a particle's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadeModel {
    /// `1 - life`: fully opaque at birth, linear fade to zero.
    #[default]
    Linear,
    /// Ramp up over `fade_in` and down over the last `fade_out` of the life.
    InOut,
}

/// Configuration of one effect instance. Copied into the instance on
/// construction; instances never share a parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectParameters {
    /// Requested start state. Consumed (and overridden) by the weather registry.
    #[serde(default)]
    pub activate_on_start: bool,
    #[serde(default = "default_particle_count")]
    pub particle_count: u32,
    /// Seconds.
    #[serde(default = "default_lifespan")]
    pub lifespan: f32,

    #[serde(default)]
    pub emission_mode: EmissionMode,
    #[serde(default)]
    pub world_emission_center: Vec3,
    /// Object tracked for camera emission and target-facing orientation.
    #[serde(default)]
    pub reference_object: Option<String>,

    #[serde(default = "default_direction")]
    pub base_direction: Vec3,
    #[serde(default = "default_speed")]
    pub movement_speed: f32,
    /// Orient particles relative to the reference target.
    #[serde(default)]
    pub rotate_with_target: bool,

    #[serde(default)]
    pub billboard_mode: BillboardMode,
    #[serde(default = "default_billboard_size")]
    pub billboard_size: Vec2,

    /// Half extents of the per-particle spread.
    #[serde(default = "default_dispersion")]
    pub dispersion: Vec3,

    #[serde(default = "default_scale_start")]
    pub scale_start: f32,
    #[serde(default = "default_scale_end")]
    pub scale_end: f32,

    #[serde(default = "default_start_color")]
    pub start_color: Vec3,
    #[serde(default = "default_mid_color")]
    pub mid_color: Vec3,
    #[serde(default = "default_end_color")]
    pub end_color: Vec3,

    /// Fraction of life spent fading in (InOut model only).
    #[serde(default = "default_fade_in")]
    pub fade_in: f32,
    /// Fraction of life spent fading out (InOut model only).
    #[serde(default = "default_fade_out")]
    pub fade_out: f32,
    #[serde(default)]
    pub fade_model: FadeModel,

    /// Textures cycled through over a particle's life.
    #[serde(default = "default_texture_frames")]
    pub texture_frames: u32,

    #[serde(default)]
    pub audio: AudioSettings,
}

fn default_particle_count() -> u32 {
    100
}
fn default_lifespan() -> f32 {
    5.0
}
fn default_direction() -> Vec3 {
    Vec3::Y
}
fn default_speed() -> f32 {
    1.0
}
fn default_billboard_size() -> Vec2 {
    Vec2::ONE
}
fn default_dispersion() -> Vec3 {
    Vec3::new(2.0, 2.0, 1.0)
}
fn default_scale_start() -> f32 {
    0.1
}
fn default_scale_end() -> f32 {
    0.3
}
fn default_start_color() -> Vec3 {
    Vec3::new(1.0, 0.5, 0.2)
}
fn default_mid_color() -> Vec3 {
    Vec3::new(1.0, 0.8, 0.1)
}
fn default_end_color() -> Vec3 {
    Vec3::new(1.0, 0.0, 0.0)
}
fn default_fade_in() -> f32 {
    0.2
}
fn default_fade_out() -> f32 {
    0.3
}
fn default_texture_frames() -> u32 {
    1
}

impl Default for EffectParameters {
    fn default() -> Self {
        Self {
            activate_on_start: false,
            particle_count: default_particle_count(),
            lifespan: default_lifespan(),
            emission_mode: EmissionMode::World,
            world_emission_center: Vec3::ZERO,
            reference_object: None,
            base_direction: default_direction(),
            movement_speed: default_speed(),
            rotate_with_target: false,
            billboard_mode: BillboardMode::None,
            billboard_size: default_billboard_size(),
            dispersion: default_dispersion(),
            scale_start: default_scale_start(),
            scale_end: default_scale_end(),
            start_color: default_start_color(),
            mid_color: default_mid_color(),
            end_color: default_end_color(),
            fade_in: default_fade_in(),
            fade_out: default_fade_out(),
            fade_model: FadeModel::Linear,
            texture_frames: default_texture_frames(),
            audio: AudioSettings::default(),
        }
    }
}

impl EffectParameters {
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.lifespan.is_finite() && self.lifespan > 0.0) {
            return Err(ParameterError::Lifespan(self.lifespan));
        }
        if self.particle_count == 0 {
            return Err(ParameterError::NoParticles);
        }
        if self.texture_frames == 0 {
            return Err(ParameterError::NoTextureFrames);
        }
        Ok(())
    }
}
