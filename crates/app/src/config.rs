//! Scene description for the demo driver. Loaded from a RON file given on the
//! command line; a built-in scene is used when none is given.

use audio::{AudioBehavior, AudioSettings};
use fx::{BillboardMode, EffectParameters, EmissionMode};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use weather::{WeatherCategory, WeatherConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Simulation steps per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    /// Simulated run length in seconds.
    #[serde(default = "default_run_seconds")]
    pub run_seconds: f32,
    /// Directory sound paths are resolved against.
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    /// Name of the object that carries the weather tag and activate flag.
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Plain scene objects (tracking targets, props).
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Owner properties left by a previous session.
    #[serde(default)]
    pub saved: SavedState,
}

/// Values found on the owner object at startup. Absent values fall back to
/// the weather config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub current_weather: Option<String>,
    #[serde(default)]
    pub activate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_name")]
    pub name: String,
    #[serde(default = "default_camera_position")]
    pub position: Vec3,
    #[serde(default)]
    pub look_at: Vec3,
    /// Orbit speed around `look_at` in radians per second. 0 keeps the camera still.
    #[serde(default)]
    pub orbit_speed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub name: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub params: EffectParameters,
}

fn default_frame_rate() -> f32 {
    60.0
}
fn default_run_seconds() -> f32 {
    60.0
}
fn default_asset_root() -> String {
    "assets".into()
}
fn default_master_volume() -> f64 {
    1.0
}
fn default_owner() -> String {
    "WeatherController".into()
}
fn default_camera_name() -> String {
    "Camera".into()
}
fn default_camera_position() -> Vec3 {
    Vec3::new(0.0, -12.0, 3.0)
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            name: default_camera_name(),
            position: default_camera_position(),
            look_at: Vec3::ZERO,
            orbit_speed: 0.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            run_seconds: default_run_seconds(),
            asset_root: default_asset_root(),
            master_volume: default_master_volume(),
            owner: default_owner(),
            camera: CameraConfig {
                orbit_speed: 0.2,
                ..Default::default()
            },
            objects: Vec::new(),
            emitters: default_emitters(),
            weather: WeatherConfig {
                active: true,
                ..Default::default()
            },
            saved: SavedState::default(),
        }
    }
}

/// One emitter per effect category, roughly tuned for each look.
fn default_emitters() -> Vec<EmitterConfig> {
    let rain = EffectParameters {
        particle_count: 300,
        lifespan: 1.2,
        emission_mode: EmissionMode::Camera,
        reference_object: Some(default_camera_name()),
        base_direction: Vec3::new(0.0, 0.0, -1.0),
        movement_speed: 8.0,
        dispersion: Vec3::new(6.0, 6.0, 1.0),
        start_color: Vec3::new(0.7, 0.75, 0.85),
        mid_color: Vec3::new(0.6, 0.65, 0.8),
        end_color: Vec3::new(0.5, 0.55, 0.7),
        scale_start: 0.05,
        scale_end: 0.05,
        audio: AudioSettings {
            file: Some("rain_loop.ogg".into()),
            behavior: AudioBehavior::Continuous,
            volume: 0.6,
            ..Default::default()
        },
        ..Default::default()
    };
    let snow = EffectParameters {
        particle_count: 200,
        lifespan: 6.0,
        emission_mode: EmissionMode::Camera,
        reference_object: Some(default_camera_name()),
        rotate_with_target: true,
        billboard_mode: BillboardMode::Billboard2D,
        base_direction: Vec3::new(0.2, 0.0, -1.0),
        movement_speed: 1.5,
        dispersion: Vec3::new(8.0, 8.0, 2.0),
        start_color: Vec3::ONE,
        mid_color: Vec3::ONE,
        end_color: Vec3::new(0.9, 0.9, 1.0),
        ..Default::default()
    };
    let dust = EffectParameters {
        particle_count: 120,
        lifespan: 4.0,
        base_direction: Vec3::X,
        movement_speed: 2.0,
        dispersion: Vec3::new(10.0, 10.0, 0.5),
        start_color: Vec3::new(0.75, 0.65, 0.45),
        mid_color: Vec3::new(0.7, 0.6, 0.4),
        end_color: Vec3::new(0.6, 0.5, 0.35),
        audio: AudioSettings {
            file: Some("wind_gust.ogg".into()),
            random_files: vec!["wind_gust_2.ogg".into()],
            behavior: AudioBehavior::Random,
            ..Default::default()
        },
        ..Default::default()
    };
    let leaves = EffectParameters {
        particle_count: 40,
        lifespan: 7.0,
        reference_object: Some(default_camera_name()),
        rotate_with_target: true,
        billboard_mode: BillboardMode::Billboard3D,
        base_direction: Vec3::new(1.0, 0.3, -0.4),
        movement_speed: 1.2,
        start_color: Vec3::new(0.55, 0.6, 0.2),
        mid_color: Vec3::new(0.7, 0.5, 0.15),
        end_color: Vec3::new(0.5, 0.3, 0.1),
        texture_frames: 4,
        ..Default::default()
    };
    let fog = EffectParameters {
        particle_count: 60,
        lifespan: 12.0,
        emission_mode: EmissionMode::DepthHybrid,
        movement_speed: 0.2,
        scale_start: 2.0,
        scale_end: 3.5,
        start_color: Vec3::splat(0.8),
        mid_color: Vec3::splat(0.85),
        end_color: Vec3::splat(0.9),
        fade_model: fx::FadeModel::InOut,
        ..Default::default()
    };
    vec![
        EmitterConfig { name: "rain_main".into(), position: Vec3::new(0.0, 0.0, 8.0), params: rain },
        EmitterConfig { name: "snow_main".into(), position: Vec3::new(0.0, 0.0, 8.0), params: snow },
        EmitterConfig { name: "dust_plains".into(), position: Vec3::ZERO, params: dust },
        EmitterConfig { name: "leaves_grove".into(), position: Vec3::new(3.0, 2.0, 4.0), params: leaves },
        EmitterConfig { name: "fog_valley".into(), position: Vec3::ZERO, params: fog },
    ]
}

impl SceneConfig {
    /// Load the scene at `path`. If the file is missing or invalid, returns the built-in scene.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match ron::from_str::<Self>(&data) {
                Ok(c) => return c.sanitized(),
                Err(e) => log::warn!("Invalid scene at {:?}: {}, using built-in scene", path, e),
            },
            Err(e) => log::warn!("Could not read scene {:?}: {}, using built-in scene", path, e),
        }
        Self::default()
    }

    fn sanitized(mut self) -> Self {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            self.frame_rate = default_frame_rate();
        }
        if !self.run_seconds.is_finite() || self.run_seconds < 0.0 {
            self.run_seconds = default_run_seconds();
        }
        self.weather = self.weather.sanitized();
        self
    }

    pub fn initial_weather(&self) -> WeatherCategory {
        self.weather.initial_weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_scene_covers_every_category() {
        let c = SceneConfig::default();
        let mut categories: Vec<_> = c
            .emitters
            .iter()
            .filter_map(|e| weather::classify(&e.name))
            .collect();
        categories.sort();
        categories.dedup();
        assert_eq!(categories.len(), 5);
        for e in &c.emitters {
            assert!(e.params.validate().is_ok(), "{}", e.name);
        }
    }

    #[test]
    fn parses_minimal_scene() {
        let c: SceneConfig = ron::from_str(
            r#"(
                run_seconds: 5.0,
                emitters: [
                    (name: "rain_01", params: (particle_count: 50, billboard_mode: Billboard2D)),
                ],
                weather: (initial_weather: chuvoso, active: true),
            )"#,
        )
        .unwrap();
        assert_eq!(c.frame_rate, 60.0);
        assert_eq!(c.emitters.len(), 1);
        assert_eq!(c.emitters[0].params.particle_count, 50);
        assert_eq!(c.initial_weather(), WeatherCategory::Rainy);
        assert_eq!(c.camera.name, "Camera");
        assert!(c.saved.current_weather.is_none());

        let saved: SceneConfig =
            ron::from_str(r#"(saved: (current_weather: Some("nevando"), activate: Some(false)))"#).unwrap();
        assert_eq!(saved.saved.current_weather.as_deref(), Some("nevando"));
        assert_eq!(saved.saved.activate, Some(false));
    }

    #[test]
    fn bundled_valley_scene_parses() {
        let c: SceneConfig = ron::from_str(include_str!("../../../scenes/valley.ron")).unwrap();
        assert_eq!(c.emitters.len(), 6);
        assert_eq!(c.emitters[3].params.billboard_mode, BillboardMode::Billboard3D);
        assert_eq!(c.emitters[2].params.audio.behavior, AudioBehavior::Random);
        assert_eq!(weather::classify(&c.emitters[5].name), None);
        assert!(c.weather.active);
    }
}
