//! weatherfx: drives the weather controller and its particle effects over a
//! scene described in RON, at a fixed frame rate, without a window.
//!
//! Usage: `weatherfx [scene.ron]`. Set `RUST_LOG=debug` for per-instance detail.

mod config;

use anyhow::{Context, Result};
use audio::{AudioOutput, KiraAudio, RecordingAudio};
use config::SceneConfig;
use engine_core::{ObjectId, Property, Scene, SceneLookup, Time, Transform};
use fx::{EffectInstance, FrameContext, HeadlessRenderer, RenderProbe};
use glam::{Quat, Vec3};
use std::path::PathBuf;
use weather::{EffectRegistry, WeatherCategory, WeatherStateMachine};

/// Owner properties mirrored from the controller every frame.
const PROP_ACTIVATE: &str = "activate";
const PROP_WEATHER: &str = "current_weather";

/// Seconds between tracking diagnostics at debug level.
const TRACKING_LOG_INTERVAL: f32 = 5.0;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load(&PathBuf::from(path)),
        None => {
            log::info!("No scene file given, using the built-in scene");
            SceneConfig::default()
        }
    };
    log::info!(
        "Starting weatherfx: {} emitters, {:.0}s at {:.0} fps",
        config.emitters.len(),
        config.run_seconds,
        config.frame_rate
    );

    let mut scene = Scene::new();
    let camera = spawn_camera(&mut scene, &config);
    let owner = spawn_owner(&mut scene, &config);
    for object in &config.objects {
        scene.spawn_object(&object.name, Transform::from_position(object.position));
    }

    let mut probes: Vec<RenderProbe> = Vec::with_capacity(config.emitters.len());
    let instances: Vec<EffectInstance> = config
        .emitters
        .iter()
        .map(|e| {
            let object = scene.spawn_object(&e.name, Transform::from_position(e.position));
            let renderer = HeadlessRenderer::new();
            probes.push(renderer.probe());
            EffectInstance::new(e.name.clone(), e.params.clone(), Box::new(renderer)).with_object(object)
        })
        .collect();

    let mut output = open_audio(&config);

    let mut registry = EffectRegistry::new();
    {
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: output.as_mut() };
        registry.scan(instances, &mut ctx);
    }

    let (initial, active) = initial_state(&scene, owner, &config);
    let mut machine = WeatherStateMachine::new(registry, config.weather.clone());
    machine.set_active(active);
    {
        let mut ctx = FrameContext { time: 0.0, scene: &scene, audio: output.as_mut() };
        machine.start(initial, &mut ctx);
    }
    persist(&mut scene, owner, &machine);

    let dt = 1.0 / config.frame_rate;
    let frames = (config.run_seconds * config.frame_rate).ceil() as u64;
    let mut time = Time::new();
    let mut since_tracking_log = 0.0;
    let mut drawn_vertices = 0usize;

    for _ in 0..frames {
        time.advance(dt);
        let now = time.elapsed_seconds();
        orbit_camera(&mut scene, camera, &config, now);

        if let Some(active) = stored_flag(&scene, owner) {
            machine.set_active(active);
        }

        {
            let mut ctx = FrameContext { time: now, scene: &scene, audio: output.as_mut() };
            machine.frame(dt, &mut ctx);
        }
        machine.registry_mut().submit_all(now, &scene);
        sync_visibility(&mut scene, &machine);
        drawn_vertices += probes
            .iter()
            .filter(|p| p.borrow().visible)
            .map(|p| p.borrow().last_vertex_count)
            .sum::<usize>();
        persist(&mut scene, owner, &machine);

        since_tracking_log += dt;
        if since_tracking_log >= TRACKING_LOG_INTERVAL {
            since_tracking_log = 0.0;
            log_tracking(&machine, &scene);
        }
    }

    log::info!(
        "Finished after {} frames: weather {}, {} transitions, {} vertices generated",
        time.frame_count(),
        machine.current(),
        machine.transitions(),
        drawn_vertices
    );
    for (_, instance) in machine.registry().iter() {
        let s = instance.stats();
        log::info!(
            "  {:<14} {:?} activations {} deactivations {} builds {}",
            instance.name(),
            instance.state(),
            s.activations,
            s.deactivations,
            s.builds
        );
    }
    log::info!("{}", machine.report());
    Ok(())
}

fn spawn_camera(scene: &mut Scene, config: &SceneConfig) -> ObjectId {
    let mut transform = Transform::from_position(config.camera.position);
    transform.look_at(config.camera.look_at, Vec3::Z);
    let camera = scene.spawn_object(&config.camera.name, transform);
    scene.set_active_camera(Some(camera));
    camera
}

/// Swing the camera around its focus point so tracked effects have something to follow.
fn orbit_camera(scene: &mut Scene, camera: ObjectId, config: &SceneConfig, now: f32) {
    let cam = &config.camera;
    if cam.orbit_speed == 0.0 {
        return;
    }
    let offset = Quat::from_rotation_z(cam.orbit_speed * now) * (cam.position - cam.look_at);
    let mut transform = Transform::from_position(cam.look_at + offset);
    transform.look_at(cam.look_at, Vec3::Z);
    scene.set_transform(camera, transform);
}

/// Kira output when a device is available, otherwise an in-memory recorder.
fn open_audio(config: &SceneConfig) -> Box<dyn AudioOutput> {
    match KiraAudio::new(&config.asset_root).context("audio output unavailable") {
        Ok(mut kira) => {
            kira.set_master_volume(config.master_volume);
            Box::new(kira)
        }
        Err(e) => {
            log::warn!("{:#}, sounds will only be recorded", e);
            Box::new(RecordingAudio::new())
        }
    }
}

/// The controller's owner object, carrying whatever a previous session saved on it.
fn spawn_owner(scene: &mut Scene, config: &SceneConfig) -> ObjectId {
    let owner = scene.spawn_object(&config.owner, Transform::default());
    if let Some(tag) = &config.saved.current_weather {
        scene.set_property(owner, PROP_WEATHER, Property::Text(tag.clone()));
    }
    if let Some(active) = config.saved.activate {
        scene.set_property(owner, PROP_ACTIVATE, Property::Bool(active));
    }
    owner
}

/// Starting weather and active flag: owner properties first, then the config.
fn initial_state(scene: &Scene, owner: ObjectId, config: &SceneConfig) -> (WeatherCategory, bool) {
    (
        stored_weather(scene, owner).unwrap_or(config.initial_weather()),
        stored_flag(scene, owner).unwrap_or(config.weather.active),
    )
}

fn stored_weather(scene: &Scene, owner: ObjectId) -> Option<WeatherCategory> {
    let tag = scene.property(owner, PROP_WEATHER)?;
    match tag.as_text()?.parse() {
        Ok(w) => Some(w),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

fn stored_flag(scene: &Scene, owner: ObjectId) -> Option<bool> {
    scene.property(owner, PROP_ACTIVATE)?.as_bool()
}

fn persist(scene: &mut Scene, owner: ObjectId, machine: &WeatherStateMachine) {
    let state = machine.persisted();
    scene.set_property(owner, PROP_WEATHER, Property::Text(state.weather.tag().into()));
    scene.set_property(owner, PROP_ACTIVATE, Property::Bool(state.active));
}

fn log_tracking(machine: &WeatherStateMachine, scene: &Scene) {
    for (_, instance) in machine.registry().iter().filter(|(_, i)| i.is_active()) {
        if let Some(report) = instance.tracking_report(scene) {
            log::debug!("{} tracking: {}", instance.name(), report);
        }
    }
    if let Some(camera) = scene.active_camera() {
        log::debug!(
            "{} at {:?}",
            scene.object_name(camera).unwrap_or_default(),
            scene.world_position(camera).map(|p| p.to_array())
        );
    }
}

/// Mirror each emitter's active state onto its scene object.
fn sync_visibility(scene: &mut Scene, machine: &WeatherStateMachine) {
    for (_, instance) in machine.registry().iter() {
        if let Some(object) = instance.object() {
            if scene.is_visible(object) != Some(instance.is_active()) {
                scene.set_visible(object, instance.is_active());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SavedState;

    fn scene_config(saved: SavedState) -> SceneConfig {
        let mut config = SceneConfig {
            saved,
            ..Default::default()
        };
        config.weather.initial_weather = WeatherCategory::Rainy;
        config.weather.active = true;
        config
    }

    #[test]
    fn fresh_owner_starts_from_config() {
        let config = scene_config(SavedState::default());
        let mut scene = Scene::new();
        let owner = spawn_owner(&mut scene, &config);
        assert!(scene.property(owner, PROP_WEATHER).is_none());
        assert_eq!(initial_state(&scene, owner, &config), (WeatherCategory::Rainy, true));
    }

    #[test]
    fn saved_owner_state_wins_over_config() {
        let config = scene_config(SavedState {
            current_weather: Some("nevando".into()),
            activate: Some(false),
        });
        let mut scene = Scene::new();
        let owner = spawn_owner(&mut scene, &config);
        assert_eq!(initial_state(&scene, owner, &config), (WeatherCategory::Snowy, false));
    }

    #[test]
    fn unreadable_saved_tag_falls_back_to_config() {
        let config = scene_config(SavedState {
            current_weather: Some("hail".into()),
            activate: None,
        });
        let mut scene = Scene::new();
        let owner = spawn_owner(&mut scene, &config);
        assert_eq!(initial_state(&scene, owner, &config), (WeatherCategory::Rainy, true));
    }
}
