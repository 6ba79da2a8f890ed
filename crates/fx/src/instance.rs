//! Effect instance lifecycle.
//!
//! An instance moves `Uninitialized -> Inactive <-> Active`. Render resources
//! are built lazily on the first activation and kept across deactivation;
//! only visibility and audio follow the active flag.

use crate::render::uniforms;
use crate::{
    build_particle_vertices, BillboardMode, CameraBasis, DepthSource, EffectParameters,
    EffectRenderer, EmissionInputs, FlatDepth, FxError, OrientationInputs, OrientationStrategy,
    ParamValue, ParticleVertex,
};
use audio::{AudioBehavior, AudioCueScheduler, AudioOutput};
use engine_core::{ObjectId, SceneLookup};
use glam::Vec3;
use std::fmt;
use std::path::Path;

/// Collaborators and clock handed to effects for one frame.
pub struct FrameContext<'a> {
    /// Monotonic frame time in seconds.
    pub time: f32,
    pub scene: &'a dyn SceneLookup,
    pub audio: &'a mut dyn AudioOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Inactive,
    Active,
}

/// Counts of effective lifecycle transitions. No-op calls are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub activations: u32,
    pub deactivations: u32,
    pub builds: u32,
    pub build_failures: u32,
}

#[derive(Debug, Clone)]
struct ReferenceTarget {
    name: String,
    object: ObjectId,
}

/// Snapshot of the tracking geometry, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingReport {
    pub origin: Vec3,
    pub target: Vec3,
    pub direction: Vec3,
    pub distance: f32,
}

impl fmt::Display for TrackingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "origin {:.2?} target {:.2?} direction ({:.2}, {:.2}, {:.2}) distance {:.1}",
            self.origin.to_array(),
            self.target.to_array(),
            self.direction.x,
            self.direction.y,
            self.direction.z,
            self.distance
        )
    }
}

/// One independently activatable particle emitter.
pub struct EffectInstance {
    name: String,
    params: EffectParameters,
    renderer: Box<dyn EffectRenderer>,
    depth: Box<dyn DepthSource>,
    audio: AudioCueScheduler,
    object: Option<ObjectId>,
    state: LifecycleState,
    resources_built: bool,
    auto_activate: bool,
    reference: Option<ReferenceTarget>,
    /// Reference position resolved during the last update.
    tracked_position: Option<Vec3>,
    stats: LifecycleStats,
}

impl EffectInstance {
    pub fn new(name: impl Into<String>, params: EffectParameters, renderer: Box<dyn EffectRenderer>) -> Self {
        let audio = AudioCueScheduler::new(&params.audio);
        Self {
            name: name.into(),
            auto_activate: params.activate_on_start,
            params,
            renderer,
            depth: Box::new(FlatDepth::default()),
            audio,
            object: None,
            state: LifecycleState::Uninitialized,
            resources_built: false,
            reference: None,
            tracked_position: None,
            stats: LifecycleStats::default(),
        }
    }

    /// Replace the audio scheduler (e.g. one with a seeded random source).
    pub fn with_audio_scheduler(mut self, scheduler: AudioCueScheduler) -> Self {
        self.audio = scheduler;
        self
    }

    pub fn with_depth_source(mut self, depth: Box<dyn DepthSource>) -> Self {
        self.depth = depth;
        self
    }

    /// The scene object this emitter is attached to.
    pub fn with_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> Option<ObjectId> {
        self.object
    }

    pub fn params(&self) -> &EffectParameters {
        &self.params
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    pub fn resources_built(&self) -> bool {
        self.resources_built
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    pub fn audio(&self) -> &AudioCueScheduler {
        &self.audio
    }

    pub fn reference_name(&self) -> Option<&str> {
        self.reference.as_ref().map(|r| r.name.as_str())
    }

    /// Reference position seen by the last update, `None` when tracking was unavailable.
    pub fn tracked_position(&self) -> Option<Vec3> {
        self.tracked_position
    }

    /// Whether the instance asked to start active.
    pub fn auto_activate(&self) -> bool {
        self.auto_activate
    }

    /// Read and clear the start-active request. Once an owner takes it, the
    /// instance no longer acts on it.
    pub fn take_auto_activate(&mut self) -> bool {
        std::mem::take(&mut self.auto_activate)
    }

    /// Resolve the reference object and load sounds. Leaves the instance
    /// hidden and inactive. Runs once.
    pub fn initialize(&mut self, ctx: &mut FrameContext<'_>) {
        if self.state != LifecycleState::Uninitialized {
            return;
        }
        self.audio.load(&mut *ctx.audio, &self.params.audio);

        if let Some(target) = self.params.reference_object.clone() {
            if !target.is_empty() {
                if let Err(e) = self.resolve_reference(&target, ctx.scene) {
                    log::warn!("{}", e);
                }
            }
        }

        self.renderer.set_visible(false);
        self.state = LifecycleState::Inactive;
        log::info!("{}: particle system initialized (inactive)", self.name);
    }

    /// Initialize, then honor the start-active request if nobody consumed it.
    pub fn awake(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), FxError> {
        self.initialize(ctx);
        if self.auto_activate {
            self.activate_system(ctx)
        } else {
            Ok(())
        }
    }

    /// Show the effect and start its audio, building resources on first use.
    /// Already active is a no-op. A failed build leaves the instance inactive.
    pub fn activate_system(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), FxError> {
        if self.state == LifecycleState::Active {
            return Ok(());
        }
        if self.state == LifecycleState::Uninitialized {
            self.initialize(ctx);
        }
        if !self.resources_built {
            self.build()?;
        }

        self.state = LifecycleState::Active;
        self.renderer.set_visible(true);
        self.audio.on_activate(&mut *ctx.audio);
        self.stats.activations += 1;
        log::info!("{}: particle system ACTIVATED", self.name);
        Ok(())
    }

    /// Hide the effect and stop its audio. Resources are kept.
    pub fn deactivate_system(&mut self, ctx: &mut FrameContext<'_>) {
        if self.state != LifecycleState::Active {
            return;
        }
        self.go_inactive(ctx);
        log::info!("{}: particle system DEACTIVATED", self.name);
    }

    /// Per-frame step: audio cues, time and tracking uniforms.
    pub fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.state == LifecycleState::Active && !self.resources_built && self.build().is_err() {
            log::error!("{}: deferred build failed, deactivating", self.name);
            self.go_inactive(ctx);
            return;
        }
        if self.state != LifecycleState::Active || !self.resources_built {
            return;
        }

        self.audio.update(&mut *ctx.audio, ctx.time);
        self.renderer.set_parameter(uniforms::TIME, ParamValue::Float(ctx.time));
        self.refresh_tracking(ctx.scene);
    }

    /// Orientation the current frame uses.
    pub fn orientation_strategy(&self) -> OrientationStrategy {
        OrientationStrategy::select(
            self.tracked_position.is_some(),
            self.params.rotate_with_target,
            self.params.billboard_mode,
        )
    }

    /// Expand all visible particles at `time` into world-space vertices.
    pub fn vertices(&self, time: f32, scene: &dyn SceneLookup) -> Vec<ParticleVertex> {
        let camera = scene
            .active_camera()
            .and_then(|id| scene.world_transform(id))
            .map(|t| CameraBasis::from_transform(&t))
            .unwrap_or_default();
        let emission = EmissionInputs {
            reference_position: self.tracked_position,
            depth: self.depth.as_ref(),
        };
        let orientation = OrientationInputs {
            camera,
            target: self.tracked_position.unwrap_or(Vec3::ZERO),
        };
        build_particle_vertices(
            &self.params,
            time,
            &emission,
            self.orientation_strategy(),
            &orientation,
        )
    }

    /// Hand CPU-expanded vertices to the renderer. Only active, built instances draw.
    pub fn submit_vertices(&mut self, time: f32, scene: &dyn SceneLookup) {
        if self.state != LifecycleState::Active || !self.resources_built {
            return;
        }
        let vertices = self.vertices(time, scene);
        self.renderer.submit_vertices(&vertices);
    }

    /// Change the billboard mode from a config/console string.
    pub fn set_billboard_mode(&mut self, mode: &str) -> Result<(), FxError> {
        let mode: BillboardMode = mode.parse()?;
        self.apply_billboard_mode(mode)
    }

    /// Change the billboard mode. Built resources are rebuilt for the new mode.
    /// The mode is kept even when the rebuild fails; the error is returned and
    /// the next update retries, deactivating on a second failure.
    pub fn apply_billboard_mode(&mut self, mode: BillboardMode) -> Result<(), FxError> {
        self.params.billboard_mode = mode;
        log::info!("{}: billboard mode set to {}", self.name, mode);
        if self.resources_built {
            self.build()?;
        }
        Ok(())
    }

    /// Point tracking at another object. An empty name turns tracking off.
    /// An unknown name also turns tracking off and reports the lookup failure.
    pub fn set_reference_object(&mut self, target: &str, scene: &dyn SceneLookup) -> Result<(), FxError> {
        if target.is_empty() {
            self.reference = None;
            self.tracked_position = None;
            log::info!("{}: tracking disabled", self.name);
            return Ok(());
        }
        self.resolve_reference(target, scene)?;
        self.params.reference_object = Some(target.to_string());
        log::info!("{}: reference object set to {}", self.name, target);
        Ok(())
    }

    /// Enable or disable orientation toward the reference target.
    pub fn toggle_tracking(&mut self, enable: bool) {
        self.params.rotate_with_target = enable;
        log::info!(
            "{}: tracking {}",
            self.name,
            if enable { "enabled" } else { "disabled" }
        );
    }

    /// Switch the audio behavior at runtime from a config/console string.
    pub fn change_audio_behavior(
        &mut self,
        behavior: &str,
        volume: Option<f32>,
        audio: &mut dyn AudioOutput,
    ) -> Result<(), FxError> {
        let behavior: AudioBehavior = behavior.parse()?;
        self.params.audio.behavior = behavior;
        if let Some(v) = volume {
            self.params.audio.volume = v;
        }
        self.audio.change_behavior(audio, behavior, volume, self.is_active());
        Ok(())
    }

    pub fn add_audio_file(&mut self, path: &Path, audio: &mut dyn AudioOutput) -> Result<(), FxError> {
        self.audio.add_file(audio, path)?;
        log::info!("{}: audio added {}", self.name, path.display());
        Ok(())
    }

    /// Where the emitter is relative to its reference target.
    pub fn tracking_report(&self, scene: &dyn SceneLookup) -> Option<TrackingReport> {
        let target = scene.world_position(self.reference.as_ref()?.object)?;
        let origin = self
            .object
            .and_then(|id| scene.world_position(id))
            .unwrap_or(self.params.world_emission_center);
        let delta = target - origin;
        Some(TrackingReport {
            origin,
            target,
            direction: delta.normalize_or_zero(),
            distance: delta.length(),
        })
    }

    fn resolve_reference(&mut self, target: &str, scene: &dyn SceneLookup) -> Result<(), FxError> {
        match scene.find_object_by_name(target) {
            Some(object) => {
                self.reference = Some(ReferenceTarget {
                    name: target.to_string(),
                    object,
                });
                Ok(())
            }
            None => {
                self.reference = None;
                self.tracked_position = None;
                Err(FxError::LookupFailure {
                    instance: self.name.clone(),
                    target: target.to_string(),
                })
            }
        }
    }

    fn build(&mut self) -> Result<(), FxError> {
        match self.renderer.build_resources(&self.params) {
            Ok(()) => {
                self.resources_built = true;
                self.stats.builds += 1;
                self.renderer.set_parameter(
                    uniforms::BILLBOARD_MODE,
                    ParamValue::Int(billboard_index(self.params.billboard_mode)),
                );
                self.renderer
                    .set_parameter(uniforms::REFERENCE_POSITION, ParamValue::Vec3(Vec3::ZERO));
                self.renderer
                    .set_parameter(uniforms::USE_TRACKING, ParamValue::Bool(false));
                log::debug!("{}: resources built", self.name);
                Ok(())
            }
            Err(source) => {
                self.resources_built = false;
                self.stats.build_failures += 1;
                let err = FxError::BuildFailure {
                    instance: self.name.clone(),
                    source,
                };
                log::error!("{}", err);
                Err(err)
            }
        }
    }

    fn go_inactive(&mut self, ctx: &mut FrameContext<'_>) {
        self.state = LifecycleState::Inactive;
        self.renderer.set_visible(false);
        self.audio.on_deactivate(&mut *ctx.audio);
        self.tracked_position = None;
        self.stats.deactivations += 1;
    }

    fn refresh_tracking(&mut self, scene: &dyn SceneLookup) {
        let Some(reference) = &self.reference else {
            self.tracked_position = None;
            self.renderer
                .set_parameter(uniforms::USE_TRACKING, ParamValue::Bool(false));
            return;
        };
        self.tracked_position = scene.world_position(reference.object);
        match self.tracked_position {
            Some(position) => {
                self.renderer
                    .set_parameter(uniforms::REFERENCE_POSITION, ParamValue::Vec3(position));
                self.renderer
                    .set_parameter(uniforms::USE_TRACKING, ParamValue::Bool(true));
            }
            None => {
                log::debug!("{}: '{}' unavailable, tracking off this frame", self.name, reference.name);
                self.renderer
                    .set_parameter(uniforms::USE_TRACKING, ParamValue::Bool(false));
            }
        }
    }
}

fn billboard_index(mode: BillboardMode) -> i32 {
    match mode {
        BillboardMode::None => 0,
        BillboardMode::Billboard2D => 1,
        BillboardMode::Billboard3D => 2,
    }
}
