//! Per-effect audio cue state machine.

use crate::{AudioError, AudioOutput, BufferId, PlaybackStatus, VoiceId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How an effect uses its sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioBehavior {
    /// Never plays anything.
    #[default]
    None,
    /// Loops the main sound while active, restarting it if it ever stops.
    Continuous,
    /// Plays the main sound once per activation.
    OneShot,
    /// Plays a random sound every `min_interval..=max_interval` seconds.
    Random,
}

impl FromStr for AudioBehavior {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "nenhum" => Ok(Self::None),
            "continuous" | "loop" | "contínuo" | "continuo" => Ok(Self::Continuous),
            "once" | "oneshot" | "one_shot" | "uma vez" => Ok(Self::OneShot),
            "random" | "aleatório" | "aleatorio" => Ok(Self::Random),
            _ => Err(AudioError::InvalidBehavior(s.to_string())),
        }
    }
}

impl fmt::Display for AudioBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Continuous => "continuous",
            Self::OneShot => "once",
            Self::Random => "random",
        };
        f.write_str(s)
    }
}

/// Audio configuration of one effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Main sound; buffer 0 when it resolves.
    #[serde(default)]
    pub file: Option<String>,
    /// Extra sounds used by the random behavior.
    #[serde(default)]
    pub random_files: Vec<String>,
    #[serde(default)]
    pub behavior: AudioBehavior,
    /// 0.0 to 1.0.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Shortest wait between random cues, in seconds.
    #[serde(default = "default_min_interval")]
    pub min_interval: f32,
    #[serde(default = "default_max_interval")]
    pub max_interval: f32,
}

fn default_volume() -> f32 {
    0.7
}
fn default_min_interval() -> f32 {
    5.0
}
fn default_max_interval() -> f32 {
    15.0
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            file: None,
            random_files: Vec::new(),
            behavior: AudioBehavior::None,
            volume: default_volume(),
            min_interval: default_min_interval(),
            max_interval: default_max_interval(),
        }
    }
}

impl AudioSettings {
    /// Every configured path, main file first.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.file
            .iter()
            .chain(self.random_files.iter())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    Idle,
    PlayingLoop,
    PlayingOnce,
    WaitingForRandom,
}

/// Drives the sound of one effect instance from frame time.
///
/// Waiting is polled: `update` compares the frame time against the next
/// trigger and never blocks.
pub struct AudioCueScheduler {
    behavior: AudioBehavior,
    volume: f32,
    min_interval: f32,
    max_interval: f32,
    buffers: Vec<BufferId>,
    voice: Option<VoiceId>,
    state: CueState,
    next_trigger: f32,
    rng: StdRng,
}

impl AudioCueScheduler {
    pub fn new(settings: &AudioSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Scheduler with a caller-provided random source (deterministic tests).
    pub fn with_rng(settings: &AudioSettings, rng: StdRng) -> Self {
        let lo = settings.min_interval.max(0.0);
        let hi = settings.max_interval.max(0.0);
        Self {
            behavior: settings.behavior,
            volume: settings.volume.clamp(0.0, 1.0),
            min_interval: lo.min(hi),
            max_interval: lo.max(hi),
            buffers: Vec::new(),
            voice: None,
            state: CueState::Idle,
            next_trigger: 0.0,
            rng,
        }
    }

    /// Load every configured sound. Missing files are skipped with a warning;
    /// the scheduler stays uninitialized only if nothing resolved.
    pub fn load(&mut self, out: &mut dyn AudioOutput, settings: &AudioSettings) -> usize {
        for path in settings.paths() {
            match out.load(Path::new(path)) {
                Ok(buffer) => {
                    log::debug!("Loaded audio {}", path);
                    self.buffers.push(buffer);
                }
                Err(e) => log::warn!("{}, skipping", e),
            }
        }
        if self.is_initialized() {
            log::info!(
                "Audio ready: {} file(s), behavior {}",
                self.buffers.len(),
                self.behavior
            );
        }
        self.buffers.len()
    }

    /// Add one more sound at runtime.
    pub fn add_file(&mut self, out: &mut dyn AudioOutput, path: &Path) -> Result<BufferId, AudioError> {
        let buffer = out.load(path)?;
        self.buffers.push(buffer);
        Ok(buffer)
    }

    /// True once at least one sound resolved.
    pub fn is_initialized(&self) -> bool {
        !self.buffers.is_empty()
    }

    pub fn state(&self) -> CueState {
        self.state
    }

    pub fn behavior(&self) -> AudioBehavior {
        self.behavior
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn next_trigger(&self) -> f32 {
        self.next_trigger
    }

    pub fn voice(&self) -> Option<VoiceId> {
        self.voice
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Apply the behavior's activation cue.
    pub fn on_activate(&mut self, out: &mut dyn AudioOutput) {
        if !self.is_initialized() {
            return;
        }
        match self.behavior {
            AudioBehavior::None => self.state = CueState::Idle,
            AudioBehavior::Continuous => {
                // A failed start is retried by the loop watchdog in `update`.
                self.play(out, self.buffers[0], true);
                self.state = CueState::PlayingLoop;
            }
            AudioBehavior::OneShot => {
                if self.play(out, self.buffers[0], false) {
                    self.state = CueState::PlayingOnce;
                }
            }
            AudioBehavior::Random => self.state = CueState::WaitingForRandom,
        }
    }

    /// Per-frame step. `now` is the monotonic frame time in seconds.
    pub fn update(&mut self, out: &mut dyn AudioOutput, now: f32) {
        if !self.is_initialized() {
            return;
        }
        match self.state {
            CueState::WaitingForRandom => {
                if now >= self.next_trigger {
                    if let Some(buffer) = self.buffers.choose(&mut self.rng).copied() {
                        self.play(out, buffer, false);
                        log::debug!("Random cue fired ({} options)", self.buffers.len());
                    }
                    let interval = self.rng.gen_range(self.min_interval..=self.max_interval);
                    self.next_trigger = now + interval;
                }
            }
            CueState::PlayingLoop => {
                let playing = self
                    .voice
                    .map(|v| out.status(v) == PlaybackStatus::Playing)
                    .unwrap_or(false);
                if !playing {
                    self.play(out, self.buffers[0], true);
                }
            }
            CueState::Idle | CueState::PlayingOnce => {}
        }
    }

    /// Stop whatever is playing and return to idle.
    pub fn on_deactivate(&mut self, out: &mut dyn AudioOutput) {
        self.stop_voice(out);
        self.state = CueState::Idle;
    }

    /// Switch behavior (and optionally volume) at runtime. Current audio is
    /// stopped; while `active`, a loop restarts immediately and the random
    /// behavior resumes waiting for its next trigger.
    pub fn change_behavior(
        &mut self,
        out: &mut dyn AudioOutput,
        behavior: AudioBehavior,
        volume: Option<f32>,
        active: bool,
    ) {
        self.behavior = behavior;
        if let Some(volume) = volume {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(voice) = self.voice {
                out.set_volume(voice, self.volume);
            }
        }
        self.on_deactivate(out);
        if !active || !self.is_initialized() {
            return;
        }
        match behavior {
            AudioBehavior::Continuous => {
                self.play(out, self.buffers[0], true);
                self.state = CueState::PlayingLoop;
            }
            AudioBehavior::Random => self.state = CueState::WaitingForRandom,
            AudioBehavior::None | AudioBehavior::OneShot => {}
        }
        log::info!("Audio behavior changed to {}", behavior);
    }

    fn play(&mut self, out: &mut dyn AudioOutput, buffer: BufferId, looped: bool) -> bool {
        self.stop_voice(out);
        match out.play(buffer, looped, self.volume) {
            Ok(voice) => {
                self.voice = Some(voice);
                true
            }
            Err(e) => {
                log::warn!("Could not play audio: {}", e);
                false
            }
        }
    }

    /// Stop and release the current voice, finished or not.
    fn stop_voice(&mut self, out: &mut dyn AudioOutput) {
        if let Some(voice) = self.voice.take() {
            out.stop(voice);
        }
    }
}
