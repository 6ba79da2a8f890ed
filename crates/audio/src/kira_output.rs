//! Audio output using Kira.

use crate::{AudioError, AudioOutput, BufferId, PlaybackStatus, VoiceId};
use kira::{
    manager::{backend::DefaultBackend, AudioManager, AudioManagerSettings},
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
    sound::PlaybackState,
    tween::Tween,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Plays effect sounds through a Kira audio manager.
///
/// Sound paths are resolved against `asset_root`. Decoded sounds are cached
/// once and cloned per voice, which only clones the shared frame buffer.
pub struct KiraAudio {
    manager: AudioManager<DefaultBackend>,
    asset_root: PathBuf,
    sounds: Vec<StaticSoundData>,
    voices: HashMap<VoiceId, StaticSoundHandle>,
    next_voice: u64,
}

impl KiraAudio {
    /// Create a new audio output reading sounds from `asset_root`.
    pub fn new(asset_root: impl Into<PathBuf>) -> Result<Self, AudioError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::Device(format!("{:?}", e)))?;
        Ok(Self {
            manager,
            asset_root: asset_root.into(),
            sounds: Vec::new(),
            voices: HashMap::new(),
            next_voice: 0,
        })
    }

    /// Drop handles of voices that have finished playing.
    pub fn cleanup(&mut self) {
        self.voices
            .retain(|_, handle| handle.state() != PlaybackState::Stopped);
    }

    /// Stop all sounds.
    pub fn stop_all(&mut self) {
        for handle in self.voices.values_mut() {
            let _ = handle.stop(Tween::default());
        }
        self.voices.clear();
    }

    /// Set master volume (0.0 to 1.0).
    pub fn set_master_volume(&mut self, volume: f64) {
        let _ = self.manager.main_track().set_volume(volume, Tween::default());
    }
}

impl AudioOutput for KiraAudio {
    fn load(&mut self, path: &Path) -> Result<BufferId, AudioError> {
        let full = self.asset_root.join(path);
        if !full.exists() {
            return Err(AudioError::AssetMissing(full));
        }
        let data = StaticSoundData::from_file(&full).map_err(|e| AudioError::Decode {
            path: full.clone(),
            reason: e.to_string(),
        })?;
        self.sounds.push(data);
        log::info!("Audio loaded: {}", full.display());
        Ok(BufferId(self.sounds.len() - 1))
    }

    fn play(&mut self, buffer: BufferId, looped: bool, volume: f32) -> Result<VoiceId, AudioError> {
        let data = self
            .sounds
            .get(buffer.0)
            .cloned()
            .ok_or(AudioError::UnknownBuffer(buffer.0))?;
        let mut settings = StaticSoundSettings::new().volume(volume as f64);
        if looped {
            settings = settings.loop_region(..);
        }
        let handle = self
            .manager
            .play(data.with_settings(settings))
            .map_err(|e| AudioError::Device(format!("{:?}", e)))?;
        self.cleanup();
        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(voice, handle);
        Ok(voice)
    }

    fn status(&self, voice: VoiceId) -> PlaybackStatus {
        match self.voices.get(&voice).map(|h| h.state()) {
            Some(PlaybackState::Playing) => PlaybackStatus::Playing,
            Some(PlaybackState::Stopped) | None => PlaybackStatus::Stopped,
            Some(_) => PlaybackStatus::Paused,
        }
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(mut handle) = self.voices.remove(&voice) {
            let _ = handle.stop(Tween::default());
        }
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) {
        if let Some(handle) = self.voices.get_mut(&voice) {
            let _ = handle.set_volume(volume as f64, Tween::default());
        }
    }
}
