//! The audio collaborator contract and an in-memory implementation.

use crate::AudioError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A decoded, cached sound ready to be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// One playing (or finished) instance of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

/// Sound output used by effect instances.
pub trait AudioOutput {
    /// Resolve and decode a sound file relative to the output's asset root.
    fn load(&mut self, path: &Path) -> Result<BufferId, AudioError>;

    /// Start a voice. `volume` is applied before the first sample plays.
    fn play(&mut self, buffer: BufferId, looped: bool, volume: f32) -> Result<VoiceId, AudioError>;

    fn status(&self, voice: VoiceId) -> PlaybackStatus;

    fn stop(&mut self, voice: VoiceId);

    fn set_volume(&mut self, voice: VoiceId, volume: f32);
}

/// A request observed by [`RecordingAudio`].
#[derive(Debug, Clone, PartialEq)]
pub enum AudioRequest {
    Play {
        buffer: BufferId,
        voice: VoiceId,
        looped: bool,
        volume: f32,
    },
    Stop(VoiceId),
    Volume(VoiceId, f32),
}

/// Output that plays nothing and records every request.
///
/// Voices stay `Playing` until stopped or explicitly finished with
/// [`RecordingAudio::finish`], which stands in for a sound reaching its end.
/// A finished voice keeps its slot until it is stopped, like a device handle.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    buffers: Vec<PathBuf>,
    missing: HashSet<PathBuf>,
    voices: HashMap<VoiceId, PlaybackStatus>,
    next_voice: u64,
    failing_plays: usize,
    requests: Vec<AudioRequest>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat these paths as unresolvable.
    pub fn with_missing<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.missing.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Make the next `count` play requests fail as if the device were busy.
    pub fn fail_next_plays(&mut self, count: usize) {
        self.failing_plays = count;
    }

    pub fn requests(&self) -> &[AudioRequest] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Number of play requests seen so far.
    pub fn play_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, AudioRequest::Play { .. }))
            .count()
    }

    pub fn stop_count(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| matches!(r, AudioRequest::Stop(_)))
            .count()
    }

    /// Path a buffer was loaded from.
    pub fn buffer_path(&self, buffer: BufferId) -> Option<&Path> {
        self.buffers.get(buffer.0).map(PathBuf::as_path)
    }

    /// Mark a voice as having played to its end.
    pub fn finish(&mut self, voice: VoiceId) {
        if let Some(status) = self.voices.get_mut(&voice) {
            *status = PlaybackStatus::Stopped;
        }
    }

    pub fn playing_voices(&self) -> usize {
        self.voices
            .values()
            .filter(|s| **s == PlaybackStatus::Playing)
            .count()
    }

    /// Voices not yet released with `stop`, finished ones included.
    pub fn held_voices(&self) -> usize {
        self.voices.len()
    }
}

impl AudioOutput for RecordingAudio {
    fn load(&mut self, path: &Path) -> Result<BufferId, AudioError> {
        if self.missing.contains(path) {
            return Err(AudioError::AssetMissing(path.to_path_buf()));
        }
        self.buffers.push(path.to_path_buf());
        Ok(BufferId(self.buffers.len() - 1))
    }

    fn play(&mut self, buffer: BufferId, looped: bool, volume: f32) -> Result<VoiceId, AudioError> {
        if buffer.0 >= self.buffers.len() {
            return Err(AudioError::UnknownBuffer(buffer.0));
        }
        if self.failing_plays > 0 {
            self.failing_plays -= 1;
            return Err(AudioError::Device("simulated play failure".into()));
        }
        let voice = VoiceId(self.next_voice);
        self.next_voice += 1;
        self.voices.insert(voice, PlaybackStatus::Playing);
        self.requests.push(AudioRequest::Play {
            buffer,
            voice,
            looped,
            volume,
        });
        Ok(voice)
    }

    fn status(&self, voice: VoiceId) -> PlaybackStatus {
        self.voices
            .get(&voice)
            .copied()
            .unwrap_or(PlaybackStatus::Stopped)
    }

    fn stop(&mut self, voice: VoiceId) {
        self.voices.remove(&voice);
        self.requests.push(AudioRequest::Stop(voice));
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) {
        self.requests.push(AudioRequest::Volume(voice, volume));
    }
}
