//! Audio cues for particle effects.
//!
//! Effects never talk to a sound device directly. They drive an
//! [`AudioCueScheduler`], which issues play/stop requests to whatever
//! [`AudioOutput`] the host provides: [`KiraAudio`] for real playback or
//! [`RecordingAudio`] for headless runs.

mod error;
mod kira_output;
mod output;
mod scheduler;

pub use error::AudioError;
pub use kira_output::KiraAudio;
pub use output::*;
pub use scheduler::*;

// Re-export for convenience
pub use kira;
