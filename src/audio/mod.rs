// Audio seam - the core never decodes anything itself
// A backend opens a file into a handle; the playback task owns that handle until it is cancelled

#[cfg(feature = "audio")]
pub mod player;

#[cfg(feature = "audio")]
pub use player::RodioBackend;

#[cfg(test)]
pub(crate) mod mock;

use std::path::Path;

use crate::error::AudioError;

#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub volume: f32, // 0.0 to 1.0
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}

impl From<&crate::config::PlaybackConfig> for AudioConfig {
    fn from(config: &crate::config::PlaybackConfig) -> Self {
        Self {
            volume: config.volume.clamp(0.0, 1.0),
        }
    }
}

/// Something that can turn a file on disk into a playable stream.
///
/// `open` runs on the control thread so a bad path is reported before any task is spawned.
pub trait AudioBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioHandle>, AudioError>;
}

/// One decoded stream. Dropping the handle must release the output.
pub trait AudioHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// True once the stream ran out of samples on its own
    fn is_finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Ogg,
    Mp4,
    Wav,
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => AudioFormat::Mp3,
            "flac" => AudioFormat::Flac,
            "ogg" | "oga" => AudioFormat::Ogg,
            "mp4" | "m4a" | "aac" => AudioFormat::Mp4,
            "wav" | "wave" => AudioFormat::Wav,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Unknown)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}
