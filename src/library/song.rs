use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity of a song: the (name, artist) pair, unique within a library
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SongId {
    pub name: String,
    pub artist: String,
}

impl SongId {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
        }
    }
}

// "name, artist" is also the key format used by the playlist file
impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.artist)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    id: SongId,
    album: String,
    cover: Option<PathBuf>,
    audio_path: PathBuf,
    duration: Option<Duration>,
}

impl Song {
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        audio_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: SongId::new(name, artist),
            album: album.into(),
            cover: None,
            audio_path: audio_path.into(),
            duration: None,
        }
    }

    pub fn with_cover(mut self, cover: Option<PathBuf>) -> Self {
        self.cover = cover;
        self
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn id(&self) -> &SongId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn artist(&self) -> &str {
        &self.id.artist
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    pub fn cover(&self) -> Option<&Path> {
        self.cover.as_deref()
    }

    /// Covers are re-associated after construction by the filename heuristic
    pub fn set_cover(&mut self, cover: Option<PathBuf>) {
        self.cover = cover;
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn duration_string(&self) -> String {
        match self.duration {
            Some(duration) => {
                let total = duration.as_secs();
                let hours = total / 3600;
                let minutes = (total % 3600) / 60;
                let seconds = total % 60;

                if hours > 0 {
                    format!("{}:{:02}:{:02}", hours, minutes, seconds)
                } else {
                    format!("{}:{:02}", minutes, seconds)
                }
            }
            None => "Unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_id_display_matches_playlist_key() {
        let id = SongId::new("Nightcall", "Kavinsky");
        assert_eq!(id.to_string(), "Nightcall, Kavinsky");
    }

    #[test]
    fn test_duration_string() {
        let song = Song::new("a", "b", "c", "a.wav");
        assert_eq!(song.duration_string(), "Unknown");

        let song = song.with_duration(Some(Duration::from_secs(258)));
        assert_eq!(song.duration_string(), "4:18");

        let song = song.with_duration(Some(Duration::from_secs(3725)));
        assert_eq!(song.duration_string(), "1:02:05");
    }
}
