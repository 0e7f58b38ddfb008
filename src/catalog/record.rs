// Line codecs for the two catalog text files
//   metadata:  name, artist, album, coverRef, audioRef[, duration]
//   playlists: name:title, artist; title, artist; ...

use std::path::Path;
use std::time::Duration;

use crate::error::CatalogError;
use crate::library::{PlayList, Song};

const MIN_FIELDS: usize = 5;
const MAX_FIELDS: usize = 6;

/// One parsed metadata line. `raw` is kept for the loose substring join.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub cover_ref: String,
    pub audio_ref: String,
    pub extra: Option<String>,
    pub raw: String,
}

impl MetadataRecord {
    /// `Ok(None)` for blank (tombstoned) lines
    pub fn parse(line: &str, line_no: usize) -> Result<Option<Self>, CatalogError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < MIN_FIELDS || fields.len() > MAX_FIELDS {
            return Err(CatalogError::MalformedRecord {
                line: line_no,
                reason: format!(
                    "expected {} or {} fields, found {}",
                    MIN_FIELDS,
                    MAX_FIELDS,
                    fields.len()
                ),
            });
        }

        for (index, label) in [(0, "name"), (1, "artist"), (4, "audio reference")] {
            if fields[index].is_empty() {
                return Err(CatalogError::MalformedRecord {
                    line: line_no,
                    reason: format!("empty {}", label),
                });
            }
        }

        Ok(Some(Self {
            name: fields[0].to_string(),
            artist: fields[1].to_string(),
            album: fields[2].to_string(),
            cover_ref: fields[3].to_string(),
            audio_ref: fields[4].to_string(),
            extra: fields
                .get(5)
                .filter(|extra| !extra.is_empty())
                .map(|extra| extra.to_string()),
            raw: line.to_string(),
        }))
    }

    pub fn from_song(song: &Song) -> Self {
        let file_name = |path: &Path| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        let mut record = Self {
            name: song.name().to_string(),
            artist: song.artist().to_string(),
            album: song.album().to_string(),
            cover_ref: song.cover().map(file_name).unwrap_or_default(),
            audio_ref: file_name(song.audio_path()),
            extra: song.duration().map(format_duration),
            raw: String::new(),
        };
        record.raw = record.to_line();
        record
    }

    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}, {}, {}, {}, {}",
            self.name, self.artist, self.album, self.cover_ref, self.audio_ref
        );
        if let Some(extra) = &self.extra {
            line.push_str(", ");
            line.push_str(extra);
        }
        line
    }

    /// Why this record would not parse back into the same song, if it would not
    pub fn storage_problem(&self) -> Option<String> {
        let fields = [
            ("name", &self.name),
            ("artist", &self.artist),
            ("album", &self.album),
            ("cover file", &self.cover_ref),
            ("audio file", &self.audio_ref),
        ];
        for (label, value) in fields {
            if value.contains(&[',', '\n', '\r'][..]) {
                return Some(format!("{} '{}' contains a record separator", label, value));
            }
            if value.trim() != value.as_str() {
                return Some(format!("{} '{}' has surrounding whitespace", label, value));
            }
        }

        // name and artist also form the "title, artist" playlist keys
        for (label, value) in [("name", &self.name), ("artist", &self.artist)] {
            if value.contains(';') {
                return Some(format!("{} '{}' contains a playlist separator", label, value));
            }
        }

        if self.name.is_empty() || self.artist.is_empty() || self.audio_ref.is_empty() {
            return Some("name, artist and audio file are required".to_string());
        }
        None
    }

    pub fn is_for(&self, name: &str, artist: &str) -> bool {
        self.name == name && self.artist == artist
    }

    pub fn duration(&self) -> Option<Duration> {
        self.extra.as_deref().and_then(parse_duration)
    }
}

/// Accepts `m:ss`, `h:mm:ss` or whole seconds
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    for part in text.split(':') {
        let value: u64 = part.parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
    }
    Some(Duration::from_secs(total))
}

pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistLine {
    pub name: String,
    /// Trimmed `"title, artist"` keys, in file order
    pub entries: Vec<String>,
}

/// `None` when the line has no `:` separator (which ends playlist loading)
pub fn parse_playlist_line(line: &str) -> Option<PlaylistLine> {
    let (name, songs) = line.split_once(':')?;

    let entries = songs
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    Some(PlaylistLine {
        name: name.trim().to_string(),
        entries,
    })
}

pub fn playlist_to_line(playlist: &PlayList) -> String {
    let entries: Vec<String> = playlist.songs().iter().map(|id| id.to_string()).collect();
    format!("{}:{}", playlist.name(), entries.join("; "))
}
