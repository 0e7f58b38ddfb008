// Error types for songshelf
// Catalog errors stay inside the store (logged + reported), playback errors go one level up

use std::path::PathBuf;
use thiserror::Error;

use crate::session::PlaybackState;

/// Failures of the Catalog Store. Never fatal: the store logs them and degrades.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// File missing or unreadable/unwritable
    #[error("catalog I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One metadata line that could not be turned into a Song
    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("malformed playlist line {line}: missing ':' separator")]
    MalformedPlaylist { line: usize },

    #[error("song '{name}' by '{artist}' is not in the library")]
    UnknownSong { name: String, artist: String },

    #[error("playlist '{0}' does not exist")]
    UnknownPlaylist(String),

    #[error("playlist '{0}' already exists")]
    DuplicatePlaylist(String),

    #[error("'{0}' is reserved for the whole library")]
    ReservedName(String),

    #[error("'{0}' is not a usable playlist name")]
    InvalidPlaylistName(String),

    /// A song that could be held in memory but would not come back on the next load
    #[error("cannot store '{name}' by '{artist}': {reason}")]
    Unstorable {
        name: String,
        artist: String,
        reason: String,
    },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures surfaced to the caller of a playback command.
/// By the time one of these is returned the session has already healed itself.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("cannot open audio stream {path}: {reason}")]
    InvalidAudioStream { path: PathBuf, reason: String },

    #[error("no song is loaded")]
    NoCurrentSong,

    #[error("'{name}' by '{artist}' was removed from the library")]
    DanglingReference { name: String, artist: String },

    #[error("cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: PlaybackState,
    },

    #[error("nothing to play")]
    EmptyContext,

    #[error("playlist '{0}' does not exist")]
    UnknownPlaylist(String),
}

/// Errors reported by an audio backend implementation
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("audio device error: {0}")]
    Device(String),
}
