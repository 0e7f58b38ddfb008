use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::song::SongId;

/// Name denoting "the whole library"; never stored or loaded as a user playlist
pub const LIBRARY_PLAYLIST_NAME: &str = "Song Library";

/// An ordered list of song references (by identity, never copies).
///
/// `original_order` is the member order captured right before the first shuffle,
/// kept until `unshuffle` or a sort establishes a new canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayList {
    name: String,
    songs: Vec<SongId>,
    original_order: Option<Vec<SongId>>,
}

impl PlayList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            songs: Vec::new(),
            original_order: None,
        }
    }

    pub fn with_songs(name: impl Into<String>, songs: Vec<SongId>) -> Self {
        let mut playlist = Self::new(name);
        for song in songs {
            playlist.add_song(song);
        }
        playlist
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_library(&self) -> bool {
        self.name == LIBRARY_PLAYLIST_NAME
    }

    pub fn songs(&self) -> &[SongId] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn contains(&self, song: &SongId) -> bool {
        self.songs.contains(song)
    }

    pub fn position(&self, song: &SongId) -> Option<usize> {
        self.songs.iter().position(|s| s == song)
    }

    pub fn get(&self, index: usize) -> Option<&SongId> {
        self.songs.get(index)
    }

    /// Append a song; a song already on the list is left where it is
    pub fn add_song(&mut self, song: SongId) -> bool {
        if self.songs.contains(&song) {
            return false;
        }
        debug!("Added '{}' to playlist '{}'", song, self.name);
        if let Some(original) = self.original_order.as_mut() {
            original.push(song.clone());
        }
        self.songs.push(song);
        true
    }

    /// Remove a song by identity. Removing a non-member is a no-op.
    pub fn remove_song(&mut self, song: &SongId) -> bool {
        if let Some(original) = self.original_order.as_mut() {
            original.retain(|s| s != song);
        }
        match self.position(song) {
            Some(pos) => {
                self.songs.remove(pos);
                debug!("Removed '{}' from playlist '{}'", song, self.name);
                true
            }
            None => false,
        }
    }

    pub fn is_shuffled(&self) -> bool {
        self.original_order.is_some()
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Random permutation of the members. Only the first shuffle takes a snapshot,
    /// so repeated shuffles never lose the pre-shuffle order.
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.original_order.is_none() {
            self.original_order = Some(self.songs.clone());
        }
        self.songs.shuffle(rng);
    }

    /// Restore the snapshot taken before the first shuffle. Returns false if not shuffled.
    pub fn unshuffle(&mut self) -> bool {
        match self.original_order.take() {
            Some(original) => {
                self.songs = original;
                true
            }
            None => false,
        }
    }

    pub fn sort_by_title(&mut self) {
        self.songs.sort_by(compare_by_title);
        self.original_order = None;
    }

    pub fn sort_by_artist(&mut self) {
        self.songs.sort_by(compare_by_artist);
        self.original_order = None;
    }
}

// Collation: case-insensitive on the primary field, ties broken by the other field.
// `sort_by` is stable, so full ties keep their current relative order.
pub fn compare_by_title(a: &SongId, b: &SongId) -> Ordering {
    fold(&a.name)
        .cmp(&fold(&b.name))
        .then_with(|| fold(&a.artist).cmp(&fold(&b.artist)))
}

pub fn compare_by_artist(a: &SongId, b: &SongId) -> Ordering {
    fold(&a.artist)
        .cmp(&fold(&b.artist))
        .then_with(|| fold(&a.name).cmp(&fold(&b.name)))
}

fn fold(s: &str) -> String {
    s.to_lowercase()
}
