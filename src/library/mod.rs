// In-memory model - songs, playlists and the library that owns both
// Playlists only hold identities; the library is the single owner of Song values

pub mod playlist;
pub mod song;

pub use playlist::{PlayList, LIBRARY_PLAYLIST_NAME};
pub use song::{Song, SongId};

use tracing::{debug, info};

use crate::error::CatalogError;

/// Authoritative set of songs (unique by identity) plus the user playlists.
///
/// Invariant: every playlist member is a song of this library.
#[derive(Debug, Default)]
pub struct SongLibrary {
    songs: Vec<Song>,
    playlists: Vec<PlayList>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn song_ids(&self) -> Vec<SongId> {
        self.songs.iter().map(|s| s.id().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn song(&self, id: &SongId) -> Option<&Song> {
        self.songs.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: &SongId) -> bool {
        self.song(id).is_some()
    }

    /// Add a song unless one with the same identity already exists
    pub fn insert_song(&mut self, song: Song) -> bool {
        if self.contains(song.id()) {
            debug!("Song '{}' already in library", song.id());
            return false;
        }
        self.songs.push(song);
        true
    }

    /// Remove a song from the library and from every playlist referencing it
    pub fn remove_song(&mut self, id: &SongId) -> Option<Song> {
        let pos = self.songs.iter().position(|s| s.id() == id)?;
        let song = self.songs.remove(pos);

        for playlist in &mut self.playlists {
            playlist.remove_song(id);
        }

        info!("Removed '{}' from library", id);
        Some(song)
    }

    pub fn playlists(&self) -> &[PlayList] {
        &self.playlists
    }

    pub fn playlist(&self, name: &str) -> Option<&PlayList> {
        self.playlists.iter().find(|p| p.name() == name)
    }

    pub fn playlist_mut(&mut self, name: &str) -> Option<&mut PlayList> {
        self.playlists.iter_mut().find(|p| p.name() == name)
    }

    /// Register a playlist. Members unknown to the library are dropped.
    pub fn add_playlist(&mut self, playlist: PlayList) -> Result<(), CatalogError> {
        if playlist.is_library() {
            return Err(CatalogError::ReservedName(playlist.name().to_string()));
        }
        if self.playlist(playlist.name()).is_some() {
            return Err(CatalogError::DuplicatePlaylist(playlist.name().to_string()));
        }
        // the playlist file keys each line on the name up to the first ':'
        let name = playlist.name();
        if name.is_empty() || name != name.trim() || name.contains(&[':', '\n', '\r'][..]) {
            return Err(CatalogError::InvalidPlaylistName(name.to_string()));
        }

        let mut playlist = playlist;
        let unknown: Vec<SongId> = playlist
            .songs()
            .iter()
            .filter(|id| !self.contains(id))
            .cloned()
            .collect();
        for id in &unknown {
            playlist.remove_song(id);
        }

        self.playlists.push(playlist);
        Ok(())
    }

    pub fn remove_playlist(&mut self, name: &str) -> Option<PlayList> {
        let pos = self.playlists.iter().position(|p| p.name() == name)?;
        Some(self.playlists.remove(pos))
    }

    pub fn add_to_playlist(&mut self, name: &str, id: &SongId) -> Result<bool, CatalogError> {
        if !self.contains(id) {
            return Err(CatalogError::UnknownSong {
                name: id.name.clone(),
                artist: id.artist.clone(),
            });
        }
        let playlist = self
            .playlist_mut(name)
            .ok_or_else(|| CatalogError::UnknownPlaylist(name.to_string()))?;
        Ok(playlist.add_song(id.clone()))
    }

    pub fn remove_from_playlist(&mut self, name: &str, id: &SongId) -> Result<bool, CatalogError> {
        let playlist = self
            .playlist_mut(name)
            .ok_or_else(|| CatalogError::UnknownPlaylist(name.to_string()))?;
        Ok(playlist.remove_song(id))
    }

    /// The whole library as a transient playlist under the reserved name
    pub fn library_playlist(&self) -> PlayList {
        PlayList::with_songs(LIBRARY_PLAYLIST_NAME, self.song_ids())
    }

    pub fn sort_by_title(&mut self) {
        self.songs.sort_by(|a, b| playlist::compare_by_title(a.id(), b.id()));
    }

    pub fn sort_by_artist(&mut self) {
        self.songs.sort_by(|a, b| playlist::compare_by_artist(a.id(), b.id()));
    }
}
