// Controller - the one command surface a UI talks to
// Owns the catalog, the library and the session; every committed change is announced on a broadcast channel

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::catalog::{CatalogReport, CatalogStore};
use crate::error::{CatalogError, PlaybackError};
use crate::library::{PlayList, Song, SongId, SongLibrary, LIBRARY_PLAYLIST_NAME};
use crate::session::{PlaybackContext, PlaybackSession, PlaybackState, TaskEvent};

const EVENT_CAPACITY: usize = 64;

/// Sent after every committed command. Carries no detail: subscribers re-read what they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged,
}

pub struct Controller {
    store: CatalogStore,
    library: SongLibrary,
    session: PlaybackSession,
    selected_playlist: Option<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl Controller {
    pub fn new(store: CatalogStore, library: SongLibrary, session: PlaybackSession) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            library,
            session,
            selected_playlist: None,
            events,
        }
    }

    /// Load songs and playlists through the store, then wrap everything up
    pub fn open(store: CatalogStore, session: PlaybackSession) -> (Self, CatalogReport) {
        let (library, report) = store.open();
        info!(
            "Catalog ready: {} songs, {} playlists",
            library.len(),
            library.playlists().len()
        );
        (Self::new(store, library, session), report)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn notify(&self) {
        // no subscribers is fine
        let _ = self.events.send(SessionEvent::StateChanged);
    }

    /// Announce a playback result unless the command was refused outright
    fn settle<T>(&self, result: Result<T, PlaybackError>) -> Result<T, PlaybackError> {
        match &result {
            Err(PlaybackError::InvalidState { .. }) | Err(PlaybackError::NoCurrentSong) => {}
            _ => self.notify(),
        }
        result
    }

    // ---- playback ----

    pub async fn change_song(&mut self, id: &SongId) -> Result<(), PlaybackError> {
        let result = self.session.change_song(&self.library, id).await;
        self.settle(result)
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        let result = self.session.pause();
        self.settle(result)
    }

    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        let result = self.session.resume();
        self.settle(result)
    }

    pub async fn skip(&mut self) -> Result<(), PlaybackError> {
        let result = self.session.skip(&self.library).await;
        self.settle(result)
    }

    pub async fn previous(&mut self) -> Result<(), PlaybackError> {
        let result = self.session.previous(&self.library).await;
        self.settle(result)
    }

    pub async fn restart(&mut self) -> Result<(), PlaybackError> {
        let result = self.session.restart(&self.library).await;
        self.settle(result)
    }

    /// Play a stored playlist by name. The reserved library name plays the whole library.
    pub async fn play_playlist(
        &mut self,
        name: &str,
        shuffle: bool,
        start_song: Option<&SongId>,
    ) -> Result<(), PlaybackError> {
        if name == LIBRARY_PLAYLIST_NAME {
            return self.play_library(shuffle, start_song).await;
        }

        let Some(playlist) = self.library.playlist(name) else {
            info!("No playlist named '{}'", name);
            return Err(PlaybackError::UnknownPlaylist(name.to_string()));
        };
        let result = self
            .session
            .play_playlist(&self.library, playlist, shuffle, start_song)
            .await;
        self.settle(result)
    }

    pub async fn play_library(
        &mut self,
        shuffle: bool,
        start_song: Option<&SongId>,
    ) -> Result<(), PlaybackError> {
        let all = self.library.library_playlist();
        let result = self
            .session
            .play_playlist(&self.library, &all, shuffle, start_song)
            .await;
        self.settle(result)
    }

    pub async fn enqueue(&mut self, id: &SongId) -> Result<(), PlaybackError> {
        let result = self.session.enqueue(&self.library, id).await;
        self.settle(result)
    }

    pub fn set_shuffle(&mut self, shuffle: bool) -> bool {
        let changed = self.session.set_shuffle(shuffle);
        if changed {
            self.notify();
        }
        changed
    }

    pub async fn stop(&mut self) {
        self.session.stop().await;
        self.notify();
    }

    pub async fn next_task_event(&mut self) -> Option<TaskEvent> {
        self.session.next_task_event().await
    }

    pub async fn handle_task_event(&mut self, event: TaskEvent) -> Result<bool, PlaybackError> {
        let result = self.session.handle_task_event(&self.library, event).await;
        if !matches!(result, Ok(false)) {
            self.notify();
        }
        result
    }

    // ---- library ----

    pub fn add_song(&mut self, song: Song) -> CatalogReport {
        let report = self.store.add_song(&mut self.library, song);
        if report.count > 0 {
            self.notify();
        }
        report
    }

    /// Remove a song from disk and catalog; the session lets go of it first
    pub async fn remove_song(&mut self, id: &SongId) -> CatalogReport {
        self.session.forget_song(id).await;
        let report = self.store.remove_song(&mut self.library, id);
        self.notify();
        report
    }

    /// Sorts the selected playlist (persisted), or the library when none is selected
    pub fn sort_by_artist(&mut self) -> CatalogReport {
        self.sort_with(PlayList::sort_by_artist, SongLibrary::sort_by_artist)
    }

    pub fn sort_by_title(&mut self) -> CatalogReport {
        self.sort_with(PlayList::sort_by_title, SongLibrary::sort_by_title)
    }

    fn sort_with(
        &mut self,
        sort_playlist: fn(&mut PlayList),
        sort_library: fn(&mut SongLibrary),
    ) -> CatalogReport {
        let report = match self.selected_playlist.as_deref() {
            Some(name) => match self.library.playlist_mut(name) {
                Some(playlist) => {
                    sort_playlist(playlist);
                    debug!("Sorted playlist '{}'", name);
                    self.store.save_playlists(&self.library)
                }
                None => {
                    let mut report = CatalogReport::default();
                    report.errors.push(CatalogError::UnknownPlaylist(name.to_string()));
                    report
                }
            },
            None => {
                sort_library(&mut self.library);
                debug!("Sorted library");
                CatalogReport {
                    count: self.library.len(),
                    errors: Vec::new(),
                }
            }
        };
        self.notify();
        report
    }

    pub fn create_playlist(&mut self, name: &str) -> Result<CatalogReport, CatalogError> {
        let name = name.trim();
        self.library.add_playlist(PlayList::new(name))?;
        info!("Created playlist '{}'", name);
        self.notify();
        Ok(self.store.save_playlists(&self.library))
    }

    /// The session keeps its own copy if this playlist is playing
    pub fn delete_playlist(&mut self, name: &str) -> Result<CatalogReport, CatalogError> {
        self.library
            .remove_playlist(name)
            .ok_or_else(|| CatalogError::UnknownPlaylist(name.to_string()))?;
        if self.selected_playlist.as_deref() == Some(name) {
            self.selected_playlist = None;
        }
        info!("Deleted playlist '{}'", name);
        self.notify();
        Ok(self.store.save_playlists(&self.library))
    }

    pub fn add_to_playlist(&mut self, name: &str, id: &SongId) -> Result<CatalogReport, CatalogError> {
        if !self.library.add_to_playlist(name, id)? {
            return Ok(CatalogReport::default());
        }
        self.notify();
        Ok(self.store.save_playlists(&self.library))
    }

    pub fn remove_from_playlist(
        &mut self,
        name: &str,
        id: &SongId,
    ) -> Result<CatalogReport, CatalogError> {
        if !self.library.remove_from_playlist(name, id)? {
            return Ok(CatalogReport::default());
        }
        self.notify();
        Ok(self.store.save_playlists(&self.library))
    }

    /// Choose which list the sort commands apply to; `None` (or the library name) means the library
    pub fn select_playlist(&mut self, name: Option<&str>) -> Result<(), CatalogError> {
        self.selected_playlist = match name {
            None | Some(LIBRARY_PLAYLIST_NAME) => None,
            Some(name) if self.library.playlist(name).is_some() => Some(name.to_string()),
            Some(name) => return Err(CatalogError::UnknownPlaylist(name.to_string())),
        };
        self.notify();
        Ok(())
    }

    /// Persist the whole catalog, compacting removed records away
    pub fn save(&self) -> CatalogReport {
        let mut report = self.store.save(&self.library);
        report.errors.extend(self.store.save_playlists(&self.library).errors);
        report
    }

    // ---- queries ----

    pub fn library(&self) -> &SongLibrary {
        &self.library
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.session
            .current_song()
            .and_then(|id| self.library.song(id))
    }

    pub fn current_playlist(&self) -> Option<&PlayList> {
        self.session.current_playlist()
    }

    pub fn context(&self) -> &PlaybackContext {
        self.session.context()
    }

    pub fn state(&self) -> PlaybackState {
        self.session.state()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn is_playing_playlist(&self) -> bool {
        self.session.is_playing_playlist()
    }

    pub fn is_playing_queue(&self) -> bool {
        self.session.is_playing_queue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::config::{LibraryConfig, PlaybackConfig};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;

    const METADATA: &str = "Nightcall, Kavinsky, Drive, cover1.jpg, nightcall.wav\n\
                            A Real Hero, College, Drive, , hero.wav\n\
                            Under Your Spell, Desire, Drive, , spell.wav\n";

    fn setup(dir: &Path) -> (Controller, MockBackend) {
        let config = LibraryConfig::rooted_at(dir);
        fs::create_dir_all(&config.audio_dir).unwrap();
        fs::create_dir_all(&config.image_dir).unwrap();
        fs::write(&config.metadata_file, METADATA).unwrap();
        for file in ["nightcall.wav", "hero.wav", "spell.wav"] {
            fs::write(config.audio_dir.join(file), b"RIFF").unwrap();
        }
        fs::write(config.image_dir.join("cover1.jpg"), b"img").unwrap();
        fs::write(&config.playlist_file, "Favorites:Nightcall, Kavinsky; Stranger, Vince\n").unwrap();

        let backend = MockBackend::new();
        let playback = PlaybackConfig {
            poll_interval_ms: 5,
            ..PlaybackConfig::default()
        };
        let session = PlaybackSession::new(Box::new(backend.clone()), &playback);
        let (controller, _) = Controller::open(CatalogStore::new(config), session);
        (controller, backend)
    }

    fn nightcall() -> SongId {
        SongId::new("Nightcall", "Kavinsky")
    }

    fn hero() -> SongId {
        SongId::new("A Real Hero", "College")
    }

    #[tokio::test]
    async fn test_load_then_change_song_plays() {
        let dir = TempDir::new().unwrap();
        let (mut controller, backend) = setup(dir.path());

        assert_eq!(controller.library().len(), 3);
        assert_eq!(controller.library().playlist("Favorites").unwrap().len(), 1);

        controller.change_song(&nightcall()).await.unwrap();
        assert!(controller.is_playing());
        assert_eq!(controller.current_song().unwrap().name(), "Nightcall");
        assert_eq!(backend.tally.live(), 1);
    }

    #[tokio::test]
    async fn test_commands_notify_subscribers() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _backend) = setup(dir.path());
        let mut events = controller.subscribe();

        controller.change_song(&nightcall()).await.unwrap();
        assert_eq!(events.try_recv(), Ok(SessionEvent::StateChanged));

        controller.pause().unwrap();
        assert_eq!(events.try_recv(), Ok(SessionEvent::StateChanged));

        // refused commands change nothing, so nothing is announced
        assert!(controller.pause().is_err());
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_play_playlist_and_library() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _backend) = setup(dir.path());

        controller.play_playlist("Favorites", false, None).await.unwrap();
        assert!(controller.is_playing_playlist());
        assert_eq!(controller.current_playlist().unwrap().name(), "Favorites");

        controller.play_library(true, Some(&hero())).await.unwrap();
        assert_eq!(controller.current_playlist().unwrap().name(), LIBRARY_PLAYLIST_NAME);
        assert_eq!(controller.current_song().unwrap().id(), &hero());

        assert!(matches!(
            controller.play_playlist("Nope", false, None).await,
            Err(PlaybackError::UnknownPlaylist(name)) if name == "Nope"
        ));
    }

    #[tokio::test]
    async fn test_skip_twice_leaves_one_handle() {
        let dir = TempDir::new().unwrap();
        let (mut controller, backend) = setup(dir.path());

        controller.play_library(false, None).await.unwrap();
        controller.skip().await.unwrap();
        controller.skip().await.unwrap();

        assert_eq!(backend.tally.live(), 1);
        assert_eq!(backend.tally.max_live(), 1);
    }

    #[tokio::test]
    async fn test_remove_current_song_stops_session() {
        let dir = TempDir::new().unwrap();
        let (mut controller, backend) = setup(dir.path());

        controller.play_playlist("Favorites", false, None).await.unwrap();
        let report = controller.remove_song(&nightcall()).await;
        assert_eq!(report.count, 1);

        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.context(), &PlaybackContext::NoContext);
        assert_eq!(backend.tally.live(), 0);
        assert!(controller.library().playlist("Favorites").unwrap().is_empty());
        assert!(!dir.path().join("Audios").join("nightcall.wav").exists());
    }

    #[tokio::test]
    async fn test_playlist_edits_persist() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _backend) = setup(dir.path());

        controller.create_playlist("Night Drive").unwrap();
        controller.add_to_playlist("Night Drive", &hero()).unwrap();
        controller.add_to_playlist("Night Drive", &nightcall()).unwrap();
        assert!(matches!(
            controller.create_playlist(LIBRARY_PLAYLIST_NAME),
            Err(CatalogError::ReservedName(_))
        ));

        controller.select_playlist(Some("Night Drive")).unwrap();
        controller.sort_by_title();

        let text = fs::read_to_string(dir.path().join("playlists.txt")).unwrap();
        assert!(text.contains("Night Drive:A Real Hero, College; Nightcall, Kavinsky"));

        controller.delete_playlist("Favorites").unwrap();
        let text = fs::read_to_string(dir.path().join("playlists.txt")).unwrap();
        assert!(!text.contains("Favorites"));
        assert!(controller.select_playlist(Some("Favorites")).is_err());
    }

    #[tokio::test]
    async fn test_sort_without_selection_sorts_library() {
        let dir = TempDir::new().unwrap();
        let (mut controller, _backend) = setup(dir.path());

        controller.sort_by_artist();
        let artists: Vec<_> = controller.library().songs().iter().map(|s| s.artist()).collect();
        assert_eq!(artists, vec!["College", "Desire", "Kavinsky"]);
    }

    #[tokio::test]
    async fn test_natural_end_moves_to_next_song() {
        let dir = TempDir::new().unwrap();
        let (mut controller, backend) = setup(dir.path());

        controller.enqueue(&nightcall()).await.unwrap();
        controller.enqueue(&hero()).await.unwrap();
        backend.tally.end(dir.path().join("Audios").join("nightcall.wav"));

        let event = tokio::time::timeout(std::time::Duration::from_secs(2), controller.next_task_event())
            .await
            .unwrap()
            .unwrap();
        assert!(controller.handle_task_event(event).await.unwrap());
        assert!(controller.is_playing_queue());
        assert_eq!(controller.current_song().unwrap().id(), &hero());
    }
}
