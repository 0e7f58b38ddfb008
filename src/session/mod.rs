// Playback Session - what is playing, from where, and in which state
// Holds identities only; every start resolves the song through the library it is handed

pub mod task;

pub use task::{PlaybackTask, TaskEvent};

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::AudioBackend;
use crate::config::{EndOfList, PlaybackConfig};
use crate::error::PlaybackError;
use crate::library::{PlayList, SongId, SongLibrary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Scope of the current playback
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackContext {
    NoContext,
    SingleSong,
    /// A private copy of the playlist; shuffling it never touches the library's list
    Playlist { list: PlayList, index: usize },
    Queue { songs: Vec<SongId>, index: usize },
}

impl PlaybackContext {
    fn entries(&self) -> Option<(&[SongId], usize)> {
        match self {
            PlaybackContext::Playlist { list, index } => Some((list.songs(), *index)),
            PlaybackContext::Queue { songs, index } => Some((songs.as_slice(), *index)),
            _ => None,
        }
    }

    fn set_index(&mut self, new_index: usize) {
        match self {
            PlaybackContext::Playlist { index, .. } | PlaybackContext::Queue { index, .. } => {
                *index = new_index
            }
            _ => {}
        }
    }
}

pub struct PlaybackSession {
    backend: Box<dyn AudioBackend>,
    end_of_list: EndOfList,
    poll_interval: Duration,

    state: PlaybackState,
    current: Option<SongId>,
    context: PlaybackContext,

    task: Option<PlaybackTask>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<TaskEvent>,
    events_rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl PlaybackSession {
    pub fn new(backend: Box<dyn AudioBackend>, config: &PlaybackConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            end_of_list: config.end_of_list,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            state: PlaybackState::Stopped,
            current: None,
            context: PlaybackContext::NoContext,
            task: None,
            generation: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_song(&self) -> Option<&SongId> {
        self.current.as_ref()
    }

    pub fn context(&self) -> &PlaybackContext {
        &self.context
    }

    /// The session's copy of the playlist being played
    pub fn current_playlist(&self) -> Option<&PlayList> {
        match &self.context {
            PlaybackContext::Playlist { list, .. } => Some(list),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_playing_playlist(&self) -> bool {
        matches!(self.context, PlaybackContext::Playlist { .. })
    }

    pub fn is_playing_queue(&self) -> bool {
        matches!(self.context, PlaybackContext::Queue { .. })
    }

    /// Play one song. An enclosing playlist or queue that holds the song is kept.
    pub async fn change_song(&mut self, library: &SongLibrary, id: &SongId) -> Result<(), PlaybackError> {
        let position = self
            .context
            .entries()
            .and_then(|(songs, _)| songs.iter().position(|s| s == id));

        match position {
            Some(index) => self.context.set_index(index),
            None => self.context = PlaybackContext::SingleSong,
        }

        self.start(library, id.clone()).await
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Playing {
            info!("Ignoring pause while {:?}", self.state);
            return Err(PlaybackError::InvalidState {
                action: "pause",
                state: self.state,
            });
        }

        if let Some(task) = &self.task {
            task.pause();
        }
        self.state = PlaybackState::Paused;
        debug!("Paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Paused {
            info!("Ignoring resume while {:?}", self.state);
            return Err(PlaybackError::InvalidState {
                action: "resume",
                state: self.state,
            });
        }

        if let Some(task) = &self.task {
            task.resume();
        }
        self.state = PlaybackState::Playing;
        debug!("Resumed");
        Ok(())
    }

    /// Advance to the next entry of the playlist/queue, or stop when there is none
    pub async fn skip(&mut self, library: &SongLibrary) -> Result<(), PlaybackError> {
        if self.current.is_none() {
            return Err(PlaybackError::NoCurrentSong);
        }
        self.advance(library).await
    }

    /// Move back one entry (clamped at the first); outside a list this restarts
    pub async fn previous(&mut self, library: &SongLibrary) -> Result<(), PlaybackError> {
        let Some(current) = self.current.clone() else {
            return Err(PlaybackError::NoCurrentSong);
        };

        match self.context.entries() {
            Some((songs, index)) if !songs.is_empty() => {
                let index = index.saturating_sub(1);
                let id = songs[index].clone();
                self.context.set_index(index);
                self.start(library, id).await
            }
            _ => self.start(library, current).await,
        }
    }

    /// Start the current song over without moving in the context
    pub async fn restart(&mut self, library: &SongLibrary) -> Result<(), PlaybackError> {
        let Some(current) = self.current.clone() else {
            return Err(PlaybackError::NoCurrentSong);
        };
        self.start(library, current).await
    }

    /// Play a playlist from `start_song` (or the top). Shuffling applies to the session's copy.
    pub async fn play_playlist(
        &mut self,
        library: &SongLibrary,
        playlist: &PlayList,
        shuffle: bool,
        start_song: Option<&SongId>,
    ) -> Result<(), PlaybackError> {
        self.stop_task().await;

        let mut list = playlist.clone();
        if list.is_empty() {
            self.reset();
            return Err(PlaybackError::EmptyContext);
        }
        if shuffle {
            list.shuffle();
        }

        let index = start_song.and_then(|id| list.position(id)).unwrap_or(0);
        let id = list.songs()[index].clone();
        info!(
            "Playing playlist '{}' ({} songs, shuffle: {}) from #{}",
            list.name(),
            list.len(),
            shuffle,
            index
        );

        self.context = PlaybackContext::Playlist { list, index };
        self.start(library, id).await
    }

    /// Append to the ad-hoc queue. Outside a queue this starts a new one with the song.
    pub async fn enqueue(&mut self, library: &SongLibrary, id: &SongId) -> Result<(), PlaybackError> {
        if !library.contains(id) {
            return Err(dangling(id));
        }

        if let PlaybackContext::Queue { songs, .. } = &mut self.context {
            songs.push(id.clone());
            debug!("Queued '{}' ({} in queue)", id, songs.len());
            if self.state != PlaybackState::Stopped {
                return Ok(());
            }
            let index = songs.len() - 1;
            self.context.set_index(index);
        } else {
            self.context = PlaybackContext::Queue {
                songs: vec![id.clone()],
                index: 0,
            };
        }

        self.start(library, id.clone()).await
    }

    /// Shuffle or restore the playlist being played; the current song keeps playing.
    /// Returns false when there is no playlist context or nothing changed.
    pub fn set_shuffle(&mut self, shuffle: bool) -> bool {
        let current = self.current.clone();
        let PlaybackContext::Playlist { list, index } = &mut self.context else {
            return false;
        };

        let changed = if shuffle {
            list.shuffle();
            true
        } else {
            list.unshuffle()
        };

        if let Some(position) = current.as_ref().and_then(|id| list.position(id)) {
            *index = position;
        }
        debug!("Shuffle {} for '{}'", if shuffle { "on" } else { "off" }, list.name());
        changed
    }

    /// Stop everything and forget the context
    pub async fn stop(&mut self) {
        self.stop_task().await;
        self.reset();
        info!("Playback stopped");
    }

    /// The library dropped a song: stop if it is playing, otherwise cut it out of the context
    pub async fn forget_song(&mut self, id: &SongId) {
        if self.current.as_ref() == Some(id) {
            info!("Current song '{}' was removed, stopping", id);
            self.stop().await;
            return;
        }

        match &mut self.context {
            PlaybackContext::Playlist { list, index } => {
                if let Some(position) = list.position(id) {
                    list.remove_song(id);
                    if position < *index {
                        *index -= 1;
                    }
                }
            }
            PlaybackContext::Queue { songs, index } => {
                let before = songs[..(*index).min(songs.len())]
                    .iter()
                    .filter(|s| *s == id)
                    .count();
                songs.retain(|s| s != id);
                *index -= before;
            }
            _ => {}
        }
    }

    /// Wait for the next report from a background task
    pub async fn next_task_event(&mut self) -> Option<TaskEvent> {
        self.events_rx.recv().await
    }

    /// React to a task report. Reports from tasks that were already replaced are ignored.
    /// Returns true if the session moved on.
    pub async fn handle_task_event(
        &mut self,
        library: &SongLibrary,
        event: TaskEvent,
    ) -> Result<bool, PlaybackError> {
        match event {
            TaskEvent::Finished { generation } => {
                if generation != self.generation || self.state == PlaybackState::Stopped {
                    debug!("Ignoring stale end of task #{}", generation);
                    return Ok(false);
                }
                self.advance(library).await?;
                Ok(true)
            }
        }
    }

    async fn advance(&mut self, library: &SongLibrary) -> Result<(), PlaybackError> {
        let next = match self.context.entries() {
            Some((songs, index)) if index + 1 < songs.len() => Some(index + 1),
            Some((songs, _)) if !songs.is_empty() && self.end_of_list == EndOfList::Wrap => Some(0),
            _ => None,
        };

        match next {
            Some(index) => {
                let id = match self.context.entries() {
                    Some((songs, _)) => songs[index].clone(),
                    None => return Err(PlaybackError::EmptyContext),
                };
                self.context.set_index(index);
                self.start(library, id).await
            }
            None => {
                info!("End of list");
                self.stop().await;
                Ok(())
            }
        }
    }

    /// Cancel whatever is running, then open and hand the new stream to a fresh task
    async fn start(&mut self, library: &SongLibrary, id: SongId) -> Result<(), PlaybackError> {
        self.stop_task().await;

        let Some(song) = library.song(&id) else {
            warn!("'{}' is no longer in the library", id);
            self.reset();
            return Err(dangling(&id));
        };

        let handle = match self.backend.open(song.audio_path()) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not play '{}': {}", id, e);
                self.reset();
                return Err(PlaybackError::InvalidAudioStream {
                    path: song.audio_path().to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        self.generation += 1;
        self.task = Some(PlaybackTask::spawn(
            handle,
            self.generation,
            self.poll_interval,
            self.events_tx.clone(),
        ));
        info!("Now playing '{}'", id);
        self.current = Some(id);
        self.state = PlaybackState::Playing;
        Ok(())
    }

    async fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop().await;
        }
    }

    fn reset(&mut self) {
        self.state = PlaybackState::Stopped;
        self.current = None;
        self.context = PlaybackContext::NoContext;
    }
}

fn dangling(id: &SongId) -> PlaybackError {
    PlaybackError::DanglingReference {
        name: id.name.clone(),
        artist: id.artist.clone(),
    }
}
