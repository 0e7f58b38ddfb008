// songshelf - local music catalog and playback manager
// The catalog feeds the library, the controller drives one playback session over it

pub mod audio;      // backend seam, rodio backend behind the `audio` feature
pub mod catalog;    // text-file catalog: load, save, reconcile against disk
pub mod config;     // settings and paths
pub mod controller; // command surface + change notifications
pub mod error;
pub mod library;    // songs, playlists, shuffle and sort
pub mod session;    // playback state machine and background task

pub use catalog::{CatalogReport, CatalogStore};
pub use config::Config;
pub use controller::{Controller, SessionEvent};
pub use error::{AudioError, CatalogError, PlaybackError};
pub use library::{PlayList, Song, SongId, SongLibrary};
pub use session::{PlaybackContext, PlaybackSession, PlaybackState};
