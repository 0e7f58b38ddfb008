// Catalog Store - builds the SongLibrary from two text files and two flat directories,
// and writes library/playlist edits back. Nothing in here is allowed to fail loudly:
// every I/O problem is logged, collected into a CatalogReport, and the store moves on.

pub mod matcher;
pub mod record;

pub use matcher::{ExactMatcher, FileMatcher, SubstringMatcher};
pub use record::{MetadataRecord, PlaylistLine};

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::audio::AudioFormat;
use crate::config::LibraryConfig;
use crate::error::CatalogError;
use crate::library::{PlayList, Song, SongId, SongLibrary};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Outcome of a catalog operation: how many records it touched and what went wrong on the way
#[derive(Debug, Default)]
pub struct CatalogReport {
    pub count: usize,
    pub errors: Vec<CatalogError>,
}

impl CatalogReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, error: CatalogError) {
        warn!("{}", error);
        self.errors.push(error);
    }
}

pub struct CatalogStore {
    config: LibraryConfig,
    matcher: Box<dyn FileMatcher>,
}

impl CatalogStore {
    pub fn new(config: LibraryConfig) -> Self {
        Self::with_matcher(config, Box::new(SubstringMatcher))
    }

    pub fn with_matcher(config: LibraryConfig, matcher: Box<dyn FileMatcher>) -> Self {
        Self { config, matcher }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Songs then playlists, into a fresh library
    pub fn open(&self) -> (SongLibrary, CatalogReport) {
        let mut library = SongLibrary::new();
        let mut report = self.load(&mut library);
        let playlists = self.load_playlists(&mut library);
        report.errors.extend(playlists.errors);
        (library, report)
    }

    /// Reconcile the metadata file against the audio and image directories.
    ///
    /// A missing file or directory leaves the library as it is; a bad line only skips that line.
    pub fn load(&self, library: &mut SongLibrary) -> CatalogReport {
        let mut report = CatalogReport::default();

        let bytes = match fs::read(&self.config.metadata_file) {
            Ok(bytes) => bytes,
            Err(e) => {
                report.record(CatalogError::io(&self.config.metadata_file, e));
                return report;
            }
        };

        let mut records = Vec::new();
        for (index, line) in split_lines(&bytes).enumerate() {
            let parsed = match std::str::from_utf8(line) {
                Ok(line) => MetadataRecord::parse(line, index + 1),
                Err(_) => Err(CatalogError::MalformedRecord {
                    line: index + 1,
                    reason: "not valid UTF-8".to_string(),
                }),
            };
            match parsed {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => report.record(e),
            }
        }

        let audio_files = match list_files(&self.config.audio_dir, is_audio) {
            Ok(files) => files,
            Err(e) => {
                report.record(e);
                return report;
            }
        };

        let images = match list_files(&self.config.image_dir, is_image) {
            Ok(images) => images,
            Err(e) => {
                report.record(e);
                Vec::new()
            }
        };

        // a file named exactly by some record is never handed to another one by the loose join
        let claimed: HashSet<&str> = records.iter().map(|r| r.audio_ref.as_str()).collect();

        for record in &records {
            let exact = audio_files
                .iter()
                .find(|f| file_name(f) == Some(record.audio_ref.as_str()));
            let audio_file = exact.or_else(|| {
                audio_files.iter().find(|f| {
                    !file_name(f).map_or(false, |n| claimed.contains(n))
                        && self.matcher.audio_matches(record, f)
                })
            });
            let Some(audio_file) = audio_file else {
                debug!("No audio file for '{}, {}'", record.name, record.artist);
                continue;
            };

            let mut song = self.song_from_record(record, audio_file);
            // first image whose file name matches wins over the record's own reference
            if let Some(image) = images.iter().find(|i| self.matcher.cover_matches(i, &song)) {
                song.set_cover(Some(image.clone()));
            }
            let id = song.id().clone();
            if library.insert_song(song) {
                report.count += 1;
            } else {
                debug!("Skipping second record for '{}' ({})", id, audio_file.display());
            }
        }

        info!(
            "Loaded {} songs from {} ({} problems)",
            report.count,
            self.config.metadata_file.display(),
            report.errors.len()
        );
        report
    }

    /// Read playlists into the library.
    ///
    /// Stops at the first line without a `:` separator; the reserved library name is skipped;
    /// entries that match no catalog song are dropped silently.
    pub fn load_playlists(&self, library: &mut SongLibrary) -> CatalogReport {
        let mut report = CatalogReport::default();

        let text = match fs::read_to_string(&self.config.playlist_file) {
            Ok(text) => text,
            Err(e) => {
                report.record(CatalogError::io(&self.config.playlist_file, e));
                return report;
            }
        };

        for (index, line) in text.lines().enumerate() {
            let Some(parsed) = record::parse_playlist_line(line) else {
                report.record(CatalogError::MalformedPlaylist { line: index + 1 });
                break;
            };

            if parsed.name == crate::library::LIBRARY_PLAYLIST_NAME {
                continue;
            }

            let mut playlist = PlayList::new(parsed.name.clone());
            for entry in &parsed.entries {
                if let Some(song) = library.songs().iter().find(|s| s.id().to_string() == *entry) {
                    playlist.add_song(song.id().clone());
                }
            }

            match library.add_playlist(playlist) {
                Ok(()) => report.count += 1,
                Err(e) => report.record(e),
            }
        }

        info!(
            "Loaded {} playlists from {}",
            report.count,
            self.config.playlist_file.display()
        );
        report
    }

    /// Write every song as a record, dropping tombstones
    pub fn save(&self, library: &SongLibrary) -> CatalogReport {
        let mut report = CatalogReport::default();

        let mut contents = String::new();
        for song in library.songs() {
            contents.push_str(&MetadataRecord::from_song(song).to_line());
            contents.push('\n');
            report.count += 1;
        }

        if let Err(e) = write_atomic(&self.config.metadata_file, contents.as_bytes()) {
            report.count = 0;
            report.record(e);
        }
        report
    }

    pub fn save_playlists(&self, library: &SongLibrary) -> CatalogReport {
        let mut report = CatalogReport::default();

        let mut contents = String::new();
        for playlist in library.playlists() {
            contents.push_str(&record::playlist_to_line(playlist));
            contents.push('\n');
            report.count += 1;
        }

        if let Err(e) = write_atomic(&self.config.playlist_file, contents.as_bytes()) {
            report.count = 0;
            report.record(e);
        } else {
            debug!("Saved {} playlists", report.count);
        }
        report
    }

    /// Add a song to the library and append its record to the metadata file.
    ///
    /// Audio and cover files from outside the catalog directories are copied in, so the
    /// song comes back on the next load. Rejected (count 0) when another song already uses
    /// the same cover art file, when the identity is taken, when the audio file is missing,
    /// or when the record could not be read back.
    pub fn add_song(&self, library: &mut SongLibrary, song: Song) -> CatalogReport {
        let mut report = CatalogReport::default();
        let mut song = song;

        if let Ok(images) = list_files(&self.config.image_dir, is_image) {
            if let Some(image) = images.into_iter().find(|i| self.matcher.cover_matches(i, &song)) {
                song.set_cover(Some(image));
            }
        }

        if library.contains(song.id()) {
            info!("Rejected '{}': already in library", song.id());
            return report;
        }

        let Some(audio_target) = song.audio_path().file_name().map(|n| self.config.audio_dir.join(n)) else {
            report.record(unstorable(&song, "audio path has no file name"));
            return report;
        };
        let cover_target = song
            .cover()
            .and_then(|c| c.file_name())
            .map(|n| self.config.image_dir.join(n));

        if let Some(cover) = &cover_target {
            if library.songs().iter().any(|s| s.cover() == Some(cover.as_path())) {
                info!("Rejected '{}': cover {} already in use", song.id(), cover.display());
                return report;
            }
        }

        if !song.audio_path().is_file() {
            report.record(CatalogError::io(
                song.audio_path(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "audio file does not exist"),
            ));
            return report;
        }

        if !is_audio(song.audio_path()) {
            report.record(unstorable(&song, "unsupported audio format"));
            return report;
        }

        if let Some(reason) = MetadataRecord::from_song(&song).storage_problem() {
            report.record(unstorable(&song, &reason));
            return report;
        }

        // existing records are carried over byte for byte
        let mut contents = match fs::read(&self.config.metadata_file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                report.record(CatalogError::io(&self.config.metadata_file, e));
                return report;
            }
        };

        if let Err(e) = adopt_file(song.audio_path(), &audio_target) {
            report.record(e);
            return report;
        }
        let cover = match (song.cover(), cover_target) {
            (Some(source), Some(target)) => match adopt_file(source, &target) {
                Ok(()) => Some(target),
                Err(e) => {
                    // the song still stands without its art
                    report.record(e);
                    None
                }
            },
            _ => None,
        };

        let song = Song::new(song.name(), song.artist(), song.album(), audio_target)
            .with_cover(cover)
            .with_duration(song.duration());

        if !contents.is_empty() && !contents.ends_with(b"\n") {
            contents.push(b'\n');
        }
        contents.extend_from_slice(MetadataRecord::from_song(&song).to_line().as_bytes());
        contents.push(b'\n');
        if let Err(e) = write_atomic(&self.config.metadata_file, &contents) {
            report.record(e);
            return report;
        }

        let id = song.id().clone();
        library.insert_song(song);
        report.count = 1;
        info!("Added '{}' to library", id);

        report
    }

    /// Remove a song everywhere: disk files, library, playlists, metadata record.
    ///
    /// The in-memory removal stands even if deleting files or rewriting records fails.
    pub fn remove_song(&self, library: &mut SongLibrary, id: &SongId) -> CatalogReport {
        let mut report = CatalogReport::default();

        let in_playlist = library.playlists().iter().any(|p| p.contains(id));
        let Some(song) = library.remove_song(id) else {
            report.record(CatalogError::UnknownSong {
                name: id.name.clone(),
                artist: id.artist.clone(),
            });
            return report;
        };
        report.count = 1;

        if let Err(e) = fs::remove_file(song.audio_path()) {
            report.record(CatalogError::io(song.audio_path(), e));
        }

        if let Some(cover) = song.cover() {
            // the substring join can hand one image to several songs
            if library.songs().iter().any(|s| s.cover() == Some(cover)) {
                debug!("Keeping {}: still used by another song", cover.display());
            } else if let Err(e) = fs::remove_file(cover) {
                report.record(CatalogError::io(cover, e));
            }
        }

        if let Err(e) = self.tombstone(id) {
            report.record(e);
        }

        if in_playlist {
            let saved = self.save_playlists(library);
            report.errors.extend(saved.errors);
        }

        report
    }

    /// Blank out the record line(s) for this identity, keeping line numbers stable
    fn tombstone(&self, id: &SongId) -> Result<(), CatalogError> {
        let path = &self.config.metadata_file;
        let bytes = fs::read(path).map_err(|e| CatalogError::io(path, e))?;

        let mut contents = Vec::with_capacity(bytes.len());
        let mut blanked = 0;
        for (index, line) in split_lines(&bytes).enumerate() {
            let is_target = std::str::from_utf8(line)
                .ok()
                .and_then(|line| MetadataRecord::parse(line, index + 1).ok().flatten())
                .map_or(false, |record| record.is_for(&id.name, &id.artist));
            if is_target {
                blanked += 1;
            } else {
                contents.extend_from_slice(line);
            }
            contents.push(b'\n');
        }

        debug!("Tombstoned {} record(s) for '{}'", blanked, id);
        write_atomic(path, &contents)
    }

    fn song_from_record(&self, record: &MetadataRecord, audio_file: &Path) -> Song {
        let cover = Some(record.cover_ref.as_str())
            .filter(|r| !r.is_empty())
            .map(|r| self.config.image_dir.join(r))
            .filter(|p| p.is_file());

        Song::new(&record.name, &record.artist, &record.album, audio_file)
            .with_cover(cover)
            .with_duration(record.duration())
    }
}

/// Files directly inside `dir` that pass `keep`, sorted by name so matching is deterministic
fn list_files(dir: &Path, keep: fn(&Path) -> bool) -> Result<Vec<PathBuf>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
        ));
    }

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            // Skip hidden files (dotfiles)
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
        })
        .filter(|path| keep(path))
        .collect();

    Ok(files)
}

fn is_audio(path: &Path) -> bool {
    AudioFormat::from_path(path).is_supported()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Lines of a text file without decoding it, so one bad byte only spoils its own line
fn split_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let lines = if bytes.is_empty() {
        None
    } else {
        Some(body.split(|b| *b == b'\n'))
    };
    lines
        .into_iter()
        .flatten()
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Copy `source` to `target` unless it already is that file
fn adopt_file(source: &Path, target: &Path) -> Result<(), CatalogError> {
    if let (Ok(a), Ok(b)) = (fs::canonicalize(source), fs::canonicalize(target)) {
        if a == b {
            return Ok(());
        }
    }
    if target.exists() {
        return Err(CatalogError::io(
            target,
            std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "a different file with this name is already in the catalog",
            ),
        ));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }
    fs::copy(source, target).map_err(|e| CatalogError::io(target, e))?;
    debug!("Copied {} to {}", source.display(), target.display());
    Ok(())
}

fn unstorable(song: &Song, reason: &str) -> CatalogError {
    CatalogError::Unstorable {
        name: song.name().to_string(),
        artist: song.artist().to_string(),
        reason: reason.to_string(),
    }
}

/// Write to a sibling temp file, then rename over the target
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents).map_err(|e| CatalogError::io(&temp_path, e))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(CatalogError::io(path, e));
    }
    Ok(())
}
