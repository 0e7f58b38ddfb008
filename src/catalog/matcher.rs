// File association strategies for the catalog join
// The default is the loose "contains" join; an exact one is here for catalogs that carry real file names

use std::path::Path;

use super::record::MetadataRecord;
use crate::library::Song;

/// Decides which files on disk belong to which catalog entries
pub trait FileMatcher: Send + Sync {
    /// Does this metadata record describe this audio file?
    fn audio_matches(&self, record: &MetadataRecord, audio_file: &Path) -> bool;

    /// Is this image the cover art for this song?
    fn cover_matches(&self, image_file: &Path, song: &Song) -> bool;
}

/// Substring join: a record owns an audio file when the raw record line contains the
/// file name, and an image is a cover when its file name contains the song name.
///
/// Known weakness: when one song name is a substring of another ("Hero" / "A Real Hero")
/// the shorter name also claims the longer one's image.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringMatcher;

impl FileMatcher for SubstringMatcher {
    fn audio_matches(&self, record: &MetadataRecord, audio_file: &Path) -> bool {
        match file_name(audio_file) {
            Some(name) => record.raw.contains(name),
            None => false,
        }
    }

    fn cover_matches(&self, image_file: &Path, song: &Song) -> bool {
        match file_name(image_file) {
            Some(name) => !song.name().is_empty() && name.contains(song.name()),
            None => false,
        }
    }
}

/// Field-exact join: audio reference equals the file name, image stem equals the song name
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatcher;

impl FileMatcher for ExactMatcher {
    fn audio_matches(&self, record: &MetadataRecord, audio_file: &Path) -> bool {
        file_name(audio_file) == Some(record.audio_ref.as_str())
    }

    fn cover_matches(&self, image_file: &Path, song: &Song) -> bool {
        image_file.file_stem().and_then(|s| s.to_str()) == Some(song.name())
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(line: &str) -> MetadataRecord {
        MetadataRecord::parse(line, 1).unwrap().unwrap()
    }

    #[test]
    fn test_substring_audio_join() {
        let rec = record("Nightcall, Kavinsky, Drive, cover1.jpg, nightcall.wav");
        let matcher = SubstringMatcher;
        assert!(matcher.audio_matches(&rec, &PathBuf::from("Audios/nightcall.wav")));
        assert!(!matcher.audio_matches(&rec, &PathBuf::from("Audios/hero.wav")));
        // loose on purpose
        assert!(matcher.audio_matches(&rec, &PathBuf::from("Audios/call.wav")));
    }

    #[test]
    fn test_substring_cover_join_overlaps() {
        let hero = Song::new("Hero", "Someone", "", "hero.wav");
        let real_hero = Song::new("A Real Hero", "College", "", "real.wav");
        let image = PathBuf::from("images/A Real Hero.jpg");

        let matcher = SubstringMatcher;
        assert!(matcher.cover_matches(&image, &real_hero));
        assert!(matcher.cover_matches(&image, &hero));
    }

    #[test]
    fn test_exact_matcher() {
        let rec = record("Nightcall, Kavinsky, Drive, cover1.jpg, nightcall.wav");
        let matcher = ExactMatcher;
        assert!(matcher.audio_matches(&rec, &PathBuf::from("Audios/nightcall.wav")));
        assert!(!matcher.audio_matches(&rec, &PathBuf::from("Audios/call.wav")));

        let hero = Song::new("Hero", "Someone", "", "hero.wav");
        assert!(!matcher.cover_matches(&PathBuf::from("images/A Real Hero.jpg"), &hero));
        assert!(matcher.cover_matches(&PathBuf::from("images/Hero.png"), &hero));
    }
}
