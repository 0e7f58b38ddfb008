// Test backend - counts live handles so tests can check the one-stream rule

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{AudioBackend, AudioHandle};
use crate::error::AudioError;

#[derive(Debug, Default)]
pub struct Tally {
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub opened: Mutex<Vec<PathBuf>>,
    pub ended: Mutex<Vec<PathBuf>>,
    pub paused: AtomicUsize,
    pub resumed: AtomicUsize,
}

impl Tally {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }

    /// Make every stream of this file report natural end
    pub fn end(&self, path: impl Into<PathBuf>) {
        self.ended.lock().unwrap().push(path.into());
    }
}

/// Opens anything except paths containing "broken"
#[derive(Debug, Default, Clone)]
pub struct MockBackend {
    pub tally: Arc<Tally>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for MockBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioHandle>, AudioError> {
        if path.to_string_lossy().contains("broken") {
            return Err(AudioError::Open {
                path: path.to_path_buf(),
                reason: "unsupported stream".to_string(),
            });
        }

        let live = self.tally.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.tally.max_live.fetch_max(live, Ordering::SeqCst);
        self.tally.opened.lock().unwrap().push(path.to_path_buf());

        Ok(Box::new(MockHandle {
            path: path.to_path_buf(),
            tally: Arc::clone(&self.tally),
        }))
    }
}

struct MockHandle {
    path: PathBuf,
    tally: Arc<Tally>,
}

impl AudioHandle for MockHandle {
    fn play(&mut self) {}

    fn pause(&mut self) {
        self.tally.paused.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.tally.resumed.fetch_add(1, Ordering::SeqCst);
    }

    fn stop(&mut self) {}

    fn is_finished(&self) -> bool {
        self.tally.ended.lock().unwrap().contains(&self.path)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.tally.live.fetch_sub(1, Ordering::SeqCst);
    }
}
