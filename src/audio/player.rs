use super::{AudioBackend, AudioConfig, AudioHandle};
use crate::error::AudioError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Output-device backed implementation of [`AudioBackend`].
///
/// Holds the output stream for the life of the process; every `open` creates a fresh sink on it.
pub struct RodioBackend {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    config: AudioConfig,
}

impl RodioBackend {
    pub fn new(config: AudioConfig) -> Result<Self, AudioError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            config,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn AudioHandle>, AudioError> {
        let open_error = |reason: String| AudioError::Open {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| open_error(format!("failed to open file: {}", e)))?;

        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            open_error(format!("unsupported audio format or corrupted file: {}", e))
        })?;

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| AudioError::Device(e.to_string()))?;
        sink.set_volume(self.config.volume);
        // queued paused; the playback task decides when sound starts
        sink.pause();
        sink.append(source);

        debug!("Opened stream for {}", path.display());
        Ok(Box::new(RodioHandle { sink }))
    }
}

pub struct RodioHandle {
    sink: Sink,
}

impl AudioHandle for RodioHandle {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}
