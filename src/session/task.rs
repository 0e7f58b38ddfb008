// Background playback task - owns exactly one audio handle from spawn until it is stopped
// The control side never touches the handle; it talks to the task over a channel

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::audio::AudioHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskCommand {
    Pause,
    Resume,
}

/// Reported by a task back to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// The stream ran out on its own. `generation` identifies which start produced it.
    Finished { generation: u64 },
}

pub struct PlaybackTask {
    generation: u64,
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<TaskCommand>,
    join: JoinHandle<()>,
}

impl PlaybackTask {
    pub fn spawn(
        handle: Box<dyn AudioHandle>,
        generation: u64,
        poll_interval: Duration,
        events: mpsc::UnboundedSender<TaskEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let join = tokio::spawn(run(
            handle,
            generation,
            poll_interval,
            cancel.clone(),
            command_rx,
            events,
        ));

        debug!("Spawned playback task #{}", generation);
        Self {
            generation,
            cancel,
            commands,
            join,
        }
    }

    pub fn pause(&self) {
        self.send(TaskCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(TaskCommand::Resume);
    }

    fn send(&self, command: TaskCommand) {
        // a task that already ended has nothing left to pause
        if self.commands.send(command).is_err() {
            debug!("Playback task #{} already ended, dropped {:?}", self.generation, command);
        }
    }

    /// Cancel and wait until the task has released its handle
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            warn!("Playback task #{} did not exit cleanly: {}", self.generation, e);
        }
        debug!("Stopped playback task #{}", self.generation);
    }
}

async fn run(
    mut handle: Box<dyn AudioHandle>,
    generation: u64,
    poll_interval: Duration,
    cancel: CancellationToken,
    mut commands: mpsc::UnboundedReceiver<TaskCommand>,
    events: mpsc::UnboundedSender<TaskEvent>,
) {
    handle.play();
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            // cancellation always wins over anything else that is ready
            biased;

            _ = cancel.cancelled() => break,

            Some(command) = commands.recv() => match command {
                TaskCommand::Pause => handle.pause(),
                TaskCommand::Resume => handle.resume(),
            },

            _ = ticker.tick() => {
                if handle.is_finished() {
                    debug!("Playback task #{} reached end of stream", generation);
                    let _ = events.send(TaskEvent::Finished { generation });
                    break;
                }
            }
        }
    }

    handle.stop();
    drop(handle);
}
