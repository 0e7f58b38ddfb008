// songshelf - command line front end
// Loads the catalog, runs one command, and for playback commands stays up until the music stops

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use songshelf::audio::{AudioConfig, RodioBackend};
use songshelf::{CatalogStore, Config, Controller, PlaybackSession, PlaybackState, SongId};

#[derive(Parser)]
#[command(name = "songshelf")]
#[command(about = "Local music shelf: catalog, playlists and playback")]
struct Args {
    /// Use this config file instead of the per-user one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every song in the catalog
    List,
    /// List playlists with their song counts
    Playlists,
    /// Play one song
    Play { title: String, artist: String },
    /// Play a playlist from the top
    PlayPlaylist {
        name: String,
        #[arg(long)]
        shuffle: bool,
    },
    /// Play the whole library
    PlayLibrary {
        #[arg(long)]
        shuffle: bool,
    },
    /// Delete a song from the catalog and from disk
    Remove { title: String, artist: String },
}

fn init_logging(log_dir: &Path, dev: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(log_dir, "songshelf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let base_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,songshelf=debug"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    // dev mode mirrors everything to stderr as well
    let stderr_layer = dev.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(base_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if dev {
        eprintln!("🔧 Dev mode: Debug output enabled to stderr + file");
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // An explicit config must exist; the default one is created on first run
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let _guard = init_logging(&config.logging.log_dir, args.dev)?;
    info!("🎵 songshelf starting up");

    let backend = RodioBackend::new(AudioConfig::from(&config.playback))?;
    let session = PlaybackSession::new(Box::new(backend), &config.playback);
    let (mut controller, report) = Controller::open(CatalogStore::new(config.library.clone()), session);
    if !report.is_clean() {
        println!("⚠️  {} catalog problem(s), see the log for details", report.errors.len());
    }

    match args.command {
        Command::List => {
            for song in controller.library().songs() {
                println!(
                    "{} - {} ({}) [{}]",
                    song.name(),
                    song.artist(),
                    song.album(),
                    song.duration_string()
                );
            }
        }
        Command::Playlists => {
            for playlist in controller.library().playlists() {
                println!("{} ({} songs)", playlist.name(), playlist.len());
            }
        }
        Command::Play { title, artist } => {
            controller.change_song(&SongId::new(title, artist)).await?;
            run_until_stopped(&mut controller).await;
        }
        Command::PlayPlaylist { name, shuffle } => {
            controller.play_playlist(&name, shuffle, None).await?;
            run_until_stopped(&mut controller).await;
        }
        Command::PlayLibrary { shuffle } => {
            controller.play_library(shuffle, None).await?;
            run_until_stopped(&mut controller).await;
        }
        Command::Remove { title, artist } => {
            let report = controller.remove_song(&SongId::new(title, artist)).await;
            if report.count > 0 {
                println!("🗑️  Removed");
            }
            for problem in &report.errors {
                println!("⚠️  {}", problem);
            }
        }
    }

    info!("songshelf shutting down");
    Ok(())
}

/// Follow the session from song to song until it stops or Ctrl-C
async fn run_until_stopped(controller: &mut Controller) {
    print_now_playing(controller);

    while controller.state() != PlaybackState::Stopped {
        let next = tokio::select! {
            event = controller.next_task_event() => event,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(event) = next else {
            debug!("Interrupted, stopping playback");
            controller.stop().await;
            break;
        };

        match controller.handle_task_event(event).await {
            Ok(true) => print_now_playing(controller),
            Ok(false) => {}
            Err(e) => {
                error!("Playback failed: {}", e);
                println!("❌ {}", e);
            }
        }
    }
}

fn print_now_playing(controller: &Controller) {
    if let Some(song) = controller.current_song() {
        println!("▶️  {} - {}", song.name(), song.artist());
    }
}
