//! Playlist player.
//!
//! The player thread owns the input backend, so nothing else can type while
//! a song is playing. Commands are applied between songs: a song that has
//! started always plays to the end.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::input::InputBackend;
use crate::timing::{Performer, PlaybackReport, Timeline};

#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub title: String,
    pub timeline: Timeline,
}

#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Replace the playlist. Playback starts from its first entry unless
    /// the player is paused.
    Play {
        performer: Arc<Performer>,
        entries: Vec<PlaylistEntry>,
    },
    Pause,
    Resume,
    Stop,
    /// Skip the upcoming entry.
    Next,
    /// Step back one entry.
    Prev,
    Quit,
}

#[derive(Debug, Clone)]
pub enum PlayerUpdate {
    Started { title: String },
    Finished { title: String, report: PlaybackReport },
    Paused,
    Stopped,
    /// The playlist ran out.
    Idle,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

pub struct PlayerHandle {
    pub command_tx: Sender<PlayerCommand>,
    pub update_rx: Receiver<PlayerUpdate>,
    state: Arc<Mutex<PlayerState>>,
    thread: std::thread::JoinHandle<()>,
}

impl PlayerHandle {
    pub fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    pub fn send(&self, command: PlayerCommand) {
        let _ = self.command_tx.send(command);
    }

    /// Asks the player to quit and waits for the current song to end.
    pub fn shutdown(self) {
        let _ = self.command_tx.send(PlayerCommand::Quit);
        if self.thread.join().is_err() {
            warn!("player thread panicked");
        }
    }
}

pub fn spawn_player<B>(backend: B) -> PlayerHandle
where
    B: InputBackend + Send + 'static,
{
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::unbounded();
    let state = Arc::new(Mutex::new(PlayerState::Idle));

    let thread_state = Arc::clone(&state);
    let thread = std::thread::spawn(move || {
        player_thread(backend, command_rx, update_tx, thread_state);
    });

    PlayerHandle {
        command_tx,
        update_rx,
        state,
        thread,
    }
}

struct Playlist {
    performer: Option<Arc<Performer>>,
    entries: Vec<PlaylistEntry>,
    /// Index of the next entry to play.
    cursor: usize,
    paused: bool,
    quit: bool,
}

impl Playlist {
    fn has_next(&self) -> bool {
        self.performer.is_some() && self.cursor < self.entries.len()
    }

    fn apply(&mut self, command: PlayerCommand, update_tx: &Sender<PlayerUpdate>) {
        match command {
            PlayerCommand::Play { performer, entries } => {
                self.performer = Some(performer);
                self.entries = entries;
                self.cursor = 0;
            }
            PlayerCommand::Pause => {
                self.paused = true;
                let _ = update_tx.send(PlayerUpdate::Paused);
            }
            PlayerCommand::Resume => self.paused = false,
            PlayerCommand::Stop => {
                self.entries.clear();
                self.cursor = 0;
                self.paused = false;
                let _ = update_tx.send(PlayerUpdate::Stopped);
            }
            PlayerCommand::Next => self.cursor = (self.cursor + 1).min(self.entries.len()),
            PlayerCommand::Prev => self.cursor = self.cursor.saturating_sub(1),
            PlayerCommand::Quit => self.quit = true,
        }
    }
}

fn player_thread<B: InputBackend>(
    backend: B,
    command_rx: Receiver<PlayerCommand>,
    update_tx: Sender<PlayerUpdate>,
    state: Arc<Mutex<PlayerState>>,
) {
    let mut playlist = Playlist {
        performer: None,
        entries: Vec::new(),
        cursor: 0,
        paused: false,
        quit: false,
    };
    let mut was_playing = false;

    loop {
        // everything queued up while the last song was playing
        loop {
            match command_rx.try_recv() {
                Ok(command) => playlist.apply(command, &update_tx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    playlist.quit = true;
                    break;
                }
            }
        }
        if playlist.quit {
            break;
        }

        if playlist.paused || !playlist.has_next() {
            *state.lock() = if playlist.paused && playlist.has_next() {
                PlayerState::Paused
            } else {
                PlayerState::Idle
            };
            if was_playing && !playlist.has_next() {
                let _ = update_tx.send(PlayerUpdate::Idle);
            }
            was_playing = false;

            match command_rx.recv() {
                Ok(command) => playlist.apply(command, &update_tx),
                Err(_) => break,
            }
            continue;
        }

        let entry = playlist.entries[playlist.cursor].clone();
        let Some(performer) = playlist.performer.clone() else {
            continue;
        };
        playlist.cursor += 1;
        *state.lock() = PlayerState::Playing;
        was_playing = true;

        info!(title = %entry.title, "starting");
        let _ = update_tx.send(PlayerUpdate::Started {
            title: entry.title.clone(),
        });
        match performer.play(&entry.timeline, &backend) {
            Ok(report) => {
                let _ = update_tx.send(PlayerUpdate::Finished {
                    title: entry.title,
                    report,
                });
            }
            Err(e) => {
                warn!(title = %entry.title, error = %e, "playback failed");
                let _ = update_tx.send(PlayerUpdate::Error {
                    message: format!("Failed to play '{}': {}", entry.title, e),
                });
            }
        }
    }

    *state.lock() = PlayerState::Idle;
}
