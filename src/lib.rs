//! Plays MIDI scores on in-game instruments by simulating key presses.
//!
//! A score is turned into a [`Timeline`] of absolute-millisecond note events,
//! then a [`Performer`] walks it in real time: it picks the keybar (octave)
//! each note lives on, shifts the instrument there while respecting the
//! game's cooldown between shifts, and presses the matching slot key.

pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod instrument;
pub mod midi;
pub mod player;
pub mod timing;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{MidiMessage, NoteEvent, NoteKind, RawMessage};
pub use input::{InputBackend, KeyCode, KeyMap, Keyboard, LogBackend, RecordingBackend};
pub use instrument::{Catalog, Instrument, InstrumentSpec, Keybar, Preset};
pub use player::{PlayerCommand, PlayerHandle, PlayerState, PlayerUpdate, PlaylistEntry, spawn_player};
pub use timing::{
    LagPolicy, Performer, PlaybackReport, Timeline, TimelineBuilder, TimingConfig, build_timeline,
};
