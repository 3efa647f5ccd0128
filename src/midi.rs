//! Standard MIDI File input.
//!
//! All tracks are merged on absolute ticks, tempo meta events are tracked as
//! they go by, and note messages come out as [`RawMessage`]s carrying the
//! tempo in effect. Everything else in the file is ignored.

use std::path::Path;

use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::RawMessage;
use crate::timing::{Timeline, build_timeline};

/// 500,000 µs per quarter note.
pub const DEFAULT_TEMPO: f64 = 120.0;

pub fn load(path: &Path) -> Result<Vec<RawMessage>> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &bytes)
}

pub fn load_timeline(path: &Path) -> Result<Timeline> {
    build_timeline(&load(path)?)
}

/// Decodes an in-memory file. `path` is only used for error reporting.
pub fn parse(path: &Path, bytes: &[u8]) -> Result<Vec<RawMessage>> {
    let smf = Smf::parse(bytes).map_err(|source| Error::Midi {
        path: path.to_path_buf(),
        source,
    })?;
    messages(&smf)
}

pub fn messages(smf: &Smf<'_>) -> Result<Vec<RawMessage>> {
    let resolution = match smf.header.timing {
        Timing::Metrical(ppq) => ppq.as_int() as u32,
        Timing::Timecode(fps, sub) => {
            return Err(Error::UnsupportedTiming(format!(
                "SMPTE {} fps, {} ticks per frame",
                fps.as_f32(),
                sub
            )));
        }
    };

    let mut merged = Vec::new();
    for track in &smf.tracks {
        let mut tick = 0u64;
        for event in track {
            tick += event.delta.as_int() as u64;
            merged.push((tick, event.kind));
        }
    }
    // stable, so simultaneous events keep track order
    merged.sort_by_key(|(tick, _)| *tick);

    let mut tempo = DEFAULT_TEMPO;
    let mut out = Vec::new();
    for (tick, kind) in merged {
        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                tempo = 60_000_000.0 / us_per_quarter.as_int() as f64;
                debug!(tick, tempo, "tempo change");
            }
            TrackEventKind::Midi { message, .. } => match message {
                midly::MidiMessage::NoteOn { key, vel } => out.push(RawMessage::note_on(
                    key.as_int(),
                    vel.as_int(),
                    tick,
                    resolution,
                    tempo,
                )),
                midly::MidiMessage::NoteOff { key, .. } => {
                    out.push(RawMessage::note_off(key.as_int(), tick, resolution, tempo))
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(out)
}
