use std::fmt;

/// A note message as it comes out of a MIDI stream, still in musical time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMessage {
    pub message: MidiMessage,
    /// Absolute position in ticks.
    pub tick: u64,
    /// Ticks per quarter note.
    pub resolution: u32,
    /// Beats per minute in effect at `tick`.
    pub tempo: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

impl RawMessage {
    pub fn note_on(pitch: u8, velocity: u8, tick: u64, resolution: u32, tempo: f64) -> Self {
        Self {
            message: MidiMessage::NoteOn { pitch, velocity },
            tick,
            resolution,
            tempo,
        }
    }

    pub fn note_off(pitch: u8, tick: u64, resolution: u32, tempo: f64) -> Self {
        Self {
            message: MidiMessage::NoteOff { pitch },
            tick,
            resolution,
            tempo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    On,
    Off,
}

/// A note event placed on the absolute millisecond timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteKind,
    pub pitch: u8,
    /// Milliseconds from the start of the timeline.
    pub timestamp: u64,
    /// How long the note sounds. Only meaningful on `On` events, zero until
    /// the matching `Off` has been seen.
    pub duration: u64,
}

impl NoteEvent {
    pub fn on(pitch: u8, timestamp: u64) -> Self {
        Self {
            kind: NoteKind::On,
            pitch,
            timestamp,
            duration: 0,
        }
    }

    pub fn off(pitch: u8, timestamp: u64) -> Self {
        Self {
            kind: NoteKind::Off,
            pitch,
            timestamp,
            duration: 0,
        }
    }

    pub fn is_on(&self) -> bool {
        self.kind == NoteKind::On
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NoteKind::On => write!(f, "NOTE_ON {} @ {}ms", self.pitch, self.timestamp),
            NoteKind::Off => write!(f, "NOTE_OFF {} @ {}ms", self.pitch, self.timestamp),
        }
    }
}
