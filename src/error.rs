use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid timing data: resolution {resolution}, tempo {tempo} bpm")]
    InvalidTimingData { resolution: u32, tempo: f64 },

    #[error("Invalid instrument config for '{instrument}': {reason}")]
    InvalidInstrumentConfig { instrument: String, reason: String },

    #[error("No input control: {0}")]
    NoInputControl(String),

    #[error("Unknown instrument '{0}'")]
    UnknownInstrument(String),

    #[error("Failed to decode MIDI file '{}': {source}", path.display())]
    Midi {
        path: PathBuf,
        #[source]
        source: midly::Error,
    },

    #[error("Unsupported MIDI timing: {0}")]
    UnsupportedTiming(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] ron::Error),

    #[error("Invalid command: {0}")]
    Command(String),
}

impl Error {
    pub(crate) fn instrument(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidInstrumentConfig {
            instrument: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
