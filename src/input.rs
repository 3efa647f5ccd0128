//! Simulated keyboard input.
//!
//! Playback never talks to the operating system directly: it acquires a
//! [`Keyboard`] from an [`InputBackend`] and sends it presses, releases and
//! sleeps in order. The backends here either log what would be typed in real
//! time or record it against a virtual clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// A virtual-key code as understood by the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            c @ (0x30..=0x39 | 0x41..=0x5A) => write!(f, "'{}'", c as u8 as char),
            c => write!(f, "0x{:02X}", c),
        }
    }
}

/// Physical keys bound to instrument slots, plus the two range-shift keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMap {
    pub slots: Vec<KeyCode>,
    pub shift_up: KeyCode,
    pub shift_down: KeyCode,
}

impl Default for KeyMap {
    fn default() -> Self {
        // number row: slots on 1-8, octave down on 9, octave up on 0
        Self {
            slots: (0x31..=0x38).map(KeyCode).collect(),
            shift_up: KeyCode(0x30),
            shift_down: KeyCode(0x39),
        }
    }
}

impl KeyMap {
    pub fn slot(&self, index: usize) -> Option<KeyCode> {
        self.slots.get(index).copied()
    }
}

/// The capability to simulate input. Implementations must carry out each
/// call synchronously and in order.
pub trait Keyboard {
    fn press(&mut self, key: KeyCode);
    fn release(&mut self, key: KeyCode);
    fn sleep(&mut self, ms: u64);

    fn tap(&mut self, key: KeyCode) {
        self.press(key);
        self.release(key);
    }
}

/// Hands out [`Keyboard`]s. Acquisition fails with
/// [`Error::NoInputControl`](crate::Error::NoInputControl) when the platform
/// refuses input simulation.
pub trait InputBackend {
    type Keyboard: Keyboard;

    fn acquire(&self) -> Result<Self::Keyboard>;
}

/// Logs every key action and sleeps for real.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

#[derive(Debug)]
pub struct LogKeyboard;

impl InputBackend for LogBackend {
    type Keyboard = LogKeyboard;

    fn acquire(&self) -> Result<LogKeyboard> {
        Ok(LogKeyboard)
    }
}

impl Keyboard for LogKeyboard {
    fn press(&mut self, key: KeyCode) {
        info!(%key, "key down");
    }

    fn release(&mut self, key: KeyCode) {
        info!(%key, "key up");
    }

    fn sleep(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Press(KeyCode),
    Release(KeyCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub at_ms: u64,
    pub action: Action,
}

impl fmt::Display for Recorded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::Press(key) => write!(f, "{:>8}ms  press   {}", self.at_ms, key),
            Action::Release(key) => write!(f, "{:>8}ms  release {}", self.at_ms, key),
        }
    }
}

#[derive(Debug, Default)]
struct Tape {
    clock_ms: u64,
    actions: Vec<Recorded>,
}

/// Records actions against a virtual clock that only moves when the
/// keyboard sleeps. Clones share the same tape.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    tape: Arc<Mutex<Tape>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<Recorded> {
        self.tape.lock().actions.clone()
    }

    /// Virtual time slept so far.
    pub fn elapsed_ms(&self) -> u64 {
        self.tape.lock().clock_ms
    }
}

#[derive(Debug)]
pub struct RecordingKeyboard {
    tape: Arc<Mutex<Tape>>,
}

impl RecordingKeyboard {
    fn record(&mut self, action: Action) {
        let mut tape = self.tape.lock();
        let at_ms = tape.clock_ms;
        tape.actions.push(Recorded { at_ms, action });
    }
}

impl InputBackend for RecordingBackend {
    type Keyboard = RecordingKeyboard;

    fn acquire(&self) -> Result<RecordingKeyboard> {
        Ok(RecordingKeyboard {
            tape: Arc::clone(&self.tape),
        })
    }
}

impl Keyboard for RecordingKeyboard {
    fn press(&mut self, key: KeyCode) {
        self.record(Action::Press(key));
    }

    fn release(&mut self, key: KeyCode) {
        self.record(Action::Release(key));
    }

    fn sleep(&mut self, ms: u64) {
        self.tape.lock().clock_ms += ms;
    }
}
