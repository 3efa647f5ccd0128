use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::{PhaseTracker, Timeline};
use crate::error::{Error, Result};
use crate::events::NoteKind;
use crate::input::{InputBackend, KeyCode, KeyMap, Keyboard};
use crate::instrument::{Instrument, KeybarSwitcher, PlaybackContext};

/// What to do once keybar changes have pushed playback behind the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LagPolicy {
    /// Keep every remaining gap as written; the delay is never recovered.
    #[default]
    Drift,
    /// Shorten later gaps until the time lost has been made up.
    CatchUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after a keybar change before a key press registers.
    pub settle_delay_ms: u64,
    /// Minimum time between two keybar changes.
    pub switch_cooldown_ms: u64,
    pub lag_policy: LagPolicy,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50,
            switch_cooldown_ms: 150,
            lag_policy: LagPolicy::Drift,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub notes_played: usize,
    pub notes_skipped: usize,
    pub keybar_switches: usize,
    pub lag_ms: i64,
}

impl fmt::Display for PlaybackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} notes played, {} skipped, {} keybar changes, {}ms lag",
            self.notes_played, self.notes_skipped, self.keybar_switches, self.lag_ms
        )
    }
}

/// An instrument bound to the keys that play it.
#[derive(Debug, Clone)]
pub struct Performer {
    instrument: Instrument,
    keymap: KeyMap,
    timing: TimingConfig,
}

impl Performer {
    pub fn new(instrument: Instrument, keymap: KeyMap, timing: TimingConfig) -> Result<Self> {
        if keymap.slots.len() < instrument.slot_count() {
            return Err(Error::instrument(
                instrument.name(),
                format!(
                    "needs {} slot keys, key map has {}",
                    instrument.slot_count(),
                    keymap.slots.len()
                ),
            ));
        }
        if keymap.shift_up == keymap.shift_down {
            return Err(Error::instrument(
                instrument.name(),
                "shift up and shift down share a key",
            ));
        }

        Ok(Self {
            instrument,
            keymap,
            timing,
        })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Acquires a keyboard from `backend` and plays `timeline` on it. Fails
    /// before touching any key if input control is denied.
    pub fn play<B: InputBackend>(&self, timeline: &Timeline, backend: &B) -> Result<PlaybackReport> {
        let mut keyboard = backend.acquire()?;

        info!(
            instrument = self.instrument.name(),
            events = timeline.len(),
            length_ms = timeline.length_ms(),
            "playing"
        );
        let report = self.perform(timeline, &mut keyboard);
        info!(instrument = self.instrument.name(), %report, "finished");

        Ok(report)
    }

    /// Plays `timeline` on an already acquired keyboard.
    pub fn perform<K: Keyboard>(&self, timeline: &Timeline, keyboard: &mut K) -> PlaybackReport {
        let instrument = &self.instrument;
        let switcher = KeybarSwitcher::new(&self.keymap, &self.timing);
        let mut ctx = PlaybackContext::idle(instrument, &self.timing);
        let mut phases = PhaseTracker::new(instrument.name());
        let mut report = PlaybackReport::default();

        // keys pressed for notes still sounding, in press order
        let mut held: Vec<(u8, KeyCode)> = Vec::new();
        let mut behind_ms = 0;

        phases.advance();

        let events = timeline.events();
        for (i, event) in events.iter().enumerate() {
            let timestamp = event.timestamp as i64;
            let mut delay = events
                .get(i + 1)
                .map_or(0, |next| next.timestamp as i64 - timestamp);

            match instrument.resolve_keybar(event.pitch, ctx.active_keybar) {
                None => {
                    debug!(%event, "skipping unplayable note");
                    if event.is_on() {
                        report.notes_skipped += 1;
                    }
                }
                Some(keybar) => match event.kind {
                    NoteKind::On => {
                        // once gaps get shortened, cooldowns have to be measured
                        // on the time actually played rather than the score
                        let switch_at = match self.timing.lag_policy {
                            LagPolicy::Drift => timestamp,
                            LagPolicy::CatchUp => timestamp + behind_ms,
                        };
                        delay -= switcher.change_keybar(&mut ctx, keyboard, keybar, switch_at);

                        if let Some(key) = self.key_for(event.pitch, ctx.active_keybar) {
                            keyboard.press(key);
                            trace!(%event, %key, "press");
                            if instrument.can_hold() {
                                held.push((event.pitch, key));
                            } else {
                                keyboard.release(key);
                                trace!(%event, %key, "release");
                            }
                            report.notes_played += 1;
                        }
                    }
                    NoteKind::Off if instrument.can_hold() => {
                        let key = held
                            .iter()
                            .position(|&(pitch, _)| pitch == event.pitch)
                            .map(|i| held.remove(i).1)
                            .or_else(|| self.key_for(event.pitch, ctx.active_keybar));
                        if let Some(key) = key {
                            keyboard.release(key);
                            trace!(%event, %key, "release");
                        }
                    }
                    NoteKind::Off => {}
                },
            }

            let delay = self.pace(delay, &mut behind_ms);
            if delay > 0 {
                keyboard.sleep(delay as u64);
            }
        }

        // notes that never got an off
        for (_, key) in held {
            keyboard.release(key);
            trace!(%key, "release");
        }

        phases.advance();
        let last_switch = ctx.last_switch_ms;
        switcher.change_keybar(&mut ctx, keyboard, instrument.idle_keybar(), last_switch);
        phases.advance();

        report.keybar_switches = ctx.switches;
        report.lag_ms = ctx.lag_ms;
        report
    }

    fn key_for(&self, pitch: u8, keybar: usize) -> Option<KeyCode> {
        self.keymap.slot(self.instrument.slot_index(pitch, keybar)?)
    }

    /// Applies the lag policy to the gap before the next event.
    fn pace(&self, delay: i64, behind_ms: &mut i64) -> i64 {
        match self.timing.lag_policy {
            LagPolicy::Drift => delay,
            LagPolicy::CatchUp => {
                let adjusted = delay - *behind_ms;
                *behind_ms = (-adjusted).max(0);
                adjusted
            }
        }
    }
}
