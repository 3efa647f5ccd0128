use tracing::trace;

use super::Instrument;
use crate::input::{KeyMap, Keyboard};
use crate::timing::TimingConfig;

/// Mutable state of one playback run. Created fresh for every `play`, so an
/// instrument definition can be shared by any number of runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackContext {
    pub active_keybar: usize,
    /// Timeline time at which the previous keybar change was issued.
    pub last_switch_ms: i64,
    /// Milliseconds spent waiting out cooldowns the score did not leave room
    /// for.
    pub lag_ms: i64,
    /// Single-step keybar changes issued so far.
    pub switches: usize,
}

impl PlaybackContext {
    /// Resting on the idle keybar, with the cooldown already elapsed.
    pub fn idle(instrument: &Instrument, timing: &TimingConfig) -> Self {
        Self {
            active_keybar: instrument.idle_keybar(),
            last_switch_ms: -(timing.switch_cooldown_ms as i64),
            lag_ms: 0,
            switches: 0,
        }
    }
}

/// Moves an instrument between keybars one step at a time, keeping shift
/// presses at least a cooldown apart.
#[derive(Debug, Clone, Copy)]
pub struct KeybarSwitcher<'a> {
    keymap: &'a KeyMap,
    timing: &'a TimingConfig,
}

impl<'a> KeybarSwitcher<'a> {
    pub fn new(keymap: &'a KeyMap, timing: &'a TimingConfig) -> Self {
        Self { keymap, timing }
    }

    /// Shifts `ctx` to `target`, returning the milliseconds spent sleeping.
    /// `event_ms` is the timeline time of the note that needs the change.
    pub fn change_keybar<K: Keyboard>(
        &self,
        ctx: &mut PlaybackContext,
        keyboard: &mut K,
        target: usize,
        event_ms: i64,
    ) -> i64 {
        let settle = self.timing.settle_delay_ms as i64;
        let cooldown = self.timing.switch_cooldown_ms as i64;

        let delta = target as i64 - ctx.active_keybar as i64;
        let (key, direction) = if delta > 0 {
            (self.keymap.shift_up, "up")
        } else {
            (self.keymap.shift_down, "down")
        };

        let mut consumed = 0;
        for _ in 0..delta.unsigned_abs() {
            let mut since = event_ms - ctx.last_switch_ms;
            // already behind the schedule, only the settle delay has passed
            if since <= 0 {
                since = settle;
            }

            let mut wait = 0;
            if since < cooldown {
                wait = cooldown - since;
                ctx.lag_ms += wait + since;
            }

            if wait > 0 {
                keyboard.sleep(wait as u64);
            }
            keyboard.tap(key);
            trace!(direction, wait, "keybar change");

            ctx.last_switch_ms += since + wait;
            ctx.switches += 1;

            keyboard.sleep(settle as u64);
            consumed += wait + settle;
        }

        ctx.active_keybar = target;
        consumed
    }
}
