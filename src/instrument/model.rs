use crate::error::{Error, Result};
use crate::timing::Timeline;

/// Pitches an instrument can sound without shifting its range. Slot `n` of
/// every keybar of an instrument sits on the same physical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keybar {
    pitches: Vec<u8>,
}

impl Keybar {
    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    pub fn contains(&self, pitch: u8) -> bool {
        self.slot(pitch).is_some()
    }

    pub fn slot(&self, pitch: u8) -> Option<usize> {
        self.pitches.iter().position(|&p| p == pitch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    name: String,
    can_hold: bool,
    keybars: Vec<Keybar>,
    idle_keybar: usize,
}

impl Instrument {
    pub fn new(
        name: impl Into<String>,
        can_hold: bool,
        keybars: Vec<Vec<u8>>,
        idle_keybar: usize,
    ) -> Result<Self> {
        let name = name.into();

        if keybars.is_empty() {
            return Err(Error::instrument(&name, "no keybars"));
        }
        for (i, pitches) in keybars.iter().enumerate() {
            if pitches.is_empty() {
                return Err(Error::instrument(&name, format!("keybar {} is empty", i)));
            }
            if let Some(&p) = pitches.iter().find(|&&p| p > 127) {
                return Err(Error::instrument(
                    &name,
                    format!("keybar {} has pitch {} outside 0-127", i, p),
                ));
            }
            if pitches.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::instrument(
                    &name,
                    format!("keybar {} is not strictly ascending", i),
                ));
            }
        }
        if idle_keybar >= keybars.len() {
            return Err(Error::instrument(
                &name,
                format!(
                    "idle keybar {} out of range ({} keybars)",
                    idle_keybar,
                    keybars.len()
                ),
            ));
        }

        Ok(Self {
            name,
            can_hold,
            keybars: keybars
                .into_iter()
                .map(|pitches| Keybar { pitches })
                .collect(),
            idle_keybar,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a pressed key keeps sounding until it is released.
    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn keybars(&self) -> &[Keybar] {
        &self.keybars
    }

    pub fn idle_keybar(&self) -> usize {
        self.idle_keybar
    }

    /// Number of physical slots needed to reach every pitch.
    pub fn slot_count(&self) -> usize {
        self.keybars.iter().map(Keybar::len).max().unwrap_or(0)
    }

    pub fn lowest_pitch(&self) -> u8 {
        self.keybars.iter().flat_map(|k| k.pitches()).copied().min().unwrap_or(0)
    }

    pub fn highest_pitch(&self) -> u8 {
        self.keybars.iter().flat_map(|k| k.pitches()).copied().max().unwrap_or(0)
    }

    pub fn has_pitch(&self, pitch: u8) -> bool {
        self.keybars.iter().any(|k| k.contains(pitch))
    }

    /// True if every event of `timeline` lands on some keybar.
    pub fn can_play(&self, timeline: &Timeline) -> bool {
        timeline.iter().all(|e| self.has_pitch(e.pitch))
    }

    /// Pitches of `timeline` this instrument cannot reach, ascending and
    /// deduplicated.
    pub fn unplayable_pitches(&self, timeline: &Timeline) -> Vec<u8> {
        let mut missing: Vec<u8> = timeline
            .iter()
            .map(|e| e.pitch)
            .filter(|&p| !self.has_pitch(p))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Keybar to play `pitch` on. Stays on `active` whenever it has the
    /// pitch, otherwise the first keybar in declared order that does.
    pub fn resolve_keybar(&self, pitch: u8, active: usize) -> Option<usize> {
        if self.keybars.get(active).is_some_and(|k| k.contains(pitch)) {
            return Some(active);
        }
        self.keybars.iter().position(|k| k.contains(pitch))
    }

    pub fn slot_index(&self, pitch: u8, keybar: usize) -> Option<usize> {
        self.keybars.get(keybar)?.slot(pitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoteEvent;

    fn two_bars() -> Instrument {
        Instrument::new("test", false, vec![vec![60, 62, 64], vec![64, 66, 68]], 0).unwrap()
    }

    #[test]
    fn rejects_broken_definitions() {
        let cases = vec![
            (vec![], 0),
            (vec![vec![60], vec![]], 0),
            (vec![vec![60, 62]], 1),
            (vec![vec![62, 60]], 0),
            (vec![vec![60, 200]], 0),
        ];
        for (keybars, idle) in cases {
            let res = Instrument::new("broken", false, keybars.clone(), idle);
            assert!(
                matches!(res, Err(Error::InvalidInstrumentConfig { .. })),
                "accepted {:?} idle {}",
                keybars,
                idle
            );
        }
    }

    #[test]
    fn prefers_active_keybar() {
        let inst = two_bars();
        // 64 sits on both keybars
        assert_eq!(inst.resolve_keybar(64, 0), Some(0));
        assert_eq!(inst.resolve_keybar(64, 1), Some(1));
        assert_eq!(inst.resolve_keybar(64, 1), inst.resolve_keybar(64, 1));
    }

    #[test]
    fn falls_back_to_declared_order() {
        let inst = two_bars();
        assert_eq!(inst.resolve_keybar(68, 0), Some(1));
        assert_eq!(inst.resolve_keybar(60, 1), Some(0));
        assert_eq!(inst.resolve_keybar(61, 0), None);
    }

    #[test]
    fn resolved_keybar_contains_pitch() {
        let inst = two_bars();
        for pitch in 0..=127u8 {
            for active in 0..2 {
                if let Some(k) = inst.resolve_keybar(pitch, active) {
                    assert!(inst.keybars()[k].contains(pitch));
                } else {
                    assert!(!inst.has_pitch(pitch));
                }
            }
        }
    }

    #[test]
    fn slot_positions() {
        let inst = two_bars();
        assert_eq!(inst.slot_index(64, 0), Some(2));
        assert_eq!(inst.slot_index(64, 1), Some(0));
        assert_eq!(inst.slot_index(68, 0), None);
        assert_eq!(inst.slot_index(60, 5), None);
        assert_eq!(inst.slot_count(), 3);
    }

    #[test]
    fn can_play_checks_every_event() {
        let inst = two_bars();
        let ok = Timeline::from_events(vec![NoteEvent::on(60, 0), NoteEvent::off(68, 10)]);
        let bad = Timeline::from_events(vec![NoteEvent::on(60, 0), NoteEvent::on(61, 10)]);

        assert!(inst.can_play(&ok));
        assert!(!inst.can_play(&bad));
        assert_eq!(inst.unplayable_pitches(&bad), vec![61]);
        assert!(inst.can_play(&Timeline::default()));
    }
}
