use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::events::{MidiMessage, NoteEvent, RawMessage};

/// Converts a tick position to milliseconds at the given resolution (ticks
/// per quarter note) and tempo (beats per minute).
pub fn ticks_to_milliseconds(tick: u64, resolution: u32, tempo: f64) -> Result<u64> {
    if resolution == 0 || !tempo.is_finite() || tempo <= 0.0 {
        return Err(Error::InvalidTimingData { resolution, tempo });
    }

    let ticks_per_second = resolution as f64 * (tempo / 60.0);
    Ok((tick as f64 / ticks_per_second * 1000.0) as u64)
}

/// Note events ordered by `(timestamp, pitch)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: Vec<NoteEvent>,
}

impl Timeline {
    /// Sorts `events` into timeline order. Events sharing a timestamp and
    /// pitch keep their relative order.
    pub fn from_events(mut events: Vec<NoteEvent>) -> Self {
        events.sort_by_key(|e| (e.timestamp, e.pitch));
        Self { events }
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the last event.
    pub fn length_ms(&self) -> u64 {
        self.events.last().map_or(0, |e| e.timestamp)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a NoteEvent;
    type IntoIter = std::slice::Iter<'a, NoteEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Accumulates raw note messages into a [`Timeline`].
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    events: Vec<NoteEvent>,
    /// Indices of `On` events still waiting for their `Off`, oldest first.
    pending: HashMap<u8, VecDeque<usize>>,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_message(&mut self, msg: &RawMessage) -> Result<()> {
        let timestamp = ticks_to_milliseconds(msg.tick, msg.resolution, msg.tempo)?;

        match msg.message {
            MidiMessage::NoteOn { pitch, velocity } if velocity > 0 => {
                self.pending
                    .entry(pitch)
                    .or_default()
                    .push_back(self.events.len());
                self.events.push(NoteEvent::on(pitch, timestamp));
            }
            MidiMessage::NoteOn { pitch, .. } | MidiMessage::NoteOff { pitch } => {
                self.note_off(pitch, timestamp);
            }
        }

        Ok(())
    }

    fn note_off(&mut self, pitch: u8, timestamp: u64) {
        self.events.push(NoteEvent::off(pitch, timestamp));

        let Some(idx) = self.pending.get_mut(&pitch).and_then(|q| q.pop_front()) else {
            return;
        };
        let on = &mut self.events[idx];
        on.duration = timestamp.saturating_sub(on.timestamp);
    }

    pub fn build(self) -> Timeline {
        Timeline::from_events(self.events)
    }
}

/// Builds an ordered timeline from a raw message stream. Fails without a
/// partial result on the first message with unusable timing data.
pub fn build_timeline<'a, I>(messages: I) -> Result<Timeline>
where
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut builder = TimelineBuilder::new();
    for msg in messages {
        builder.on_message(msg)?;
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoteKind;

    const RES: u32 = 480;

    fn on(pitch: u8, tick: u64) -> RawMessage {
        RawMessage::note_on(pitch, 100, tick, RES, 120.0)
    }

    fn off(pitch: u8, tick: u64) -> RawMessage {
        RawMessage::note_off(pitch, tick, RES, 120.0)
    }

    #[test]
    fn converts_ticks_at_given_tempo() {
        // 480 ticks is one quarter note, half a second at 120 bpm
        assert_eq!(ticks_to_milliseconds(480, 480, 120.0).unwrap(), 500);
        assert_eq!(ticks_to_milliseconds(480, 480, 60.0).unwrap(), 1000);
        assert_eq!(ticks_to_milliseconds(0, 96, 200.0).unwrap(), 0);
        // truncated toward zero
        assert_eq!(ticks_to_milliseconds(1, 3, 60.0).unwrap(), 333);
    }

    #[test]
    fn rejects_non_positive_timing() {
        assert!(matches!(
            ticks_to_milliseconds(10, 0, 120.0),
            Err(Error::InvalidTimingData { resolution: 0, .. })
        ));
        assert!(ticks_to_milliseconds(10, 480, 0.0).is_err());
        assert!(ticks_to_milliseconds(10, 480, -5.0).is_err());
        assert!(ticks_to_milliseconds(10, 480, f64::NAN).is_err());
    }

    #[test]
    fn zero_resolution_yields_no_timeline() {
        let messages = vec![on(60, 0), RawMessage::note_off(60, 480, 0, 120.0)];
        assert!(matches!(
            build_timeline(&messages),
            Err(Error::InvalidTimingData { .. })
        ));
    }

    #[test]
    fn pairs_durations() {
        let messages = vec![on(60, 0), on(64, 480), off(64, 960), off(60, 1920)];
        let timeline = build_timeline(&messages).unwrap();
        let events = timeline.events();

        assert_eq!(events[0], NoteEvent { kind: NoteKind::On, pitch: 60, timestamp: 0, duration: 2000 });
        assert_eq!(events[1], NoteEvent { kind: NoteKind::On, pitch: 64, timestamp: 500, duration: 500 });
        assert_eq!(events[2].kind, NoteKind::Off);
        assert_eq!(events[3].kind, NoteKind::Off);
    }

    #[test]
    fn zero_velocity_on_is_an_off() {
        let messages = vec![on(60, 0), RawMessage::note_on(60, 0, 480, RES, 120.0)];
        let timeline = build_timeline(&messages).unwrap();

        assert_eq!(timeline.events()[0].duration, 500);
        assert_eq!(timeline.events()[1].kind, NoteKind::Off);
    }

    #[test]
    fn same_pitch_pairs_first_in_first_out() {
        let messages = vec![on(60, 0), on(60, 480), off(60, 960), off(60, 1440)];
        let timeline = build_timeline(&messages).unwrap();
        let ons: Vec<_> = timeline.iter().filter(|e| e.is_on()).collect();

        assert_eq!(ons[0].duration, 1000);
        assert_eq!(ons[1].duration, 1000);
    }

    #[test]
    fn unmatched_on_keeps_zero_duration() {
        let messages = vec![on(60, 0), on(62, 480), off(62, 960)];
        let timeline = build_timeline(&messages).unwrap();

        assert_eq!(timeline.events()[0].duration, 0);
        assert_eq!(timeline.events()[1].duration, 500);
    }

    #[test]
    fn stray_off_is_kept() {
        let timeline = build_timeline(&[off(70, 480)]).unwrap();
        assert_eq!(timeline.events(), &[NoteEvent::off(70, 500)]);
    }

    #[test]
    fn orders_by_timestamp_then_pitch() {
        let messages = vec![on(67, 480), on(64, 0), on(60, 480), on(72, 0)];
        let timeline = build_timeline(&messages).unwrap();
        let order: Vec<_> = timeline.iter().map(|e| (e.timestamp, e.pitch)).collect();

        assert_eq!(order, vec![(0, 64), (0, 72), (500, 60), (500, 67)]);
    }

    #[test]
    fn applies_each_events_own_tempo() {
        let messages = vec![
            RawMessage::note_on(60, 100, 480, RES, 120.0),
            RawMessage::note_on(62, 100, 960, RES, 60.0),
        ];
        let timeline = build_timeline(&messages).unwrap();

        assert_eq!(timeline.events()[0].timestamp, 500);
        assert_eq!(timeline.events()[1].timestamp, 2000);
    }
}
