use autobard::input::{Action, Recorded};
use autobard::{
    Error, Instrument, KeyCode, KeyMap, LagPolicy, NoteEvent, Performer, Preset, RawMessage,
    RecordingBackend, Timeline, TimingConfig, build_timeline,
};

const UP: KeyCode = KeyCode(0x30);
const DOWN: KeyCode = KeyCode(0x39);

fn slot(n: u16) -> KeyCode {
    KeyCode(0x31 + n)
}

fn two_bar_performer() -> Performer {
    let instrument =
        Instrument::new("two bars", false, vec![vec![60, 62, 64], vec![64, 66, 68]], 0).unwrap();
    Performer::new(instrument, KeyMap::default(), TimingConfig::default()).unwrap()
}

fn at(at_ms: u64, action: Action) -> Recorded {
    Recorded { at_ms, action }
}

fn shift_times(actions: &[Recorded]) -> Vec<u64> {
    actions
        .iter()
        .filter(|r| matches!(r.action, Action::Press(k) if k == UP || k == DOWN))
        .map(|r| r.at_ms)
        .collect()
}

#[test]
fn shared_pitch_needs_no_keybar_change() {
    let timeline = Timeline::from_events(vec![
        NoteEvent::on(60, 0),
        NoteEvent::on(64, 500),
        NoteEvent::off(64, 800),
        NoteEvent::off(60, 1000),
    ]);
    let backend = RecordingBackend::new();
    let report = two_bar_performer().play(&timeline, &backend).unwrap();

    assert_eq!(
        backend.actions(),
        vec![
            at(0, Action::Press(slot(0))),
            at(0, Action::Release(slot(0))),
            at(500, Action::Press(slot(2))),
            at(500, Action::Release(slot(2))),
        ]
    );
    assert_eq!(report.keybar_switches, 0);
    assert_eq!(backend.elapsed_ms(), 1000);
}

#[test]
fn out_of_bar_note_shifts_up_first() {
    let timeline = Timeline::from_events(vec![NoteEvent::on(68, 0)]);
    let backend = RecordingBackend::new();
    let report = two_bar_performer().play(&timeline, &backend).unwrap();

    assert_eq!(
        backend.actions(),
        vec![
            at(0, Action::Press(UP)),
            at(0, Action::Release(UP)),
            // pressed once the settle delay has passed
            at(50, Action::Press(slot(2))),
            at(50, Action::Release(slot(2))),
            // back to idle, after the cooldown
            at(150, Action::Press(DOWN)),
            at(150, Action::Release(DOWN)),
        ]
    );
    assert_eq!(report.notes_played, 1);
    assert_eq!(report.keybar_switches, 2);
}

#[test]
fn out_of_range_score_is_not_playable() {
    let c_major = |octave: u8| -> Vec<u8> {
        [0, 2, 4, 5, 7, 9, 11, 12].iter().map(|i| octave * 12 + i).collect()
    };
    let instrument = Instrument::new("wide", false, (4..8).map(c_major).collect(), 1).unwrap();
    assert_eq!(instrument.lowest_pitch(), 48);
    assert_eq!(instrument.highest_pitch(), 96);

    let playable = build_timeline(&[RawMessage::note_on(72, 90, 0, 480, 120.0)]).unwrap();
    let too_high = build_timeline(&[
        RawMessage::note_on(72, 90, 0, 480, 120.0),
        RawMessage::note_on(100, 90, 480, 480, 120.0),
    ])
    .unwrap();

    assert!(instrument.can_play(&playable));
    assert!(!instrument.can_play(&too_high));
}

#[test]
fn zero_resolution_is_rejected() {
    let messages = [
        RawMessage::note_on(60, 90, 0, 480, 120.0),
        RawMessage::note_on(62, 90, 480, 0, 120.0),
    ];
    assert!(matches!(
        build_timeline(&messages),
        Err(Error::InvalidTimingData { resolution: 0, .. })
    ));
}

#[test]
fn shifts_stay_a_cooldown_apart() {
    // every note sits two keybars away from the previous one
    let timeline = Timeline::from_events(vec![
        NoteEvent::on(48, 0),
        NoteEvent::on(84, 10),
        NoteEvent::on(48, 20),
        NoteEvent::on(84, 30),
    ]);

    for lag_policy in [LagPolicy::Drift, LagPolicy::CatchUp] {
        let harp = Preset::Harp.spec().build().unwrap();
        let timing = TimingConfig {
            lag_policy,
            ..TimingConfig::default()
        };
        let performer = Performer::new(harp, KeyMap::default(), timing).unwrap();
        let backend = RecordingBackend::new();
        let report = performer.play(&timeline, &backend).unwrap();

        let shifts = shift_times(&backend.actions());
        assert_eq!(shifts.len(), 8);
        assert_eq!(report.keybar_switches, 8);
        for pair in shifts.windows(2) {
            assert!(pair[1] - pair[0] >= 150, "{:?}: shifts at {:?}", lag_policy, shifts);
        }
    }
}

#[test]
fn playback_state_does_not_leak_between_runs() {
    let performer = two_bar_performer();
    let timeline = Timeline::from_events(vec![NoteEvent::on(68, 0)]);

    let first = RecordingBackend::new();
    let second = RecordingBackend::new();
    performer.play(&timeline, &first).unwrap();
    performer.play(&timeline, &second).unwrap();

    assert_eq!(first.actions(), second.actions());
}
