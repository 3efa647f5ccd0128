use tracing::debug;

/// Where a playback run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Resting on the idle keybar, before or after a run.
    #[default]
    Idle,
    /// Walking the timeline.
    Playing,
    /// Shifting back to the idle keybar.
    Returning,
}

impl Phase {
    pub fn next(self) -> Self {
        match self {
            Phase::Idle => Phase::Playing,
            Phase::Playing => Phase::Returning,
            Phase::Returning => Phase::Idle,
        }
    }
}

/// Tracks the phase of one run and logs its transitions.
#[derive(Debug, Default)]
pub struct PhaseTracker {
    phase: Phase,
    instrument: String,
}

impl PhaseTracker {
    pub fn new(instrument: &str) -> Self {
        Self {
            phase: Phase::Idle,
            instrument: instrument.to_string(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn advance(&mut self) -> Phase {
        let next = self.phase.next();
        debug!(instrument = %self.instrument, from = ?self.phase, to = ?next, "playback phase");
        self.phase = next;
        next
    }
}
