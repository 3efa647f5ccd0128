mod scheduler;
mod state_machine;
mod timeline;

pub use scheduler::{LagPolicy, Performer, PlaybackReport, TimingConfig};
pub use state_machine::{Phase, PhaseTracker};
pub use timeline::{Timeline, TimelineBuilder, build_timeline, ticks_to_milliseconds};
