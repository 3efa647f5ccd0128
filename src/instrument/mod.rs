mod catalog;
mod model;
mod switch;

pub use catalog::{Catalog, InstrumentSpec, Preset};
pub use model::{Instrument, Keybar};
pub use switch::{KeybarSwitcher, PlaybackContext};
