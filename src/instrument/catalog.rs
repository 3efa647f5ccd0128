use serde::{Deserialize, Serialize};

use super::Instrument;
use crate::error::{Error, Result};

/// Instruments that ship with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// Tuned in C major, C3 to C6.
    Harp,
    /// Magnanimous Choir Bell, C5 to C7.
    MagBell,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Harp, Preset::MagBell];

    pub fn spec(self) -> InstrumentSpec {
        match self {
            Preset::Harp => InstrumentSpec {
                name: "Harp".to_string(),
                can_hold: false,
                keybars: vec![
                    vec![48, 50, 52, 53, 55, 57, 59, 60],
                    vec![60, 62, 64, 65, 67, 69, 71, 72],
                    vec![72, 74, 76, 77, 79, 81, 83, 84],
                ],
                idle_keybar: 1,
            },
            Preset::MagBell => InstrumentSpec {
                name: "Magnanimous Choir Bell".to_string(),
                can_hold: false,
                keybars: vec![
                    vec![72, 74, 76, 77, 79, 81, 83, 84],
                    vec![84, 86, 88, 89, 91, 93, 95, 96],
                ],
                idle_keybar: 0,
            },
        }
    }

    /// Short names accepted on the command line.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Preset::Harp => &["harp"],
            Preset::MagBell => &["magbell", "bell", "choir bell"],
        }
    }
}

/// Serializable instrument definition, validated when turned into an
/// [`Instrument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub name: String,
    #[serde(default)]
    pub can_hold: bool,
    pub keybars: Vec<Vec<u8>>,
    #[serde(default)]
    pub idle_keybar: usize,
}

impl InstrumentSpec {
    pub fn build(&self) -> Result<Instrument> {
        Instrument::new(
            self.name.clone(),
            self.can_hold,
            self.keybars.clone(),
            self.idle_keybar,
        )
    }
}

/// Built-in presets followed by user-defined instruments. Names match
/// case-insensitively; a user entry never shadows a preset.
#[derive(Debug, Clone)]
pub struct Catalog {
    custom: Vec<InstrumentSpec>,
}

impl Catalog {
    pub fn new(custom: Vec<InstrumentSpec>) -> Self {
        Self { custom }
    }

    pub fn specs(&self) -> Vec<InstrumentSpec> {
        Preset::ALL
            .iter()
            .map(|p| p.spec())
            .chain(self.custom.iter().cloned())
            .collect()
    }

    pub fn find(&self, name: &str) -> Result<Instrument> {
        let wanted = name.trim().to_lowercase();

        for preset in Preset::ALL {
            let spec = preset.spec();
            if spec.name.to_lowercase() == wanted || preset.aliases().contains(&wanted.as_str()) {
                return spec.build();
            }
        }

        self.custom
            .iter()
            .find(|spec| spec.name.to_lowercase() == wanted)
            .ok_or_else(|| Error::UnknownInstrument(name.to_string()))?
            .build()
    }
}
