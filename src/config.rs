use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::input::KeyMap;
use crate::instrument::{Catalog, InstrumentSpec};
use crate::timing::{Performer, TimingConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub keymap: KeyMap,
    pub timing: TimingConfig,
    pub default_instrument: String,
    /// Added to the built-in presets.
    pub instruments: Vec<InstrumentSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keymap: KeyMap::default(),
            timing: TimingConfig::default(),
            default_instrument: "harp".to_string(),
            instruments: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Like [`Config::load`], but a missing file means the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.instruments.clone())
    }

    /// Looks up `name` (or the default instrument) and binds it to the
    /// configured keys and timing.
    pub fn performer(&self, name: Option<&str>) -> Result<Performer> {
        let name = name.unwrap_or(&self.default_instrument);
        let instrument = self.catalog().find(name)?;
        Performer::new(instrument, self.keymap.clone(), self.timing.clone())
    }
}
