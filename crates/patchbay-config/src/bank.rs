//! Circuit preset banks.

use std::collections::BTreeMap;
use std::path::Path;

use patchbay_core::{Preset, Synthesizer, UnitId};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_presets;

/// One named preset as stored in TOML.
///
/// Values are keyed by circuit port alias and applied in alias order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PresetEntry {
    /// Display name.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Alias → value.
    #[serde(default)]
    pub values: BTreeMap<String, f32>,
}

impl PresetEntry {
    /// Empty preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds or replaces a value.
    pub fn with(mut self, alias: impl Into<String>, value: f32) -> Self {
        self.values.insert(alias.into(), value);
        self
    }
}

impl From<&PresetEntry> for Preset {
    fn from(entry: &PresetEntry) -> Self {
        entry
            .values
            .iter()
            .fold(Preset::new(entry.name.clone()), |p, (alias, &value)| {
                p.with(alias.clone(), value)
            })
    }
}

/// An ordered list of presets for one circuit.
///
/// # TOML Format
///
/// ```toml
/// [[presets]]
/// name = "Dark"
/// [presets.values]
/// cutoff = 400
/// resonance = 0.2
///
/// [[presets]]
/// name = "Bright"
/// description = "Open filter"
/// [presets.values]
/// cutoff = 8000
/// ```
///
/// Other top-level tables (such as `[engine]`) are ignored, so a bank can
/// share a file with the engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PresetBank {
    /// Presets in file order.
    #[serde(default)]
    pub presets: Vec<PresetEntry>,
}

impl PresetBank {
    /// Empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a preset.
    pub fn with_preset(mut self, preset: PresetEntry) -> Self {
        self.presets.push(preset);
        self
    }

    /// Parses and validates a bank.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let bank: PresetBank = toml::from_str(toml_str)?;
        validate_presets(&bank.presets)?;
        Ok(bank)
    }

    /// Loads and validates a bank from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let bank = Self::from_toml(&content)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), count = bank.presets.len(), "preset_bank_load");
        Ok(bank)
    }

    /// Serializes the bank.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the bank to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// True when the bank holds no presets.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Finds a preset by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&PresetEntry> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Position of a preset by name, ignoring ASCII case.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.presets
            .iter()
            .position(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Converts every entry to an engine preset.
    pub fn to_presets(&self) -> Vec<Preset> {
        self.presets.iter().map(Preset::from).collect()
    }

    /// Registers every preset with `circuit`, in bank order, and returns
    /// how many were added. Select one afterwards with
    /// [`Synthesizer::use_preset`].
    pub fn install(&self, synth: &mut Synthesizer, circuit: UnitId) -> Result<usize, ConfigError> {
        for preset in self.to_presets() {
            synth.add_preset(circuit, preset)?;
        }
        Ok(self.presets.len())
    }
}
