//! Engine configuration files.

use std::path::Path;

use patchbay_core::SynthConfig;
use serde::{Deserialize, Serialize};

use crate::bank::{PresetBank, PresetEntry};
use crate::error::ConfigError;
use crate::validation::{validate_config, validate_presets};

/// A patch file: engine settings plus an optional preset bank.
///
/// # TOML Format
///
/// ```toml
/// [engine]
/// sample_rate = 44100
/// block_size = 128
/// output_channels = 2
/// command_capacity = 4096
/// event_capacity = 256
/// queue_capacity = 16
///
/// [[presets]]
/// name = "Init"
/// [presets.values]
/// cutoff = 1000
/// ```
///
/// Every `[engine]` key is optional and defaults to the
/// [`SynthConfig::default`] value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatchFile {
    /// Engine settings.
    #[serde(default)]
    pub engine: SynthConfig,

    /// Presets for the patch's top-level circuit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<PresetEntry>,
}

impl PatchFile {
    /// Parses and validates a patch file.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let file: PatchFile = toml::from_str(toml_str)?;
        file.validate()?;
        Ok(file)
    }

    /// Loads and validates a patch file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let file = Self::from_toml(&content).inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(path = %path.display(), error = %_e, "patch_file_rejected");
        })?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            path = %path.display(),
            sample_rate = file.engine.sample_rate,
            block_size = file.engine.block_size,
            presets = file.presets.len(),
            "patch_file_load"
        );
        Ok(file)
    }

    /// The presets as a bank.
    pub fn bank(&self) -> PresetBank {
        PresetBank {
            presets: self.presets.clone(),
        }
    }

    /// Writes the file as TOML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Checks engine ranges and presets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(&self.engine)?;
        validate_presets(&self.presets)?;
        Ok(())
    }
}

/// Reads just the engine settings of a patch file.
pub fn load_config(path: impl AsRef<Path>) -> Result<SynthConfig, ConfigError> {
    PatchFile::load(path).map(|f| f.engine)
}

/// Parses just the engine settings of a patch file.
pub fn config_from_toml(toml_str: &str) -> Result<SynthConfig, ConfigError> {
    PatchFile::from_toml(toml_str).map(|f| f.engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn missing_keys_take_defaults() {
        let config = config_from_toml("[engine]\nsample_rate = 44100\n").unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.block_size, SynthConfig::default().block_size);
        assert_eq!(config_from_toml("").unwrap(), SynthConfig::default());
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = config_from_toml("[engine]\nblock_size = 8192\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation(ValidationError::OutOfRange {
                field: "block_size",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = config_from_toml("[engine\nsample_rate = ").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn engine_and_presets_share_a_file() {
        let file = PatchFile::from_toml(
            "[engine]\nblock_size = 32\n\n[[presets]]\nname = \"Init\"\n[presets.values]\nlevel = 0.5\n",
        )
        .unwrap();
        assert_eq!(file.engine.block_size, 32);
        assert_eq!(file.bank().len(), 1);
        assert_eq!(file.presets[0].values["level"], 0.5);
    }
}
