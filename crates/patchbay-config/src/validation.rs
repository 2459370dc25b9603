//! Range checks for engine configurations and preset banks.
//!
//! [`Synthesizer::new`](patchbay_core::Synthesizer::new) silently clamps
//! nonsense values so it can never fail; files coming from users are held to
//! the stricter limits here and rejected with every problem listed.
//!
//! ```rust
//! use patchbay_config::{ValidationError, validate_config};
//! use patchbay_core::SynthConfig;
//!
//! assert!(validate_config(&SynthConfig::default()).is_ok());
//!
//! let err = validate_config(&SynthConfig::with_sample_rate(1000.0)).unwrap_err();
//! assert!(matches!(err, ValidationError::OutOfRange { field: "sample_rate", .. }));
//! ```

use patchbay_core::SynthConfig;
use thiserror::Error;

use crate::bank::PresetEntry;

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: f64 = 8_000.0;
/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;
/// Largest accepted block size in frames.
pub const MAX_BLOCK_SIZE: usize = 4096;
/// Largest accepted output channel count.
pub const MAX_OUTPUT_CHANNELS: usize = 32;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field outside its accepted range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name as written in TOML.
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// A queue capacity of zero.
    #[error("'{0}' must be greater than zero")]
    ZeroCapacity(&'static str),

    /// Preset without a name.
    #[error("preset #{0} has an empty name")]
    EmptyPresetName(usize),

    /// Two presets with the same name (compared case-insensitively).
    #[error("duplicate preset name '{0}'")]
    DuplicatePreset(String),

    /// Preset value that is NaN or infinite.
    #[error("preset '{preset}': value for '{alias}' is not finite")]
    NonFiniteValue {
        /// Preset name.
        preset: String,
        /// Alias the value is for.
        alias: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn collect(mut errors: Vec<ValidationError>) -> Result<(), ValidationError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

/// Checks every field of `config` against the accepted ranges.
pub fn validate_config(config: &SynthConfig) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    let rate = f64::from(config.sample_rate);
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        errors.push(ValidationError::OutOfRange {
            field: "sample_rate",
            value: rate,
            min: MIN_SAMPLE_RATE,
            max: MAX_SAMPLE_RATE,
        });
    }
    let counts = [
        ("block_size", config.block_size, MAX_BLOCK_SIZE),
        ("output_channels", config.output_channels, MAX_OUTPUT_CHANNELS),
    ];
    for (field, value, max) in counts {
        if !(1..=max).contains(&value) {
            errors.push(ValidationError::OutOfRange {
                field,
                value: value as f64,
                min: 1.0,
                max: max as f64,
            });
        }
    }
    let capacities = [
        ("command_capacity", config.command_capacity),
        ("event_capacity", config.event_capacity),
        ("queue_capacity", config.queue_capacity),
    ];
    for (field, value) in capacities {
        if value == 0 {
            errors.push(ValidationError::ZeroCapacity(field));
        }
    }

    ValidationError::collect(errors)
}

/// Checks names and values of a preset bank.
pub fn validate_presets(presets: &[PresetEntry]) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    for (i, preset) in presets.iter().enumerate() {
        if preset.name.trim().is_empty() {
            errors.push(ValidationError::EmptyPresetName(i));
        } else if presets[..i]
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&preset.name))
        {
            errors.push(ValidationError::DuplicatePreset(preset.name.clone()));
        }
        for (alias, value) in &preset.values {
            if !value.is_finite() {
                errors.push(ValidationError::NonFiniteValue {
                    preset: preset.name.clone(),
                    alias: alias.clone(),
                });
            }
        }
    }
    ValidationError::collect(errors)
}
