//! Configuration and preset banks for the patchbay synthesis engine.
//!
//! # Features
//!
//! - **Patch files**: [`SynthConfig`](patchbay_core::SynthConfig) plus a
//!   preset bank in one TOML file ([`PatchFile`])
//! - **Preset banks**: named alias/value sets installed on a circuit
//!   ([`PresetBank`])
//! - **Validation**: strict range checks with every problem reported
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::PatchFile;
//! use patchbay_core::Synthesizer;
//!
//! let file = PatchFile::from_toml(r#"
//!     [engine]
//!     sample_rate = 44100
//!     block_size = 128
//!
//!     [[presets]]
//!     name = "Quiet"
//!     [presets.values]
//!     level = 0.1
//! "#)?;
//!
//! let mut synth = Synthesizer::new(file.engine);
//! let voice = synth.add_circuit("voice");
//! assert_eq!(file.bank().install(&mut synth, voice)?, 1);
//! # Ok::<(), patchbay_config::ConfigError>(())
//! ```

mod bank;
mod engine;
mod error;

/// Engine and preset validation.
pub mod validation;

pub use bank::{PresetBank, PresetEntry};
pub use engine::{PatchFile, config_from_toml, load_config};
pub use error::ConfigError;
pub use validation::{ValidationError, validate_config, validate_presets};
