//! Integration tests for patchbay-config.
//!
//! These load files from disk and apply them to a running synthesizer.

use patchbay_config::{ConfigError, PatchFile, PresetBank, PresetEntry, load_config};
use patchbay_core::{PortLayout, PortRange, SynthConfig, Synthesizer, UnitGenerator, UnitIo};
use tempfile::TempDir;

/// Output = Level.
struct Level;

impl UnitGenerator for Level {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Level", PortRange::SIGNAL)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let level = io.inputs.values(0);
        io.outputs.values_mut(0)[start..limit].copy_from_slice(&level[start..limit]);
    }
}

const PATCH: &str = r#"
[engine]
sample_rate = 44100
block_size = 32

[[presets]]
name = "Soft"
[presets.values]
level = 0.25

[[presets]]
name = "Loud"
[presets.values]
level = 0.75
"#;

#[test]
fn load_patch_and_apply_presets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patch.toml");
    std::fs::write(&path, PATCH).unwrap();

    let file = PatchFile::load(&path).unwrap();
    assert_eq!(load_config(&path).unwrap(), file.engine);
    assert_eq!(file.engine.sample_rate, 44100.0);

    let mut synth = Synthesizer::new(file.engine);
    let voice = synth.add_circuit("voice");
    let level = synth.add(Level);
    synth.add_to_circuit(voice, level).unwrap();
    synth.export(voice, level, "").unwrap();

    let bank = file.bank();
    assert_eq!(bank.install(&mut synth, voice).unwrap(), 2);
    assert_eq!(synth.preset_count(voice).unwrap(), 2);

    let level_in = synth.port(voice, "level").unwrap();
    synth.use_preset(voice, bank.index_of("loud").unwrap() as i64).unwrap();
    assert_eq!(synth.get(level_in).unwrap(), 0.75);
    synth.use_preset(voice, -2).unwrap();
    assert_eq!(synth.get(level_in).unwrap(), 0.25);

    synth.start_unit(voice).unwrap();
    synth.start();
    synth.render_block();
    let out = synth.port(voice, "output").unwrap();
    assert_eq!(synth.values(out, 0).unwrap(), &[0.25; 32]);
}

#[test]
fn bank_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bank.toml");
    let bank = PresetBank::new()
        .with_preset(PresetEntry::new("Init").with("cutoff", 1000.0).with("q", 0.7))
        .with_preset(PresetEntry::new("Sweep").with_description("wide").with("cutoff", 200.0));
    bank.save(&path).unwrap();
    assert_eq!(PresetBank::load(&path).unwrap(), bank);
}

#[test]
fn patch_file_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("patch.toml");
    let file = PatchFile {
        engine: SynthConfig::with_sample_rate(96000.0).block_size(256),
        presets: vec![PresetEntry::new("A").with("gain", 0.5)],
    };
    file.save(&path).unwrap();
    assert_eq!(PatchFile::load(&path).unwrap(), file);
}

#[test]
fn missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    match PatchFile::load(&path) {
        Err(ConfigError::ReadFile { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[test]
fn invalid_engine_is_rejected_with_message() {
    let err = PatchFile::from_toml("[engine]\nsample_rate = 1000\noutput_channels = 64\n")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("sample_rate"), "{message}");
    assert!(message.contains("output_channels"), "{message}");
}
