//! Integration tests for patchbay-cli.
//!
//! These run the `patchbay` binary end to end.

use std::process::Command;

use tempfile::TempDir;

fn patchbay_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_patchbay"))
}

// ---------------------------------------------------------------------------
// `patchbay patches`
// ---------------------------------------------------------------------------

#[test]
fn cli_patches_lists_all_patches() {
    let output = patchbay_bin()
        .arg("patches")
        .output()
        .expect("failed to run patchbay patches");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available Patches"));
    for patch in ["tone", "pluck", "sweep", "chord", "grains", "spectral"] {
        assert!(stdout.contains(patch), "listing should contain '{patch}'");
    }
}

// ---------------------------------------------------------------------------
// `patchbay render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_writes_stereo_wav() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tone.wav");

    let output = patchbay_bin()
        .args(["render", "tone"])
        .arg(&path)
        .args(["--duration", "0.1", "--sample-rate", "48000", "--freq", "440", "--waveform", "sine"])
        .output()
        .expect("failed to run patchbay render");
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.bits_per_sample, 32);

    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 4800 * 2);
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.45 && peak <= 0.5001, "peak {peak}");
    for frame in samples.chunks(2) {
        assert_eq!(frame[0], frame[1]);
    }
}

#[test]
fn cli_render_applies_preset_from_patch_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("patch.toml");
    std::fs::write(
        &config,
        r#"
[engine]
sample_rate = 22050
block_size = 128

[[presets]]
name = "Quiet"
[presets.values]
"osc.Amplitude" = 0.0
"#,
    )
    .unwrap();
    let path = dir.path().join("quiet.wav");

    let output = patchbay_bin()
        .args(["render", "tone"])
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .args(["--preset", "quiet", "--duration", "0.05", "--bits", "16"])
        .output()
        .expect("failed to run patchbay render");
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert!(reader.samples::<i16>().all(|s| s.unwrap() == 0));
}

#[test]
fn cli_render_rejects_unknown_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.wav");
    let output = patchbay_bin()
        .args(["render", "tone"])
        .arg(&path)
        .args(["--set", "nope.Frequency=1", "--duration", "0.01"])
        .output()
        .expect("failed to run patchbay render");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.Frequency"));
}

#[test]
fn cli_info_shows_exported_ports() {
    let output = patchbay_bin()
        .args(["info", "pluck"])
        .output()
        .expect("failed to run patchbay info");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("env.Attack"), "{stdout}");
    assert!(stdout.contains("osc.Frequency"), "{stdout}");
}
