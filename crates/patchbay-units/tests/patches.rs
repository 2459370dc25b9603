//! Small patches exercising units through a running synthesizer.

use std::sync::Arc;

use patchbay_core::{
    EngineEvent, FloatSample, LoopRange, PortKind, SegmentedEnvelope, SynthConfig, Synthesizer,
};
use patchbay_units::{
    BiquadFilter, EnvelopeDahdsr, EnvelopePlayer, GrainFarm, LineOut, Mixer, Oscillator,
    SampleReader, SpectralFft, SpectralIfft, WhiteNoise,
};

fn synth(sample_rate: f32, block: usize) -> Synthesizer {
    let mut s = Synthesizer::new(SynthConfig::with_sample_rate(sample_rate).block_size(block));
    s.start();
    s
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Adds a sine with the given frequency and amplitude, routed to part 0 of
/// `out`.
fn sine_into(s: &mut Synthesizer, frequency: f32, amplitude: f32, out: patchbay_core::UnitId) {
    let osc = s.add(Oscillator::sine());
    s.set(s.port(osc, "Frequency").unwrap(), frequency).unwrap();
    s.set(s.port(osc, "Amplitude").unwrap(), amplitude).unwrap();
    let osc_out = s.port(osc, "Output").unwrap();
    let line_in = s.port(out, "Input").unwrap();
    s.connect_parts(osc_out, 0, line_in, 0).unwrap();
}

fn render_left(s: &mut Synthesizer, blocks: usize) -> Vec<f32> {
    let mut left = Vec::new();
    for _ in 0..blocks {
        left.extend_from_slice(s.render_block().channel(0));
    }
    left
}

#[test]
fn two_sines_mix_linearly() {
    let render = |voices: &[(f32, f32)]| {
        let mut s = synth(48000.0, 64);
        let out = s.add(LineOut::new());
        for &(frequency, amplitude) in voices {
            sine_into(&mut s, frequency, amplitude, out);
        }
        s.start_unit(out).unwrap();
        render_left(&mut s, 20)
    };

    let a = render(&[(440.0, 0.3)]);
    let b = render(&[(660.0, 0.4)]);
    let both = render(&[(440.0, 0.3), (660.0, 0.4)]);
    for ((x, y), z) in a.iter().zip(&b).zip(&both) {
        assert!((x + y - z).abs() < 1e-6);
    }
    assert!(both.iter().any(|v| v.abs() > 0.5));
}

#[test]
fn envelope_peaks_then_disables_its_voice() {
    let mut s = synth(44100.0, 64);
    let voice = s.add(Oscillator::sine());
    let env = s.add(EnvelopeDahdsr::new());
    let gate = s.port(env, "Input").unwrap();
    s.set(s.port(env, "Attack").unwrap(), 0.01).unwrap();
    s.set(s.port(env, "Decay").unwrap(), 0.2).unwrap();
    s.set(s.port(env, "Sustain").unwrap(), 0.0).unwrap();
    s.set(gate, 1.0).unwrap();
    s.set_auto_disable(gate, Some(voice)).unwrap();
    s.start_unit(env).unwrap();
    s.start_unit(voice).unwrap();
    let events = s.events();
    let env_out = s.port(env, "Output").unwrap();

    let mut levels = Vec::new();
    let mut finished = None;
    for _ in 0..200 {
        s.render_block();
        levels.extend_from_slice(s.values(env_out, 0).unwrap());
        if let Ok(event) = events.try_recv() {
            finished = Some(event);
            break;
        }
    }

    let peak = levels.iter().position(|&v| v == 1.0).unwrap();
    assert!(peak.abs_diff(440) <= 1, "peak at {peak}");
    assert_eq!(
        finished,
        Some(EngineEvent::UnitFinished {
            unit: env,
            disabled: Some(voice),
            frame: 9280,
        })
    );
    assert!(!s.is_enabled(voice).unwrap());

    let voice_out = s.port(voice, "Output").unwrap();
    s.render_block();
    let held = s.values(voice_out, 0).unwrap();
    assert!(held.iter().all(|&v| v == held[0]));
}

#[test]
fn lowpass_attenuates_noise() {
    let mut s = synth(48000.0, 64);
    let noise = s.add(WhiteNoise::new(11));
    let filter = s.add(BiquadFilter::lowpass());
    s.set(s.port(noise, "Amplitude").unwrap(), 1.0).unwrap();
    s.set(s.port(filter, "Frequency").unwrap(), 200.0).unwrap();
    s.connect(
        s.port(noise, "Output").unwrap(),
        s.port(filter, "Input").unwrap(),
    )
    .unwrap();
    s.start_unit(filter).unwrap();

    let (noise_out, filter_out) = (
        s.port(noise, "Output").unwrap(),
        s.port(filter, "Output").unwrap(),
    );
    let mut dry = Vec::new();
    let mut wet = Vec::new();
    for _ in 0..100 {
        s.render_block();
        dry.extend_from_slice(s.values(noise_out, 0).unwrap());
        wet.extend_from_slice(s.values(filter_out, 0).unwrap());
    }
    assert!(rms(&wet) < rms(&dry) * 0.3, "{} vs {}", rms(&wet), rms(&dry));
}

#[test]
fn mixer_applies_gains() {
    let mut s = synth(48000.0, 8);
    let mix = s.add(Mixer::new(2));
    let input = s.port(mix, "Input").unwrap();
    let gain = s.port(mix, "Gain").unwrap();
    s.set_part(input, 0, 0.5).unwrap();
    s.set_part(input, 1, -0.25).unwrap();
    s.set_part(gain, 1, 2.0).unwrap();
    s.set(s.port(mix, "Amplitude").unwrap(), 0.5).unwrap();
    s.start_unit(mix).unwrap();
    s.render_block();
    assert_eq!(s.values(s.port(mix, "Output").unwrap(), 0).unwrap(), &[0.0; 8]);

    s.set_part(gain, 1, 1.0).unwrap();
    s.render_block();
    assert_eq!(
        s.values(s.port(mix, "Output").unwrap(), 0).unwrap(),
        &[0.125; 8]
    );
}

#[test]
fn sample_reader_holds_last_frame_when_starved() {
    let mut s = synth(48000.0, 8);
    let reader = s.add(SampleReader::mono());
    let data = s.port(reader, "Data").unwrap();
    let out = s.port(reader, "Output").unwrap();
    let sample = Arc::new(FloatSample::mono(vec![0.1, 0.2, 0.3], 24000.0));
    s.queue(data, sample, 0, 3).unwrap();
    s.start_unit(reader).unwrap();
    let events = s.events();

    s.render_block();
    assert_eq!(
        s.values(out, 0).unwrap(),
        &[0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.3, 0.3]
    );
    assert_eq!(
        events.try_recv().ok(),
        Some(EngineEvent::QueueStarved {
            port: data,
            frame: 8
        })
    );
    s.render_block();
    assert_eq!(s.values(out, 0).unwrap(), &[0.3; 8]);
    assert!(events.try_recv().is_err());
}

#[test]
fn envelope_player_sustains_until_released() {
    let sample_rate = 48000.0;
    let mut s = synth(sample_rate, 8);
    let player = s.add(EnvelopePlayer::new());
    let data = s.port(player, "Data").unwrap();
    let out = s.port(player, "Output").unwrap();
    let step = 4.0 / sample_rate;
    let envelope: Arc<SegmentedEnvelope> = Arc::new(
        SegmentedEnvelope::new(vec![(step, 1.0), (step, 1.0), (step, 0.0)])
            .with_sustain_loop(LoopRange::new(1, 2)),
    );
    s.queue_on(data, envelope.clone(), None).unwrap();
    s.start_unit(player).unwrap();

    s.render_block();
    assert_eq!(
        s.values(out, 0).unwrap(),
        &[0.25, 0.5, 0.75, 1.0, 1.0, 1.0, 1.0, 1.0]
    );
    s.render_block();
    assert_eq!(s.values(out, 0).unwrap(), &[1.0; 8]);

    s.queue_off(data, envelope, None).unwrap();
    s.render_block();
    assert_eq!(
        s.values(out, 0).unwrap(),
        &[0.75, 0.5, 0.25, 0.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn fft_ifft_reproduces_dc() {
    let mut s = synth(48000.0, 16);
    let fft = s.add(SpectralFft::new(16));
    let ifft = s.add(SpectralIfft::new(16));
    let spectrum_out = s.port(fft, "Spectrum").unwrap();
    let spectrum_in = s.port(ifft, "Spectrum").unwrap();
    assert_eq!(spectrum_out.kind(), PortKind::SpectralOutput);
    s.connect(spectrum_out, spectrum_in).unwrap();
    s.set(s.port(fft, "Input").unwrap(), 0.5).unwrap();
    s.start_unit(ifft).unwrap();

    let out = s.port(ifft, "Output").unwrap();
    for _ in 0..3 {
        s.render_block();
    }
    for &v in s.values(out, 0).unwrap() {
        assert!((v - 0.5).abs() < 1e-5, "{v}");
    }
}

#[test]
fn spectral_sizes_must_match() {
    let mut s = synth(48000.0, 16);
    let fft = s.add(SpectralFft::new(16));
    let ifft = s.add(SpectralIfft::new(32));
    let result = s.connect(
        s.port(fft, "Spectrum").unwrap(),
        s.port(ifft, "Spectrum").unwrap(),
    );
    assert!(result.is_err());
}

#[test]
fn grain_farm_stays_within_single_grain_bound() {
    let mut s = synth(48000.0, 64);
    let farm = s.add(GrainFarm::new().with_seed(1234));
    s.set(s.port(farm, "Amplitude").unwrap(), 1.0).unwrap();
    s.set(s.port(farm, "Density").unwrap(), 0.8).unwrap();
    s.set(s.port(farm, "AmplitudeRange").unwrap(), 0.5).unwrap();
    s.set(s.port(farm, "RateRange").unwrap(), 0.3).unwrap();
    s.start_unit(farm).unwrap();

    let out = s.port(farm, "Output").unwrap();
    let mut samples = Vec::new();
    for _ in 0..1500 {
        s.render_block();
        samples.extend_from_slice(s.values(out, 0).unwrap());
    }
    assert!(samples.iter().all(|v| v.abs() <= 1.0));
    let level = rms(&samples);
    assert!(level > 1e-3, "{level}");
    assert!(level <= core::f32::consts::FRAC_1_SQRT_2, "{level}");
}
