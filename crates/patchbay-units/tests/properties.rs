//! Property-based tests for stateful units.

use patchbay_core::{SynthConfig, Synthesizer, UnitId};
use patchbay_units::{BiquadFilter, EnvelopeDahdsr, FilterFourPoles, Response, WhiteNoise};
use proptest::prelude::*;

const BLOCK: usize = 64;

fn synth() -> Synthesizer {
    let mut s = Synthesizer::new(SynthConfig::with_sample_rate(48000.0).block_size(BLOCK));
    s.start();
    s
}

fn output(s: &mut Synthesizer, unit: UnitId, blocks: usize) -> Vec<f32> {
    let out = s.port(unit, "Output").unwrap();
    let mut samples = Vec::with_capacity(blocks * BLOCK);
    for _ in 0..blocks {
        s.render_block();
        samples.extend_from_slice(s.values(out, 0).unwrap());
    }
    samples
}

fn noise_into(s: &mut Synthesizer, filter: UnitId, seed: u32) {
    let noise = s.add(WhiteNoise::new(seed));
    s.set(s.port(noise, "Amplitude").unwrap(), 1.0).unwrap();
    s.connect(s.port(noise, "Output").unwrap(), s.port(filter, "Input").unwrap())
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Past its peak the envelope never rises, and it stays in [0, 1].
    #[test]
    fn envelope_never_rises_after_peak(
        attack in 0.0f32..0.01,
        decay in 0.0f32..0.05,
        sustain in 0.0f32..1.0,
        release in 0.0f32..0.02,
        release_at in 1u64..2500,
    ) {
        let mut s = synth();
        let env = s.add(EnvelopeDahdsr::new());
        s.set(s.port(env, "Attack").unwrap(), attack).unwrap();
        s.set(s.port(env, "Decay").unwrap(), decay).unwrap();
        s.set(s.port(env, "Sustain").unwrap(), sustain).unwrap();
        s.set(s.port(env, "Release").unwrap(), release).unwrap();
        let gate = s.port(env, "Input").unwrap();
        s.set(gate, 1.0).unwrap();
        s.set_at(gate, 0.0, release_at).unwrap();
        s.start_unit(env).unwrap();

        let samples = output(&mut s, env, 80);
        prop_assert!(samples.iter().all(|v| (0.0..=1.0).contains(v)));
        let peak = samples
            .iter()
            .enumerate()
            .fold(0, |best, (i, &v)| if v > samples[best] { i } else { best });
        for pair in samples[peak..].windows(2) {
            prop_assert!(pair[1] <= pair[0], "rose from {} to {}", pair[0], pair[1]);
        }
        prop_assert_eq!(*samples.last().unwrap(), 0.0);
    }

    /// Any in-range biquad setting stays stable on white noise.
    #[test]
    fn biquad_stays_finite(
        response in prop::sample::select(vec![
            Response::LowPass,
            Response::HighPass,
            Response::BandPass,
            Response::Notch,
            Response::Peaking,
        ]),
        frequency in 20.0f32..20000.0,
        q in 0.1f32..20.0,
        gain in -24.0f32..24.0,
        seed in 1u32..1000,
    ) {
        let mut s = synth();
        let filter = s.add(BiquadFilter::new(response));
        s.set(s.port(filter, "Frequency").unwrap(), frequency).unwrap();
        s.set(s.port(filter, "Q").unwrap(), q).unwrap();
        s.set(s.port(filter, "Gain").unwrap(), gain).unwrap();
        noise_into(&mut s, filter, seed);
        s.start_unit(filter).unwrap();

        for v in output(&mut s, filter, 20) {
            prop_assert!(v.is_finite() && v.abs() < 1000.0, "unstable output {v}");
        }
    }

    /// Below self-oscillation the ladder stays bounded.
    #[test]
    fn ladder_stays_finite(
        frequency in 20.0f32..10000.0,
        q in 0.0f32..2.0,
        seed in 1u32..1000,
    ) {
        let mut s = synth();
        let filter = s.add(FilterFourPoles::new());
        s.set(s.port(filter, "Frequency").unwrap(), frequency).unwrap();
        s.set(s.port(filter, "Q").unwrap(), q).unwrap();
        noise_into(&mut s, filter, seed);
        s.start_unit(filter).unwrap();

        for v in output(&mut s, filter, 20) {
            prop_assert!(v.is_finite() && v.abs() < 1000.0, "unstable output {v}");
        }
    }
}
