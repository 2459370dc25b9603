//! Criterion benchmarks for unit generators (`patchbay-units`).
//!
//! Each bench renders one block of a single unit through a running
//! synthesizer, so graph overhead is included but constant.
//!
//! Run with: `cargo bench -p patchbay-units`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use patchbay_core::{SynthConfig, Synthesizer, UnitGenerator};
use patchbay_units::{
    BiquadFilter, EnvelopeDahdsr, FilterFourPoles, GrainFarm, Oscillator, SpectralFft,
    SpectralIfft, Waveform,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZE: usize = 256;

fn running(unit: impl UnitGenerator) -> Synthesizer {
    let mut synth = Synthesizer::new(SynthConfig::with_sample_rate(SAMPLE_RATE).block_size(BLOCK_SIZE));
    let id = synth.add(unit);
    synth.start_unit(id).expect("freshly added unit");
    synth.start();
    synth
}

fn bench_oscillators(c: &mut Criterion) {
    let mut group = c.benchmark_group("oscillator");
    for waveform in [Waveform::Sine, Waveform::Sawtooth, Waveform::Square, Waveform::Pulse] {
        let mut synth = running(Oscillator::new(waveform));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{waveform:?}")),
            &waveform,
            |b, _| b.iter(|| black_box(synth.render_block().channels())),
        );
    }
    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");
    let mut biquad = running(BiquadFilter::lowpass());
    group.bench_function("biquad", |b| {
        b.iter(|| black_box(biquad.render_block().channels()))
    });
    let mut ladder = running(FilterFourPoles::new());
    group.bench_function("four_poles", |b| {
        b.iter(|| black_box(ladder.render_block().channels()))
    });
    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut synth = running(EnvelopeDahdsr::new());
    c.bench_function("envelope/dahdsr", |b| {
        b.iter(|| black_box(synth.render_block().channels()))
    });
}

fn bench_granular(c: &mut Criterion) {
    let mut group = c.benchmark_group("granular");
    for grains in [8, 32, 128] {
        let mut farm = GrainFarm::new();
        farm.allocate(grains);
        let mut synth = running(farm);
        group.bench_with_input(BenchmarkId::from_parameter(grains), &grains, |b, _| {
            b.iter(|| black_box(synth.render_block().channels()))
        });
    }
    group.finish();
}

fn bench_spectral(c: &mut Criterion) {
    let mut synth = Synthesizer::new(SynthConfig::with_sample_rate(SAMPLE_RATE).block_size(BLOCK_SIZE));
    let fft = synth.add(SpectralFft::default());
    let ifft = synth.add(SpectralIfft::default());
    let spectrum_out = synth.port(fft, "Spectrum").expect("fft port");
    let spectrum_in = synth.port(ifft, "Spectrum").expect("ifft port");
    synth.connect(spectrum_out, spectrum_in).expect("matching sizes");
    synth.start_unit(ifft).expect("freshly added unit");
    synth.start();
    c.bench_function("spectral/fft_ifft", |b| {
        b.iter(|| black_box(synth.render_block().channels()))
    });
}

criterion_group!(
    benches,
    bench_oscillators,
    bench_filters,
    bench_envelope,
    bench_granular,
    bench_spectral
);
criterion_main!(benches);
