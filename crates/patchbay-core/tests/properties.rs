//! Property-based tests for the signal graph and scheduler.
//!
//! Random wiring (cycles included) must evaluate every running unit exactly
//! once per slice, inputs must equal the exact sum of their sources, and a
//! scheduled value must land on exactly the requested frame.

mod common;

use std::sync::atomic::Ordering;

use common::Offset;
use patchbay_core::{SynthConfig, Synthesizer};
use proptest::prelude::*;

fn synth(block: usize) -> Synthesizer {
    let mut s = Synthesizer::new(SynthConfig::with_sample_rate(48000.0).block_size(block));
    s.start();
    s
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Arbitrary wiring, feedback included, generates each running unit
    /// once per block.
    #[test]
    fn generate_once_per_block(
        units in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
        started in prop::collection::vec(0usize..12, 1..4),
        blocks in 1usize..5,
    ) {
        let mut s = synth(16);
        let ids: Vec<_> = (0..units).map(|i| s.add(Offset::new(i as f32))).collect();
        let calls: Vec<_> = ids
            .iter()
            .map(|&id| s.unit_ref::<Offset>(id).map(|o| o.calls.clone()).unwrap())
            .collect();
        for (from, to) in edges {
            let out = s.port(ids[from % units], "Output").unwrap();
            let input = s.port(ids[to % units], "Input").unwrap();
            s.connect(out, input).unwrap();
        }
        for i in &started {
            s.start_unit(ids[i % units]).unwrap();
        }
        for _ in 0..blocks {
            s.render_block();
        }
        for (i, c) in calls.iter().enumerate() {
            let n = c.load(Ordering::Relaxed);
            prop_assert!(n == 0 || n == blocks, "unit {i} generated {n} times in {blocks} blocks");
        }
        for i in &started {
            prop_assert_eq!(calls[i % units].load(Ordering::Relaxed), blocks);
        }
    }

    /// An input equals its sources summed in connection order.
    #[test]
    fn input_is_exact_sum(offsets in prop::collection::vec(-100.0f32..100.0, 1..8)) {
        let mut s = synth(8);
        let sum = s.add(Offset::new(0.0));
        let sum_in = s.port(sum, "Input").unwrap();
        for &o in &offsets {
            let src = s.add(Offset::new(o));
            let out = s.port(src, "Output").unwrap();
            s.connect(out, sum_in).unwrap();
        }
        s.start_unit(sum).unwrap();
        s.render_block();

        let mut expected = offsets[0];
        for &o in &offsets[1..] {
            expected += o;
        }
        for &v in s.values(sum_in, 0).unwrap() {
            prop_assert_eq!(v.to_bits(), expected.to_bits());
        }
    }

    /// A scheduled set is observed from exactly its target frame.
    #[test]
    fn scheduled_set_lands_on_frame(
        block in 1usize..48,
        frame in 0u64..200,
        value in 0.5f32..10.0,
    ) {
        let mut s = synth(block);
        let unit = s.add(Offset::new(0.0));
        let input = s.port(unit, "Input").unwrap();
        s.start_unit(unit).unwrap();
        s.set_at(input, value, frame).unwrap();

        let mut seen = Vec::new();
        while (seen.len() as u64) <= frame {
            s.render_block();
            seen.extend_from_slice(s.values(input, 0).unwrap());
        }
        let frame = frame as usize;
        prop_assert!(seen[..frame].iter().all(|&v| v == 0.0));
        prop_assert!(seen[frame..].iter().all(|&v| v == value));
        prop_assert_eq!(s.pending_commands(), 0);
    }
}
