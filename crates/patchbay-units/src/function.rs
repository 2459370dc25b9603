//! Waveshaping through a host-supplied function.

use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

/// `Output = Amplitude * f(Input)` where `f` is the function held by the
/// `Function` port (identity until the host sets one).
///
/// ```rust
/// use std::sync::Arc;
///
/// use patchbay_core::{LookupTable, SynthConfig, Synthesizer};
/// use patchbay_units::FunctionEvaluator;
///
/// let mut synth = Synthesizer::new(SynthConfig::default());
/// let shaper = synth.add(FunctionEvaluator);
/// let table = LookupTable::new(vec![-0.5, 0.0, 0.5]);
/// synth.set_function(synth.port(shaper, "Function")?, Arc::new(table))?;
/// # Ok::<(), patchbay_core::GraphError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionEvaluator;

impl FunctionEvaluator {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 1;
    /// Function port index.
    pub const FUNCTION: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;
}

impl UnitGenerator for FunctionEvaluator {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .input("Amplitude", PortRange::new(0.0, 1.0, 1.0))
            .function("Function")
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let function = io.functions.get(Self::FUNCTION);
        let input = io.inputs.values(Self::INPUT);
        let amplitude = io.inputs.values(Self::AMPLITUDE);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = function.evaluate(input[i]) * amplitude[i];
        }
    }
}
