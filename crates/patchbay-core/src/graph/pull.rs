//! Frame-stamped pull evaluation.

use super::{UnitBody, UnitId};
use crate::Synthesizer;
use crate::unit::{
    Functions, Inputs, Outputs, Queues, Signals, SpectralInputs, SpectralOutputs, UnitIo,
    Variables,
};

impl Synthesizer {
    /// Brings `unit` up to date for frames `[start, limit)` of slice `stamp`.
    ///
    /// Disabled units and units already visited in this slice return at once.
    /// The stamp is recorded before upstream producers are visited, which is
    /// what terminates feedback cycles.
    pub(crate) fn pull(&mut self, unit: UnitId, stamp: u64, start: usize, limit: usize) {
        let idx = unit.index();
        {
            let slot = &mut self.units[idx];
            if !slot.enabled || stamp <= slot.last_stamp {
                return;
            }
            slot.last_stamp = stamp;
        }

        if matches!(self.units[idx].body, UnitBody::Circuit(_)) {
            for k in 0..self.child_count(unit) {
                if let Some(child) = self.child_at(unit, k) {
                    self.pull(child, stamp, start, limit);
                }
            }
            return;
        }

        let ranges = self.units[idx].ports.clone();

        for i in ranges.inputs.clone() {
            for p in 0..self.ports.inputs[i].parts.len() {
                for s in 0..self.ports.inputs[i].parts[p].sources.len() {
                    let source = self.ports.inputs[i].parts[p].sources[s];
                    let producer = self.ports.outputs[source.port].unit;
                    self.pull(producer, stamp, start, limit);
                }
            }
        }
        for i in ranges.spectral_inputs.clone() {
            if let Some(source) = self.ports.spectral_inputs[i].source {
                let producer = self.ports.spectral_outputs[source].unit;
                self.pull(producer, stamp, start, limit);
            }
        }

        self.ports.gather(ranges.inputs.clone(), start, limit);
        self.ports.gather_spectra(ranges.spectral_inputs.clone());

        let slot = &mut self.units[idx];
        let UnitBody::Primitive(generator) = &mut slot.body else {
            return;
        };
        let ports = &mut self.ports;
        let mut io = UnitIo {
            inputs: Inputs::new(&ports.inputs[ranges.inputs.clone()]),
            outputs: Outputs::new(&mut ports.outputs[ranges.outputs]),
            variables: Variables::new(&mut ports.variables[ranges.variables]),
            queues: Queues::new(&mut ports.queues[ranges.queues]),
            functions: Functions::new(&ports.functions[ranges.functions]),
            spectral_inputs: SpectralInputs::new(&ports.spectral_inputs[ranges.spectral_inputs]),
            spectral_outputs: SpectralOutputs::new(
                &mut ports.spectral_outputs[ranges.spectral_outputs],
            ),
            bus: &mut self.bus,
            signals: Signals::new(unit, ranges.inputs.start, &mut self.signals),
            sample_rate: self.config.sample_rate,
            frame: self.frame,
        };
        generator.generate(&mut io, start, limit);
        slot.generate_count += 1;
    }
}
