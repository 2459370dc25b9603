//! Connecting and disconnecting ports.
//!
//! A connection is a directed edge from one output part to one input part.
//! Both ends record it: the input part lists its sources (summed when
//! gathered) and the output part lists its targets, so either side can be
//! disconnected wholesale.

use crate::Synthesizer;
use crate::error::GraphError;
use crate::port::{Endpoint, PortId, PortKind};

impl Synthesizer {
    /// Connects `source` to `target` part by part.
    ///
    /// Output → input requires equal part counts. Spectral output → spectral
    /// input requires equal frame sizes and replaces any previous source.
    pub fn connect(&mut self, source: PortId, target: PortId) -> Result<(), GraphError> {
        if source.kind() == PortKind::SpectralOutput {
            return self.connect_spectral(source, target);
        }
        let (src, dst) = self.resolve_edge(source, target)?;
        let source_parts = self.ports.outputs[src].parts();
        let target_parts = self.ports.inputs[dst].parts();
        if source_parts != target_parts {
            return Err(GraphError::PartCountMismatch {
                source_port: source,
                source_parts,
                target,
                target_parts,
            });
        }
        for part in 0..source_parts {
            self.link(src, part, dst, part);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {source} → {target}");
        Ok(())
    }

    /// Connects one output part to one input part.
    pub fn connect_parts(
        &mut self,
        source: PortId,
        source_part: usize,
        target: PortId,
        target_part: usize,
    ) -> Result<(), GraphError> {
        let (src, dst) = self.resolve_edge(source, target)?;
        self.check_parts(source, src, source_part, target, dst, target_part)?;
        self.link(src, source_part, dst, target_part);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {source}:{source_part} → {target}:{target_part}");
        Ok(())
    }

    /// Removes every part connection from `source` to `target`.
    pub fn disconnect(&mut self, source: PortId, target: PortId) -> Result<(), GraphError> {
        if source.kind() == PortKind::SpectralOutput {
            let src = self.resolve(source, PortKind::SpectralOutput)?;
            let dst = self.resolve(target, PortKind::SpectralInput)?;
            if self.ports.spectral_inputs[dst].source == Some(src) {
                self.ports.spectral_inputs[dst].source = None;
                self.ports.spectral_outputs[src].targets.retain(|t| *t != dst);
            }
            return Ok(());
        }
        let (src, dst) = self.resolve_edge(source, target)?;
        for part in &mut self.ports.outputs[src].parts {
            part.targets.retain(|e| e.port != dst);
        }
        for part in &mut self.ports.inputs[dst].parts {
            part.sources.retain(|e| e.port != src);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect: {source} → {target}");
        Ok(())
    }

    /// Removes one part connection.
    pub fn disconnect_parts(
        &mut self,
        source: PortId,
        source_part: usize,
        target: PortId,
        target_part: usize,
    ) -> Result<(), GraphError> {
        let (src, dst) = self.resolve_edge(source, target)?;
        self.check_parts(source, src, source_part, target, dst, target_part)?;
        let to = Endpoint {
            port: dst,
            part: target_part,
        };
        let from = Endpoint {
            port: src,
            part: source_part,
        };
        self.ports.outputs[src].parts[source_part]
            .targets
            .retain(|e| *e != to);
        self.ports.inputs[dst].parts[target_part]
            .sources
            .retain(|e| *e != from);
        Ok(())
    }

    /// Removes every connection of `port`, whichever side it is on.
    pub fn disconnect_all(&mut self, port: PortId) -> Result<(), GraphError> {
        match port.kind() {
            PortKind::Output => {
                let g = self.resolve(port, PortKind::Output)?;
                for p in 0..self.ports.outputs[g].parts.len() {
                    let targets = std::mem::take(&mut self.ports.outputs[g].parts[p].targets);
                    for t in targets {
                        self.ports.inputs[t.port].parts[t.part]
                            .sources
                            .retain(|e| !(e.port == g && e.part == p));
                    }
                }
            }
            PortKind::Input => {
                let g = self.resolve(port, PortKind::Input)?;
                for p in 0..self.ports.inputs[g].parts.len() {
                    let sources = std::mem::take(&mut self.ports.inputs[g].parts[p].sources);
                    for s in sources {
                        self.ports.outputs[s.port].parts[s.part]
                            .targets
                            .retain(|e| !(e.port == g && e.part == p));
                    }
                }
            }
            PortKind::SpectralOutput => {
                let g = self.resolve(port, PortKind::SpectralOutput)?;
                for t in std::mem::take(&mut self.ports.spectral_outputs[g].targets) {
                    self.ports.spectral_inputs[t].source = None;
                }
            }
            PortKind::SpectralInput => {
                let g = self.resolve(port, PortKind::SpectralInput)?;
                if let Some(src) = self.ports.spectral_inputs[g].source.take() {
                    self.ports.spectral_outputs[src].targets.retain(|t| *t != g);
                }
            }
            found => {
                return Err(GraphError::WrongPortKind {
                    port,
                    expected: PortKind::Output,
                    found,
                });
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_disconnect_all: {port}");
        Ok(())
    }

    /// Number of output parts feeding `part` of input `port`.
    pub fn source_count(&self, port: PortId, part: usize) -> Result<usize, GraphError> {
        let g = self.resolve(port, PortKind::Input)?;
        self.ports.inputs[g]
            .parts
            .get(part)
            .map(|p| p.sources.len())
            .ok_or(GraphError::PartOutOfRange {
                port,
                part,
                parts: self.ports.inputs[g].parts(),
            })
    }

    fn resolve_edge(&self, source: PortId, target: PortId) -> Result<(usize, usize), GraphError> {
        Ok((
            self.resolve(source, PortKind::Output)?,
            self.resolve(target, PortKind::Input)?,
        ))
    }

    fn check_parts(
        &self,
        source: PortId,
        src: usize,
        source_part: usize,
        target: PortId,
        dst: usize,
        target_part: usize,
    ) -> Result<(), GraphError> {
        let parts = self.ports.outputs[src].parts();
        if source_part >= parts {
            return Err(GraphError::PartOutOfRange {
                port: source,
                part: source_part,
                parts,
            });
        }
        let parts = self.ports.inputs[dst].parts();
        if target_part >= parts {
            return Err(GraphError::PartOutOfRange {
                port: target,
                part: target_part,
                parts,
            });
        }
        Ok(())
    }

    fn link(&mut self, src: usize, source_part: usize, dst: usize, target_part: usize) {
        let from = Endpoint {
            port: src,
            part: source_part,
        };
        let to = Endpoint {
            port: dst,
            part: target_part,
        };
        let sources = &mut self.ports.inputs[dst].parts[target_part].sources;
        if sources.contains(&from) {
            return;
        }
        sources.push(from);
        self.ports.outputs[src].parts[source_part].targets.push(to);
    }

    fn connect_spectral(&mut self, source: PortId, target: PortId) -> Result<(), GraphError> {
        let src = self.resolve(source, PortKind::SpectralOutput)?;
        let dst = self.resolve(target, PortKind::SpectralInput)?;
        let source_size = self.ports.spectral_outputs[src].spectrum.len();
        let target_size = self.ports.spectral_inputs[dst].spectrum.len();
        if source_size != target_size {
            return Err(GraphError::SpectrumSizeMismatch {
                source_size,
                target_size,
            });
        }
        if let Some(old) = self.ports.spectral_inputs[dst].source.replace(src) {
            self.ports.spectral_outputs[old].targets.retain(|t| *t != dst);
        }
        let input = &mut self.ports.spectral_inputs[dst];
        input.seen = self.ports.spectral_outputs[src].sequence;
        self.ports.spectral_outputs[src].targets.push(dst);
        #[cfg(feature = "tracing")]
        tracing::debug!("graph_connect: {source} → {target} (spectral)");
        Ok(())
    }
}
