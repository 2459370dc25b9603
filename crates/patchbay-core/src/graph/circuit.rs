//! Circuits: reusable sub-graphs that present themselves as one unit.

use super::{UnitBody, UnitId, UnitSlot};
use crate::Synthesizer;
use crate::error::GraphError;
use crate::port::{PortId, PortKind};

/// Named set of values applied to a circuit's aliased ports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Preset {
    /// Display name.
    pub name: String,
    /// `(alias, value)` pairs, applied in order.
    pub values: Vec<(String, f32)>,
}

impl Preset {
    /// Empty preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Adds a value.
    pub fn with(mut self, alias: impl Into<String>, value: f32) -> Self {
        self.values.push((alias.into(), value));
        self
    }
}

pub(crate) struct CircuitData {
    pub name: String,
    pub children: Vec<UnitId>,
    /// Alias → child port, in insertion order.
    pub aliases: Vec<(String, PortId)>,
    pub presets: Vec<Preset>,
}

impl CircuitData {
    fn find_alias(&self, name: &str) -> Option<PortId> {
        self.aliases
            .iter()
            .find(|(a, _)| a.eq_ignore_ascii_case(name))
            .map(|(_, p)| *p)
    }
}

impl Synthesizer {
    /// Adds an empty circuit.
    pub fn add_circuit(&mut self, name: impl Into<String>) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        let name = name.into();
        #[cfg(feature = "tracing")]
        tracing::debug!(unit = %id, name = %name, "synth_add_circuit");
        self.units.push(UnitSlot::circuit(CircuitData {
            name,
            children: Vec::new(),
            aliases: Vec::new(),
            presets: Vec::new(),
        }));
        self.running.reserve(1);
        id
    }

    /// Name given to a circuit.
    pub fn circuit_name(&self, circuit: UnitId) -> Result<&str, GraphError> {
        Ok(&self.circuit(circuit)?.name)
    }

    /// Children of a circuit, in pull order.
    pub fn children(&self, circuit: UnitId) -> Result<&[UnitId], GraphError> {
        Ok(&self.circuit(circuit)?.children)
    }

    /// Owning circuit of `unit`, if any.
    pub fn owner(&self, unit: UnitId) -> Result<Option<UnitId>, GraphError> {
        Ok(self.slot(unit)?.owner)
    }

    /// Appends `child` to `circuit`. The child takes the circuit's enabled
    /// state.
    pub fn add_to_circuit(&mut self, circuit: UnitId, child: UnitId) -> Result<(), GraphError> {
        self.circuit(circuit)?;
        if let Some(owner) = self.slot(child)?.owner {
            return Err(GraphError::AlreadyOwned { unit: child, owner });
        }
        let mut ancestor = Some(circuit);
        while let Some(a) = ancestor {
            if a == child {
                return Err(GraphError::OwnershipCycle { circuit, child });
            }
            ancestor = self.units[a.index()].owner;
        }

        self.units[child.index()].owner = Some(circuit);
        if let Some(data) = self.units[circuit.index()].circuit_data_mut() {
            data.children.push(child);
        }
        let enabled = self.units[circuit.index()].enabled;
        self.set_enabled_now(child, enabled);
        #[cfg(feature = "tracing")]
        tracing::debug!(circuit = %circuit, child = %child, "circuit_add");
        Ok(())
    }

    /// Aliases every port of `child` in `circuit` as `prefix + name`.
    ///
    /// When the child is itself a circuit its aliases are exported.
    pub fn export(
        &mut self,
        circuit: UnitId,
        child: UnitId,
        prefix: &str,
    ) -> Result<(), GraphError> {
        if !self.circuit(circuit)?.children.contains(&child) {
            return Err(GraphError::NotAChild {
                circuit,
                unit: child,
            });
        }
        let ports: Vec<(String, PortId)> = match &self.slot(child)?.body {
            UnitBody::Primitive(_) => self.units[child.index()]
                .names
                .iter()
                .map(|(n, p)| (format!("{prefix}{n}"), *p))
                .collect(),
            UnitBody::Circuit(c) => c
                .aliases
                .iter()
                .map(|(n, p)| (format!("{prefix}{n}"), *p))
                .collect(),
        };
        let data = self.circuit(circuit)?;
        if let Some((name, _)) = ports.iter().find(|(n, _)| data.find_alias(n).is_some()) {
            return Err(GraphError::DuplicateName(name.clone()));
        }
        for (i, (name, _)) in ports.iter().enumerate() {
            if ports[..i].iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
                return Err(GraphError::DuplicateName(name.clone()));
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(circuit = %circuit, child = %child, prefix, count = ports.len(), "circuit_export");
        self.circuit_mut(circuit)?.aliases.extend(ports);
        Ok(())
    }

    /// Aliases one port of a unit inside `circuit`.
    pub fn add_port_alias(
        &mut self,
        circuit: UnitId,
        port: PortId,
        alias: &str,
    ) -> Result<(), GraphError> {
        self.circuit(circuit)?;
        self.check(port.unit())?;
        if !self.is_descendant(port.unit(), circuit) {
            return Err(GraphError::NotAChild {
                circuit,
                unit: port.unit(),
            });
        }
        self.resolve(port, port.kind())?;
        if self.circuit(circuit)?.find_alias(alias).is_some() {
            return Err(GraphError::DuplicateName(alias.to_owned()));
        }
        self.circuit_mut(circuit)?
            .aliases
            .push((alias.to_owned(), port));
        #[cfg(feature = "tracing")]
        tracing::debug!(circuit = %circuit, port = %port, alias, "circuit_alias");
        Ok(())
    }

    /// Looks up a port by name, case-insensitively. On a circuit this
    /// resolves aliases.
    pub fn port(&self, unit: UnitId, name: &str) -> Result<PortId, GraphError> {
        let slot = self.slot(unit)?;
        let found = match &slot.body {
            UnitBody::Primitive(_) => slot.find_port(name),
            UnitBody::Circuit(c) => c.find_alias(name),
        };
        found.ok_or_else(|| GraphError::UnknownPortName {
            unit,
            name: name.to_owned(),
        })
    }

    /// Port names of a unit (aliases for a circuit), in declaration order.
    pub fn port_names(&self, unit: UnitId) -> Result<Vec<String>, GraphError> {
        let slot = self.slot(unit)?;
        Ok(match &slot.body {
            UnitBody::Primitive(_) => slot.names.iter().map(|(n, _)| (*n).to_owned()).collect(),
            UnitBody::Circuit(c) => c.aliases.iter().map(|(n, _)| n.clone()).collect(),
        })
    }

    /// Declared name of a port.
    pub fn port_name(&self, port: PortId) -> Result<&'static str, GraphError> {
        let g = self.resolve(port, port.kind())?;
        Ok(match port.kind() {
            PortKind::Input => self.ports.inputs[g].name,
            PortKind::Output => self.ports.outputs[g].name,
            PortKind::Variable => self.ports.variables[g].name,
            PortKind::Queue => self.ports.queues[g].name,
            PortKind::Function => self.ports.functions[g].name,
            PortKind::SpectralInput => self.ports.spectral_inputs[g].name,
            PortKind::SpectralOutput => self.ports.spectral_outputs[g].name,
        })
    }

    /// Appends a preset to a circuit's bank.
    pub fn add_preset(&mut self, circuit: UnitId, preset: Preset) -> Result<(), GraphError> {
        self.circuit_mut(circuit)?.presets.push(preset);
        Ok(())
    }

    /// Number of presets in a circuit's bank.
    pub fn preset_count(&self, circuit: UnitId) -> Result<usize, GraphError> {
        Ok(self.circuit(circuit)?.presets.len())
    }

    /// Applies preset `index` (wrapped modulo the bank size).
    ///
    /// Values whose alias does not resolve are skipped. If none of the
    /// chosen preset's values resolve, preset 0 is applied instead. A circuit
    /// without presets is left untouched.
    pub fn use_preset(&mut self, circuit: UnitId, index: i64) -> Result<(), GraphError> {
        let count = self.circuit(circuit)?.presets.len();
        if count == 0 {
            return Ok(());
        }
        let chosen = index.rem_euclid(count as i64) as usize;
        if self.apply_preset(circuit, chosen) == 0 && chosen != 0 {
            #[cfg(feature = "tracing")]
            tracing::warn!(circuit = %circuit, index = chosen, "preset unresolvable, using preset 0");
            self.apply_preset(circuit, 0);
        }
        Ok(())
    }

    /// Applies a preset and returns how many values landed.
    fn apply_preset(&mut self, circuit: UnitId, index: usize) -> usize {
        let Some(data) = self.units[circuit.index()].circuit_data() else {
            return 0;
        };
        let targets: Vec<(PortId, f32)> = data.presets[index]
            .values
            .iter()
            .filter_map(|(alias, value)| {
                let port = data.find_alias(alias);
                #[cfg(feature = "tracing")]
                if port.is_none() {
                    tracing::warn!(circuit = %circuit, alias = %alias, "preset alias not found");
                }
                port.map(|p| (p, *value))
            })
            .collect();
        targets
            .into_iter()
            .filter(|(port, value)| self.set(*port, *value).is_ok())
            .count()
    }

    fn circuit(&self, circuit: UnitId) -> Result<&CircuitData, GraphError> {
        self.slot(circuit)?
            .circuit_data()
            .ok_or(GraphError::NotACircuit(circuit))
    }

    fn circuit_mut(&mut self, circuit: UnitId) -> Result<&mut CircuitData, GraphError> {
        self.units
            .get_mut(circuit.index())
            .ok_or(GraphError::UnitNotFound(circuit))?
            .circuit_data_mut()
            .ok_or(GraphError::NotACircuit(circuit))
    }

    fn is_descendant(&self, unit: UnitId, circuit: UnitId) -> bool {
        let mut owner = self.units[unit.index()].owner;
        while let Some(o) = owner {
            if o == circuit {
                return true;
            }
            owner = self.units[o.index()].owner;
        }
        false
    }

    pub(crate) fn child_count(&self, unit: UnitId) -> usize {
        self.units[unit.index()]
            .circuit_data()
            .map_or(0, |c| c.children.len())
    }

    pub(crate) fn child_at(&self, unit: UnitId, k: usize) -> Option<UnitId> {
        self.units[unit.index()]
            .circuit_data()
            .and_then(|c| c.children.get(k).copied())
    }
}
