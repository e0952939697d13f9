// SPDX-License-Identifier: Apache-2.0

//! Flattened NAND-gate netlist representation.
//!
//! A `Netlist` is a bag of single-bit `Signal`s connected by:
//!
//! - 2-input `NandGate`s, the only combinational primitive;
//! - `Dff`s, which form the state boundary between simulation cycles;
//! - `Intrinsic`s, opaque multi-bit blocks (RAM/ROM/I/O) that are never
//!   decomposed into gates;
//! - `BehavioralModule`s, un-flattened blocks whose function lives in a
//!   compiled behavior registry (see `crate::behavior`).
//!
//! Every signal id referenced by any element must be present in
//! `Netlist::signals`, and every signal has at most one driver. The latter is
//! checked by `integrity::check_netlist` / `Netlist::validate`.

pub mod builder;
pub mod integrity;
pub mod io;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Names recognized as constant tie-off signals.
pub const CONST_ZERO_NAMES: &[&str] = &["const_0", "GND"];
pub const CONST_ONE_NAMES: &[&str] = &["const_1", "VCC"];

/// Returns the constant value a signal name stands for, if it is one of the
/// recognized constant markers.
pub fn constant_value(name: &str) -> Option<bool> {
    if CONST_ZERO_NAMES.contains(&name) {
        Some(false)
    } else if CONST_ONE_NAMES.contains(&name) {
        Some(true)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(pub usize);

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub id: SignalId,
    pub name: String,
    #[serde(default)]
    pub is_primary_input: bool,
    #[serde(default)]
    pub is_primary_output: bool,
    #[serde(default)]
    pub is_dff_output: bool,
}

impl Signal {
    pub fn new(id: SignalId, name: impl Into<String>) -> Self {
        Signal {
            id,
            name: name.into(),
            is_primary_input: false,
            is_primary_output: false,
            is_dff_output: false,
        }
    }

    pub fn constant_value(&self) -> Option<bool> {
        constant_value(&self.name)
    }
}

/// `out = !(in1 & in2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NandGate {
    pub id: GateId,
    pub in1: SignalId,
    pub in2: SignalId,
    pub out: SignalId,
    /// Assigned by the levelizer only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl NandGate {
    pub fn new(id: GateId, in1: SignalId, in2: SignalId, out: SignalId) -> Self {
        NandGate {
            id,
            in1,
            in2,
            out,
            level: None,
        }
    }

    pub fn eval(a: bool, b: bool) -> bool {
        !(a && b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dff {
    pub d: SignalId,
    pub clk: SignalId,
    pub q: SignalId,
    #[serde(default)]
    pub reset_value: bool,
}

/// A named, possibly multi-bit port. Index 0 of `signals` is the LSB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub signals: Vec<SignalId>,
}

impl Port {
    pub fn new(name: impl Into<String>, signals: Vec<SignalId>) -> Self {
        Port {
            name: name.into(),
            signals,
        }
    }

    pub fn width(&self) -> usize {
        self.signals.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intrinsic {
    pub name: String,
    /// E.g. "ram", "rom", "io".
    pub kind: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

/// Un-flattened functional block evaluated through the behavior registry
/// under `module_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehavioralModule {
    pub instance_name: String,
    pub module_name: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl BehavioralModule {
    pub fn input_widths(&self) -> Vec<usize> {
        self.inputs.iter().map(Port::width).collect()
    }

    pub fn output_widths(&self) -> Vec<usize> {
        self.outputs.iter().map(Port::width).collect()
    }

    pub fn flattened_inputs(&self) -> Vec<SignalId> {
        self.inputs.iter().flat_map(|p| p.signals.iter().copied()).collect()
    }

    pub fn flattened_outputs(&self) -> Vec<SignalId> {
        self.outputs.iter().flat_map(|p| p.signals.iter().copied()).collect()
    }

    /// Packs each input port into one word, LSB first. Ports wider than 64
    /// bits are truncated.
    pub fn pack_inputs(&self, get_bit: impl Fn(SignalId) -> bool) -> Vec<u64> {
        self.inputs
            .iter()
            .map(|port| {
                port.signals
                    .iter()
                    .take(64)
                    .enumerate()
                    .fold(0u64, |word, (i, s)| word | ((get_bit(*s) as u64) << i))
            })
            .collect()
    }

    /// Inverse of `pack_inputs` for the output ports: yields one
    /// `(signal, bit)` per output bit. Missing words read as zero.
    pub fn unpack_outputs(&self, words: &[u64]) -> Vec<(SignalId, bool)> {
        let mut bits = Vec::new();
        for (port_index, port) in self.outputs.iter().enumerate() {
            let word = words.get(port_index).copied().unwrap_or(0);
            for (i, s) in port.signals.iter().enumerate() {
                let bit = i < 64 && (word >> i) & 1 == 1;
                bits.push((*s, bit));
            }
        }
        bits
    }
}

#[derive(Debug)]
pub enum NetlistError {
    UnknownSignal { id: SignalId, context: String },
    DuplicateSignalId { id: SignalId },
    MultipleDrivers { signal: String, drivers: Vec<String> },
    DrivenPrimaryInput { signal: String, driver: String },
}

impl std::fmt::Display for NetlistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetlistError::UnknownSignal { id, context } => {
                write!(f, "signal {} referenced by {} is not in the netlist", id, context)
            }
            NetlistError::DuplicateSignalId { id } => {
                write!(f, "signal id {} is declared more than once", id)
            }
            NetlistError::MultipleDrivers { signal, drivers } => write!(
                f,
                "signal '{}' has {} drivers: {}",
                signal,
                drivers.len(),
                drivers.join(", ")
            ),
            NetlistError::DrivenPrimaryInput { signal, driver } => {
                write!(f, "primary input '{}' is driven by {}", signal, driver)
            }
        }
    }
}

impl std::error::Error for NetlistError {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    pub name: String,
    pub signals: Vec<Signal>,
    pub nand_gates: Vec<NandGate>,
    #[serde(default)]
    pub dffs: Vec<Dff>,
    #[serde(default)]
    pub intrinsics: Vec<Intrinsic>,
    #[serde(default)]
    pub behavioral_modules: Vec<BehavioralModule>,
    pub primary_inputs: Vec<SignalId>,
    pub primary_outputs: Vec<SignalId>,
    #[serde(default)]
    pub clock_signal: Option<SignalId>,
    /// Name to id; derived from `signals` via `rebuild_signal_map`.
    #[serde(default)]
    pub signal_map: BTreeMap<String, SignalId>,
}

impl Netlist {
    /// Returns an empty netlist.
    pub fn new(name: impl Into<String>) -> Self {
        Netlist {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn rebuild_signal_map(&mut self) {
        self.signal_map = self
            .signals
            .iter()
            .map(|s| (s.name.clone(), s.id))
            .collect();
    }

    pub fn signal_index(&self) -> HashMap<SignalId, &Signal> {
        self.signals.iter().map(|s| (s.id, s)).collect()
    }

    pub fn signal(&self, id: SignalId) -> Option<&Signal> {
        self.signals.iter().find(|s| s.id == id)
    }

    pub fn signal_by_name(&self, name: &str) -> Option<SignalId> {
        self.signal_map
            .get(name)
            .copied()
            .or_else(|| self.signals.iter().find(|s| s.name == name).map(|s| s.id))
    }

    pub fn signal_name(&self, id: SignalId) -> String {
        self.signal(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn next_signal_id(&self) -> usize {
        self.signals.iter().map(|s| s.id.0 + 1).max().unwrap_or(0)
    }

    pub fn next_gate_id(&self) -> usize {
        self.nand_gates.iter().map(|g| g.id.0 + 1).max().unwrap_or(0)
    }

    /// Number of slots a dense, id-indexed signal buffer needs.
    pub fn signal_slots(&self) -> usize {
        std::cmp::max(self.signals.len(), self.next_signal_id())
    }

    /// Maps each gate-driven signal to the index (in `nand_gates`) of the gate
    /// driving it. If a signal is multiply driven the last gate wins; callers
    /// that care validate first.
    pub fn driver_map(&self) -> HashMap<SignalId, usize> {
        self.nand_gates
            .iter()
            .enumerate()
            .map(|(i, g)| (g.out, i))
            .collect()
    }

    /// Signals that are cycle-boundary leaves: primary inputs and DFF outputs.
    pub fn is_leaf(&self, signal: &Signal) -> bool {
        signal.is_primary_input || signal.is_dff_output
    }

    pub fn gate_count(&self) -> usize {
        self.nand_gates.len()
    }

    /// Fails on the fatal integrity findings: unknown signal references,
    /// duplicate ids, multiple drivers and driven primary inputs.
    pub fn validate(&self) -> Result<(), NetlistError> {
        match integrity::check_netlist(self) {
            integrity::IntegritySummary::Clean => Ok(()),
            integrity::IntegritySummary::Findings(findings) => {
                for finding in findings {
                    if let Some(err) = finding.into_fatal_error() {
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}
