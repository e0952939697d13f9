// SPDX-License-Identifier: Apache-2.0

//! Partitioning of a netlist into combinational logic cones.
//!
//! A cone is the set of NAND gates feeding one sink signal, bounded by leaf
//! signals. Sinks are:
//!
//! - DFF data inputs and primary outputs;
//! - every input bit of an intrinsic or behavioral module, so that no consumer
//!   outside the cone set can observe a cone's interior.
//!
//! Leaves are primary inputs, DFF outputs, and any signal no NAND gate drives
//! (intrinsic/behavioral outputs, constants, undriven wires).
//!
//! Cones may overlap: a gate feeding two sinks belongs to both cones. Sharing
//! is detected by the optimizer, not here.

use std::collections::HashSet;

use crate::netlist::{NandGate, Netlist, SignalId};
use crate::topo::postorder_fanin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicCone {
    /// The sink signal this cone computes.
    pub output: SignalId,
    /// Leaf signals feeding the cone, deduplicated, in first-encounter order.
    pub inputs: Vec<SignalId>,
    /// Gates in topological order; the last gate drives `output`.
    pub gates: Vec<NandGate>,
}

#[derive(Debug)]
pub enum ConeError {
    CombinationalLoop { root: String, signal: String },
}

impl std::fmt::Display for ConeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConeError::CombinationalLoop { root, signal } => write!(
                f,
                "combinational loop through '{}' in the cone of '{}'",
                signal, root
            ),
        }
    }
}

impl std::error::Error for ConeError {}

/// Sink signals in a deterministic order, first occurrence wins.
pub fn cone_roots(netlist: &Netlist) -> Vec<SignalId> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    let candidates = netlist
        .dffs
        .iter()
        .map(|dff| dff.d)
        .chain(netlist.primary_outputs.iter().copied())
        .chain(
            netlist
                .intrinsics
                .iter()
                .flat_map(|i| i.inputs.iter().flat_map(|p| p.signals.iter().copied())),
        )
        .chain(
            netlist
                .behavioral_modules
                .iter()
                .flat_map(|m| m.flattened_inputs()),
        )
        // A gate-derived clock is consumed outside every cone.
        .chain(netlist.dffs.iter().map(|dff| dff.clk))
        .chain(netlist.clock_signal);
    for root in candidates {
        if seen.insert(root) {
            roots.push(root);
        }
    }
    roots
}

pub fn extract_cones(netlist: &Netlist) -> Result<Vec<LogicCone>, ConeError> {
    let drivers = netlist.driver_map();
    let leaf_signals: HashSet<SignalId> = netlist
        .signals
        .iter()
        .filter(|s| netlist.is_leaf(s))
        .map(|s| s.id)
        .collect();

    let mut cones = Vec::new();
    for root in cone_roots(netlist) {
        let walk = postorder_fanin(root, &netlist.nand_gates, &drivers, |s| {
            leaf_signals.contains(&s)
        })
        .map_err(|signal| ConeError::CombinationalLoop {
            root: netlist.signal_name(root),
            signal: netlist.signal_name(signal),
        })?;
        if walk.gate_indices.is_empty() {
            // Sink wired straight to a leaf; nothing to optimize.
            continue;
        }
        cones.push(LogicCone {
            output: root,
            inputs: walk.leaves,
            gates: walk
                .gate_indices
                .iter()
                .map(|&i| netlist.nand_gates[i].clone())
                .collect(),
        });
    }
    log::debug!(
        "extract_cones; netlist '{}' yielded {} cones",
        netlist.name,
        cones.len()
    );
    Ok(cones)
}

pub fn is_cone_optimizable(cone: &LogicCone, max_inputs: usize) -> bool {
    cone.inputs.len() <= max_inputs && !cone.gates.is_empty()
}
