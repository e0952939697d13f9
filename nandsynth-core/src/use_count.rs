// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use crate::cone::LogicCone;
use crate::netlist::{Netlist, SignalId};

/// Counts, for every gate (keyed by the signal it drives), how many cones
/// contain it. A count above one means the gate's logic is shared between
/// cones and rewriting either cone alone would duplicate it.
pub fn get_gate_to_cone_count(cones: &[LogicCone]) -> HashMap<SignalId, usize> {
    let mut gate_to_cone_count: HashMap<SignalId, usize> = HashMap::new();
    for cone in cones {
        for gate in &cone.gates {
            *gate_to_cone_count.entry(gate.out).or_insert(0) += 1;
        }
    }
    gate_to_cone_count
}

/// Maps each signal to the indices (into `nand_gates`) of the gates reading
/// it. A gate reading the same signal on both pins is listed once.
pub fn get_signal_to_gate_readers(netlist: &Netlist) -> HashMap<SignalId, Vec<usize>> {
    let mut readers: HashMap<SignalId, Vec<usize>> = HashMap::new();
    for (i, gate) in netlist.nand_gates.iter().enumerate() {
        readers.entry(gate.in1).or_default().push(i);
        if gate.in2 != gate.in1 {
            readers.entry(gate.in2).or_default().push(i);
        }
    }
    readers
}
