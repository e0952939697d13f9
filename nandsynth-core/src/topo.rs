// SPDX-License-Identifier: Apache-2.0

use crate::netlist::{NandGate, SignalId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Result of walking the fan-in of one signal back to its leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaninWalk {
    /// Leaf signals in first-encounter order, deduplicated.
    pub leaves: Vec<SignalId>,
    /// Indices into the gate slice in postorder: every gate appears after the
    /// gates driving its inputs.
    pub gate_indices: Vec<usize>,
}

/// Returns a postorder traversal of the gates reachable backwards from `root`
/// (dedup by gate), stopping at signals for which `is_leaf` holds or which no
/// gate drives.
///
/// Uses an explicit stack rather than recursion so that very deep cones cannot
/// overflow the call stack. `in1` is always explored before `in2`.
///
/// On a combinational cycle returns `Err(signal)` naming a signal on the cycle.
pub fn postorder_fanin(
    root: SignalId,
    gates: &[NandGate],
    drivers: &HashMap<SignalId, usize>,
    is_leaf: impl Fn(SignalId) -> bool,
) -> Result<FaninWalk, SignalId> {
    let mut state: HashMap<SignalId, Visit> = HashMap::new();
    let mut seen_leaves: HashSet<SignalId> = HashSet::new();
    let mut leaves = Vec::new();
    let mut gate_indices = Vec::new();
    // (signal, children_already_pushed)
    let mut worklist: Vec<(SignalId, bool)> = vec![(root, false)];
    while let Some((current, expanded)) = worklist.pop() {
        if expanded {
            state.insert(current, Visit::Done);
            gate_indices.push(drivers[&current]);
            continue;
        }
        match state.get(&current) {
            Some(Visit::Done) => continue,
            // Only nodes on the current DFS path are in progress, so reaching
            // one again is a back edge.
            Some(Visit::InProgress) => return Err(current),
            None => {}
        }
        let driver = match drivers.get(&current) {
            Some(&index) if !is_leaf(current) => index,
            _ => {
                if seen_leaves.insert(current) {
                    leaves.push(current);
                }
                state.insert(current, Visit::Done);
                continue;
            }
        };
        state.insert(current, Visit::InProgress);
        let gate = &gates[driver];
        worklist.push((current, true));
        worklist.push((gate.in2, false));
        worklist.push((gate.in1, false));
    }
    Ok(FaninWalk {
        leaves,
        gate_indices,
    })
}
