// SPDX-License-Identifier: Apache-2.0

//! Constant propagation over the NAND gates of a netlist.
//!
//! Starting from the constant marker signals, a gate is folded when
//! `NAND(0, x) = 1` or `NAND(1, 1) = 0` applies. Readers of a folded signal
//! are rewired to the matching marker. A surviving gate with one constant-1
//! input is rewritten as an inverter of its other input. Primary outputs keep
//! their identity: a folded output is re-driven by a NAND of the opposite
//! constant.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::netlist::{GateId, NandGate, Netlist, NetlistError, Signal, SignalId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifyStats {
    pub gates_folded: usize,
    pub inverters_rewritten: usize,
    pub outputs_tied: usize,
}

/// Finds an existing marker signal for `value` or appends a fresh `const_*`
/// one. The flag is true when the marker was created here.
fn marker_signal(signals: &mut Vec<Signal>, value: bool, next_id: &mut usize) -> (SignalId, bool) {
    if let Some(s) = signals.iter().find(|s| s.constant_value() == Some(value)) {
        return (s.id, false);
    }
    let id = SignalId(*next_id);
    *next_id += 1;
    let name = if value { "const_1" } else { "const_0" };
    signals.push(Signal::new(id, name));
    (id, true)
}

/// Values of every signal that is constant by propagation from the markers.
fn propagate_constants(netlist: &Netlist) -> HashMap<SignalId, bool> {
    let mut known: HashMap<SignalId, bool> = netlist
        .signals
        .iter()
        .filter_map(|s| s.constant_value().map(|v| (s.id, v)))
        .collect();
    loop {
        let mut changed = false;
        for gate in &netlist.nand_gates {
            if known.contains_key(&gate.out) {
                continue;
            }
            let a = known.get(&gate.in1).copied();
            let b = known.get(&gate.in2).copied();
            let folded = match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(true),
                (Some(true), Some(true)) => Some(false),
                _ => None,
            };
            if let Some(v) = folded {
                known.insert(gate.out, v);
                changed = true;
            }
        }
        if !changed {
            return known;
        }
    }
}

pub fn simplify(netlist: &Netlist) -> Result<(Netlist, SimplifyStats), NetlistError> {
    netlist.validate()?;
    let known = propagate_constants(netlist);
    let folded: HashSet<SignalId> = netlist
        .nand_gates
        .iter()
        .map(|g| g.out)
        .filter(|s| known.contains_key(s))
        .collect();

    let mut stats = SimplifyStats {
        gates_folded: folded.len(),
        ..Default::default()
    };
    if folded.is_empty() && !netlist.nand_gates.iter().any(|g| {
        known.get(&g.in1) == Some(&true) || known.get(&g.in2) == Some(&true)
    }) {
        return Ok((netlist.clone(), stats));
    }

    let mut signals = netlist.signals.clone();
    let mut next_id = netlist.next_signal_id();
    let (const0, fresh0) = marker_signal(&mut signals, false, &mut next_id);
    let (const1, fresh1) = marker_signal(&mut signals, true, &mut next_id);
    let mut removable = folded.clone();
    if fresh0 {
        removable.insert(const0);
    }
    if fresh1 {
        removable.insert(const1);
    }
    let marker_for = |v: bool| if v { const1 } else { const0 };
    let rewire = |s: SignalId| -> SignalId {
        if folded.contains(&s) {
            marker_for(known[&s])
        } else {
            s
        }
    };

    let outputs: HashSet<SignalId> = netlist.primary_outputs.iter().copied().collect();
    let mut gates: Vec<NandGate> = Vec::new();
    for gate in &netlist.nand_gates {
        if folded.contains(&gate.out) {
            if outputs.contains(&gate.out) {
                let tie = marker_for(!known[&gate.out]);
                gates.push(NandGate::new(gate.id, tie, tie, gate.out));
                stats.outputs_tied += 1;
            }
            continue;
        }
        let (mut in1, mut in2) = (rewire(gate.in1), rewire(gate.in2));
        if known.get(&gate.in1) == Some(&true) {
            in1 = in2;
            stats.inverters_rewritten += 1;
        } else if known.get(&gate.in2) == Some(&true) {
            in2 = in1;
            stats.inverters_rewritten += 1;
        }
        gates.push(NandGate {
            in1,
            in2,
            level: None,
            ..gate.clone()
        });
    }
    for (i, g) in gates.iter_mut().enumerate() {
        g.id = GateId(i);
    }

    let mut dffs = netlist.dffs.clone();
    for dff in dffs.iter_mut() {
        dff.d = rewire(dff.d);
    }
    let mut intrinsics = netlist.intrinsics.clone();
    for port in intrinsics.iter_mut().flat_map(|i| i.inputs.iter_mut()) {
        for s in port.signals.iter_mut() {
            *s = rewire(*s);
        }
    }
    let mut behavioral_modules = netlist.behavioral_modules.clone();
    for port in behavioral_modules.iter_mut().flat_map(|m| m.inputs.iter_mut()) {
        for s in port.signals.iter_mut() {
            *s = rewire(*s);
        }
    }

    // Folded signals and unused new markers go away.
    let mut referenced: HashSet<SignalId> = outputs.clone();
    for g in &gates {
        referenced.extend([g.in1, g.in2, g.out]);
    }
    referenced.extend(dffs.iter().map(|d| d.d));
    for port in intrinsics.iter().flat_map(|i| i.inputs.iter()) {
        referenced.extend(port.signals.iter().copied());
    }
    for port in behavioral_modules.iter().flat_map(|m| m.inputs.iter()) {
        referenced.extend(port.signals.iter().copied());
    }
    signals.retain(|s| !removable.contains(&s.id) || referenced.contains(&s.id));

    let mut result = Netlist {
        name: netlist.name.clone(),
        signals,
        nand_gates: gates,
        dffs,
        intrinsics,
        behavioral_modules,
        primary_inputs: netlist.primary_inputs.clone(),
        primary_outputs: netlist.primary_outputs.clone(),
        clock_signal: netlist.clock_signal,
        signal_map: Default::default(),
    };
    result.rebuild_signal_map();
    log::info!(
        "simplify; '{}': folded {} gates, rewrote {} inverters, tied {} outputs",
        netlist.name,
        stats.gates_folded,
        stats.inverters_rewritten,
        stats.outputs_tied
    );
    Ok((result, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::builder::NetlistBuilder;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_constants_is_identity() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let c = b.add_input("c");
        let y = b.add_and(a, c);
        b.add_output("y", y);
        let n = b.build();
        let (out, stats) = simplify(&n).unwrap();
        assert_eq!(out, n);
        assert_eq!(stats, SimplifyStats::default());
    }

    #[test]
    fn test_and_with_zero_folds_and_ties_output() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let zero = b.add_const(false);
        let n0 = b.add_nand(a, zero); // 1
        let y = b.add_not(n0); // 0
        b.add_output("y", y);
        let n = b.build();
        let (out, stats) = simplify(&n).unwrap();
        assert_eq!(stats.gates_folded, 2);
        assert_eq!(stats.outputs_tied, 1);
        assert_eq!(out.nand_gates.len(), 1);
        let one = out.signal_by_name("const_1").unwrap();
        assert_eq!(out.nand_gates[0], NandGate::new(GateId(0), one, one, y));
        assert!(out.signal(n0).is_none());
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_nand_with_one_becomes_inverter() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let one = b.add_const(true);
        let y = b.add_nand(a, one);
        b.add_output("y", y);
        let n = b.build();
        let (out, stats) = simplify(&n).unwrap();
        assert_eq!(stats.gates_folded, 0);
        assert_eq!(stats.inverters_rewritten, 1);
        assert_eq!(out.nand_gates[0].in1, a);
        assert_eq!(out.nand_gates[0].in2, a);
        assert!(out.signal_by_name("const_0").is_none());
    }

    #[test]
    fn test_dff_input_is_rewired_to_marker() {
        let mut b = NetlistBuilder::new("t");
        let clk = b.add_clock("clk");
        let vcc = b.add_const(true);
        let d = b.add_not(vcc); // constant 0
        b.add_dff("q", d, clk, false);
        let n = b.build();
        let (out, stats) = simplify(&n).unwrap();
        assert_eq!(stats.gates_folded, 1);
        assert!(out.nand_gates.is_empty());
        let zero = out.signal_by_name("const_0").unwrap();
        assert_eq!(out.dffs[0].d, zero);
    }
}
