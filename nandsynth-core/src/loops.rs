// SPDX-License-Identifier: Apache-2.0

//! Combinational loop diagnosis via strongly connected components.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::netlist::{Netlist, SignalId};

/// Builds the signal dependency graph: `in1 -> out` and `in2 -> out` for
/// every NAND gate, and `input -> output` for every bit pair of every
/// behavioral module. DFFs and intrinsics contribute no edges.
fn build_dependency_graph(netlist: &Netlist) -> DiGraph<SignalId, ()> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<SignalId, NodeIndex> = HashMap::new();
    let mut node_for = |graph: &mut DiGraph<SignalId, ()>, s: SignalId| {
        *nodes.entry(s).or_insert_with(|| graph.add_node(s))
    };
    for gate in &netlist.nand_gates {
        let out = node_for(&mut graph, gate.out);
        for input in [gate.in1, gate.in2] {
            let from = node_for(&mut graph, input);
            graph.update_edge(from, out, ());
        }
    }
    for module in &netlist.behavioral_modules {
        let inputs = module.flattened_inputs();
        for output in module.flattened_outputs() {
            let to = node_for(&mut graph, output);
            for input in &inputs {
                let from = node_for(&mut graph, *input);
                graph.update_edge(from, to, ());
            }
        }
    }
    graph
}

/// Returns every combinational loop as a sorted list of the signals on it.
/// Multi-signal SCCs are loops, as is a signal that feeds its own driver.
/// The outer list is sorted too, so output is deterministic.
pub fn detect_loops(netlist: &Netlist) -> Vec<Vec<SignalId>> {
    let graph = build_dependency_graph(netlist);
    let mut loops: Vec<Vec<SignalId>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut members: Vec<SignalId> = scc.into_iter().map(|n| graph[n]).collect();
            members.sort();
            members
        })
        .collect();
    loops.sort();
    if !loops.is_empty() {
        log::debug!(
            "detect_loops; '{}' has {} combinational loops",
            netlist.name,
            loops.len()
        );
    }
    loops
}
