// SPDX-License-Identifier: Apache-2.0

//! Cone-by-cone two-level resynthesis.
//!
//! For every eligible cone the optimizer builds its truth table, minimizes it,
//! and swaps the cone's gates for the resynthesized NAND network when that is
//! estimated to save enough gates. A failure inside one cone only skips that
//! cone. The input netlist is never modified; a fresh one is returned with
//! gate ids renumbered densely from zero.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cone::{extract_cones, is_cone_optimizable, ConeError, LogicCone};
use crate::netlist::{GateId, NandGate, Netlist, NetlistError, Signal, SignalId};
use crate::qm::{quine_mccluskey_with_budget, MinimizeError};
use crate::sop2nand::{
    estimate_gate_count, sop_to_nand, IdAllocator, NandImplementation, SynthError,
};
use crate::truth_table::{build_truth_table, TruthTableError};
use crate::use_count::{get_gate_to_cone_count, get_signal_to_gate_readers};

/// Cones with fewer gates than this are never worth re-deriving.
const MIN_CONE_GATES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    pub max_cone_inputs: usize,
    pub min_savings_percent: f64,
    /// Logs per-cone decisions at info rather than debug level.
    pub verbose: bool,
    /// Wall-clock budget for the whole pass; cones not reached in time are
    /// counted as skipped.
    pub time_budget: Option<Duration>,
    /// Forwarded to `quine_mccluskey_with_budget`.
    pub max_merge_steps: Option<usize>,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        OptimizeOptions {
            max_cone_inputs: 10,
            min_savings_percent: 10.0,
            verbose: false,
            time_budget: None,
            max_merge_steps: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeStats {
    pub original_gates: usize,
    pub optimized_gates: usize,
    pub cones_extracted: usize,
    pub cones_optimized: usize,
    pub cones_skipped: usize,
    pub gates_saved: usize,
    pub optimization_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct OptimizeResult {
    pub netlist: Netlist,
    pub stats: OptimizeStats,
}

#[derive(Debug)]
pub enum OptimizeError {
    InvalidNetlist(NetlistError),
    Cone(ConeError),
}

impl std::fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizeError::InvalidNetlist(e) => write!(f, "invalid netlist: {}", e),
            OptimizeError::Cone(e) => write!(f, "cone extraction failed: {}", e),
        }
    }
}

impl std::error::Error for OptimizeError {}

impl From<NetlistError> for OptimizeError {
    fn from(e: NetlistError) -> Self {
        OptimizeError::InvalidNetlist(e)
    }
}

impl From<ConeError> for OptimizeError {
    fn from(e: ConeError) -> Self {
        OptimizeError::Cone(e)
    }
}

/// Errors local to a single cone; these are counted and swallowed.
#[derive(Debug)]
enum ConeOptimizeError {
    TruthTable(TruthTableError),
    Minimize(MinimizeError),
    Synth(SynthError),
}

impl std::fmt::Display for ConeOptimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConeOptimizeError::TruthTable(e) => write!(f, "{}", e),
            ConeOptimizeError::Minimize(e) => write!(f, "{}", e),
            ConeOptimizeError::Synth(e) => write!(f, "{}", e),
        }
    }
}

impl From<TruthTableError> for ConeOptimizeError {
    fn from(e: TruthTableError) -> Self {
        ConeOptimizeError::TruthTable(e)
    }
}

impl From<MinimizeError> for ConeOptimizeError {
    fn from(e: MinimizeError) -> Self {
        ConeOptimizeError::Minimize(e)
    }
}

impl From<SynthError> for ConeOptimizeError {
    fn from(e: SynthError) -> Self {
        ConeOptimizeError::Synth(e)
    }
}

enum ConeDecision {
    Accept(NandImplementation),
    Reject(String),
}

/// Runs truth table -> QM -> synthesis for one cone. Ids are drawn from a copy
/// of `alloc` that the caller only commits on acceptance.
fn optimize_cone(
    cone: &LogicCone,
    options: &OptimizeOptions,
    alloc: &mut IdAllocator,
) -> Result<ConeDecision, ConeOptimizeError> {
    let table = build_truth_table(cone)?;
    let function = quine_mccluskey_with_budget(&table, options.max_merge_steps)?;
    let original = cone.gates.len();
    let estimated = estimate_gate_count(&function);
    let savings_percent = (original as f64 - estimated as f64) / original as f64 * 100.0;
    if savings_percent < options.min_savings_percent {
        return Ok(ConeDecision::Reject(format!(
            "estimated {} gates vs {} original ({:.1}% savings)",
            estimated, original, savings_percent
        )));
    }
    let implementation =
        sop_to_nand(&function, &table.input_signals, cone.output, alloc, original)?;
    if implementation.gate_count() >= original {
        return Ok(ConeDecision::Reject(format!(
            "synthesized {} gates vs {} original",
            implementation.gate_count(),
            original
        )));
    }
    Ok(ConeDecision::Accept(implementation))
}

/// True if some interior signal of `cone` is read by a gate outside it (e.g.
/// dead logic that belongs to no cone).
fn has_outside_readers(
    cone: &LogicCone,
    netlist: &Netlist,
    readers: &HashMap<SignalId, Vec<usize>>,
) -> bool {
    let members: HashSet<SignalId> = cone.gates.iter().map(|g| g.out).collect();
    cone.gates
        .iter()
        .filter(|g| g.out != cone.output)
        .flat_map(|g| readers.get(&g.out).into_iter().flatten())
        .any(|&i| !members.contains(&netlist.nand_gates[i].out))
}

pub fn optimize(
    netlist: &Netlist,
    options: &OptimizeOptions,
) -> Result<OptimizeResult, OptimizeError> {
    let start = Instant::now();
    netlist.validate()?;
    let cones = extract_cones(netlist)?;
    let gate_to_cone_count = get_gate_to_cone_count(&cones);
    let readers = get_signal_to_gate_readers(netlist);

    let mut stats = OptimizeStats {
        original_gates: netlist.gate_count(),
        cones_extracted: cones.len(),
        ..Default::default()
    };
    let mut alloc = IdAllocator::for_netlist(netlist);
    let mut replaced: HashSet<SignalId> = HashSet::new();
    let mut interior: HashSet<SignalId> = HashSet::new();
    let mut new_gates: Vec<NandGate> = Vec::new();
    let mut temp_signals: Vec<SignalId> = Vec::new();
    let mut out_of_time = false;

    let report = |msg: String| {
        if options.verbose {
            log::info!("{}", msg);
        } else {
            log::debug!("{}", msg);
        }
    };

    for cone in &cones {
        let name = netlist.signal_name(cone.output);
        if !out_of_time {
            if let Some(budget) = options.time_budget {
                if start.elapsed() >= budget {
                    log::warn!(
                        "optimize; time budget of {:?} exhausted, skipping remaining cones",
                        budget
                    );
                    out_of_time = true;
                }
            }
        }
        if out_of_time {
            stats.cones_skipped += 1;
            continue;
        }
        if !is_cone_optimizable(cone, options.max_cone_inputs)
            || cone.gates.len() < MIN_CONE_GATES
        {
            stats.cones_skipped += 1;
            continue;
        }
        if cone
            .gates
            .iter()
            .any(|g| gate_to_cone_count.get(&g.out).copied().unwrap_or(0) > 1)
            || has_outside_readers(cone, netlist, &readers)
        {
            report(format!("optimize; cone '{}' shares gates, skipping", name));
            stats.cones_skipped += 1;
            continue;
        }

        let mut trial_alloc = alloc;
        match optimize_cone(cone, options, &mut trial_alloc) {
            Ok(ConeDecision::Accept(implementation)) => {
                report(format!(
                    "optimize; cone '{}' rewritten: {} -> {} gates",
                    name,
                    cone.gates.len(),
                    implementation.gate_count()
                ));
                alloc = trial_alloc;
                stats.cones_optimized += 1;
                stats.gates_saved += cone.gates.len() - implementation.gate_count();
                for g in &cone.gates {
                    replaced.insert(g.out);
                    if g.out != cone.output {
                        interior.insert(g.out);
                    }
                }
                new_gates.extend(implementation.gates);
                temp_signals.extend(implementation.temp_signals);
            }
            Ok(ConeDecision::Reject(why)) => {
                report(format!("optimize; cone '{}' kept: {}", name, why));
                stats.cones_skipped += 1;
            }
            Err(e) => {
                report(format!("optimize; cone '{}' failed: {}", name, e));
                stats.cones_skipped += 1;
            }
        }
    }

    let optimized = rebuild(netlist, &replaced, &interior, new_gates, &temp_signals);
    stats.optimized_gates = optimized.gate_count();
    stats.optimization_time_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "optimize; '{}': {} -> {} gates, {}/{} cones rewritten",
        netlist.name,
        stats.original_gates,
        stats.optimized_gates,
        stats.cones_optimized,
        stats.cones_extracted
    );
    Ok(OptimizeResult {
        netlist: optimized,
        stats,
    })
}

/// Builds the output netlist: retained gates followed by synthesized ones,
/// renumbered densely, with orphaned interior signals dropped and temp signals
/// registered.
fn rebuild(
    netlist: &Netlist,
    replaced: &HashSet<SignalId>,
    interior: &HashSet<SignalId>,
    new_gates: Vec<NandGate>,
    temp_signals: &[SignalId],
) -> Netlist {
    let nand_gates: Vec<NandGate> = netlist
        .nand_gates
        .iter()
        .filter(|g| !replaced.contains(&g.out))
        .cloned()
        .chain(new_gates)
        .enumerate()
        .map(|(i, g)| NandGate {
            id: GateId(i),
            level: None,
            ..g
        })
        .collect();

    let mut referenced: HashSet<SignalId> = HashSet::new();
    for g in &nand_gates {
        referenced.extend([g.in1, g.in2, g.out]);
    }
    for dff in &netlist.dffs {
        referenced.extend([dff.d, dff.clk, dff.q]);
    }
    for i in &netlist.intrinsics {
        for p in i.inputs.iter().chain(i.outputs.iter()) {
            referenced.extend(p.signals.iter().copied());
        }
    }
    for m in &netlist.behavioral_modules {
        referenced.extend(m.flattened_inputs());
        referenced.extend(m.flattened_outputs());
    }
    referenced.extend(netlist.primary_inputs.iter().copied());
    referenced.extend(netlist.primary_outputs.iter().copied());
    referenced.extend(netlist.clock_signal);

    let mut signals: Vec<Signal> = netlist
        .signals
        .iter()
        .filter(|s| !interior.contains(&s.id) || referenced.contains(&s.id))
        .cloned()
        .collect();
    signals.extend(
        temp_signals
            .iter()
            .map(|id| Signal::new(*id, format!("_qm_t{}", id.0))),
    );

    let mut result = Netlist {
        name: netlist.name.clone(),
        signals,
        nand_gates,
        dffs: netlist.dffs.clone(),
        intrinsics: netlist.intrinsics.clone(),
        behavioral_modules: netlist.behavioral_modules.clone(),
        primary_inputs: netlist.primary_inputs.clone(),
        primary_outputs: netlist.primary_outputs.clone(),
        clock_signal: netlist.clock_signal,
        signal_map: Default::default(),
    };
    result.rebuild_signal_map();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::builder::NetlistBuilder;
    use pretty_assertions::assert_eq;

    fn eval_outputs(n: &Netlist, assignment: u32) -> Vec<bool> {
        let mut values: HashMap<SignalId, bool> = n
            .primary_inputs
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, (assignment >> i) & 1 == 1))
            .collect();
        // Gates are emitted in dependency order by the builder and the
        // optimizer appends whole cones in topological order, but a rewritten
        // cone may be read by a retained gate, so iterate to a fixed point.
        for _ in 0..n.nand_gates.len() {
            for g in &n.nand_gates {
                if let (Some(a), Some(b)) = (values.get(&g.in1), values.get(&g.in2)) {
                    let v = NandGate::eval(*a, *b);
                    values.insert(g.out, v);
                }
            }
        }
        n.primary_outputs.iter().map(|s| values[s]).collect()
    }

    #[test]
    fn test_two_gate_and_is_rejected() {
        let mut b = NetlistBuilder::new("and2");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let y = b.add_and(a, c);
        b.add_output("y", y);
        let n = b.build();
        let result = optimize(&n, &OptimizeOptions::default()).unwrap();
        assert_eq!(result.stats.cones_extracted, 1);
        assert_eq!(result.stats.cones_optimized, 0);
        assert_eq!(result.stats.cones_skipped, 1);
        assert_eq!(result.netlist.nand_gates, n.nand_gates);
    }

    #[test]
    fn test_redundant_logic_collapses() {
        // y = (a & b) | (a & !b) == a
        let mut b = NetlistBuilder::new("redundant");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let ab = b.add_and(a, c);
        let nc = b.add_not(c);
        let anb = b.add_and(a, nc);
        let y = b.add_or(ab, anb);
        b.add_output("y", y);
        let n = b.build();
        assert_eq!(n.gate_count(), 8);

        let result = optimize(&n, &OptimizeOptions::default()).unwrap();
        assert_eq!(result.stats.cones_optimized, 1);
        assert_eq!(result.stats.optimized_gates, 2);
        assert_eq!(result.stats.gates_saved, 6);
        let out = &result.netlist;
        assert!(out.validate().is_ok());
        assert_eq!(out.signal_by_name("y"), Some(y));
        for (i, g) in out.nand_gates.iter().enumerate() {
            assert_eq!(g.id, GateId(i));
        }
        // Interior signals are gone, temps are registered.
        assert!(out.signal(ab).is_none());
        assert!(out.signals.iter().any(|s| s.name.starts_with("_qm_t")));
        for assignment in 0..4 {
            assert_eq!(eval_outputs(out, assignment), eval_outputs(&n, assignment));
        }
    }

    #[test]
    fn test_shared_cones_are_skipped() {
        let mut b = NetlistBuilder::new("shared");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let ab = b.add_and(a, c);
        let nc = b.add_not(c);
        let anb = b.add_and(a, nc);
        let y = b.add_or(ab, anb);
        b.add_output("y", y);
        // A second output also reads `ab`, so the first cone cannot be
        // rewritten without duplicating it.
        let z = b.add_not(ab);
        b.add_output("z", z);
        let n = b.build();
        let result = optimize(&n, &OptimizeOptions::default()).unwrap();
        assert_eq!(result.stats.cones_optimized, 0);
        assert_eq!(result.netlist.gate_count(), n.gate_count());
    }

    #[test]
    fn test_gate_driven_clock_keeps_its_driver() {
        // Same redundant OR as above, but the inner NAND(a, b) also clocks a
        // DFF.
        let mut b = NetlistBuilder::new("gated_clock");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let gclk = b.add_nand(a, c);
        let ab = b.add_not(gclk);
        let nc = b.add_not(c);
        let anb = b.add_and(a, nc);
        let y = b.add_or(ab, anb);
        b.add_output("y", y);
        b.add_dff("q", a, gclk, false);
        let n = b.build();

        let result = optimize(&n, &OptimizeOptions::default()).unwrap();
        assert_eq!(result.stats.cones_optimized, 0);
        let out = &result.netlist;
        assert!(out.validate().is_ok());
        assert!(out.driver_map().contains_key(&gclk));
        assert_eq!(out.gate_count(), n.gate_count());
    }

    #[test]
    fn test_synthesis_no_smaller_than_original_is_rejected() {
        // y = !(a nand !a) is constant 0: the estimate is 0 gates, but the
        // synthesized constant needs 3.
        let mut b = NetlistBuilder::new("const0");
        let a = b.add_input("a");
        let na = b.add_not(a);
        let one = b.add_nand(a, na);
        let y = b.add_not(one);
        b.add_output("y", y);
        let n = b.build();

        let result = optimize(&n, &OptimizeOptions::default()).unwrap();
        assert_eq!(result.stats.cones_extracted, 1);
        assert_eq!(result.stats.cones_optimized, 0);
        assert_eq!(result.stats.cones_skipped, 1);
        assert_eq!(result.stats.optimized_gates, 3);
        assert_eq!(result.netlist.nand_gates, n.nand_gates);
    }

    #[test]
    fn test_too_many_inputs_is_skipped() {
        let mut b = NetlistBuilder::new("wide");
        let ins = b.add_input_bus("x", 4);
        let mut acc = b.add_and(ins[0], ins[1]);
        acc = b.add_and(acc, ins[2]);
        acc = b.add_and(acc, ins[3]);
        b.add_output("y", acc);
        let n = b.build();
        let options = OptimizeOptions {
            max_cone_inputs: 3,
            ..Default::default()
        };
        let result = optimize(&n, &options).unwrap();
        assert_eq!(result.stats.cones_skipped, 1);
        assert_eq!(result.stats.cones_optimized, 0);
    }

    #[test]
    fn test_merge_budget_failure_is_local() {
        let mut b = NetlistBuilder::new("budget");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let ab = b.add_and(a, c);
        let nc = b.add_not(c);
        let anb = b.add_and(a, nc);
        let y = b.add_or(ab, anb);
        b.add_output("y", y);
        let n = b.build();
        let options = OptimizeOptions {
            max_merge_steps: Some(0),
            ..Default::default()
        };
        let result = optimize(&n, &options).unwrap();
        assert_eq!(result.stats.cones_skipped, 1);
        assert_eq!(result.netlist.gate_count(), 8);
    }

    #[test]
    fn test_zero_time_budget_skips_everything() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let c = b.add_input("b");
        let y = b.add_xor(a, c);
        b.add_output("y", y);
        let n = b.build();
        let options = OptimizeOptions {
            time_budget: Some(Duration::ZERO),
            ..Default::default()
        };
        let result = optimize(&n, &options).unwrap();
        assert_eq!(result.stats.cones_skipped, result.stats.cones_extracted);
    }

    #[test]
    fn test_loop_aborts_the_run() {
        let mut b = NetlistBuilder::new("loop");
        let a = b.add_input("a");
        let w1 = b.add_wire("w1");
        let w2 = b.add_wire("w2");
        b.add_nand_to(a, w2, w1);
        b.add_nand_to(w1, a, w2);
        b.add_output("y", w1);
        let n = b.build();
        assert!(matches!(
            optimize(&n, &OptimizeOptions::default()),
            Err(OptimizeError::Cone(ConeError::CombinationalLoop { .. }))
        ));
    }

    #[test]
    fn test_stats_serialize() {
        let stats = OptimizeStats {
            original_gates: 8,
            optimized_gates: 2,
            cones_extracted: 1,
            cones_optimized: 1,
            cones_skipped: 0,
            gates_saved: 6,
            optimization_time_ms: 0,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"gates_saved\":6"));
    }
}
