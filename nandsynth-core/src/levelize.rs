// SPDX-License-Identifier: Apache-2.0

//! Scheduling of gates and behavioral modules into simulation levels.
//!
//! Level 0 holds every signal whose value is known at the start of a settle:
//! primary inputs, DFF outputs, constants, intrinsic outputs and undriven
//! wires. A NAND output sits one level above the deeper of its inputs; all
//! outputs of a behavioral module sit one level above the deepest of the
//! module's inputs. Levels are found by fixed-point relaxation. If relaxation
//! stops with signals still unassigned the netlist has a combinational loop.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::behavior::{compile_all, BehaviorError, BehaviorRegistry, BehavioralProgram};
use crate::loops::detect_loops;
use crate::netlist::{NandGate, Netlist, NetlistError, SignalId};

/// Extra relaxation rounds allowed beyond one per gate/behavioral output.
const ITERATION_MARGIN: usize = 10;

/// Bits per word of the packed simulation signal buffer.
pub const SIGNAL_BUFFER_WORD_BITS: usize = 32;

#[derive(Debug, Clone)]
pub struct LevelizedNetlist<A = ()> {
    /// Copy of the input with every gate's `level` set.
    pub netlist: Netlist,
    /// `levels[l]` holds the gates at level `l`, in netlist order. Level 0 is
    /// always empty since every gate has at least one input at level >= 0.
    pub levels: Vec<Vec<NandGate>>,
    /// `behavioral_levels[l]` holds indices into
    /// `netlist.behavioral_modules`; same length as `levels`.
    pub behavioral_levels: Vec<Vec<usize>>,
    pub signal_levels: BTreeMap<SignalId, u32>,
    pub max_level: u32,
    /// Number of 32-bit words needed to hold one bit per signal slot.
    pub signal_buffer_size: usize,
    pub behaviors: Option<BehaviorRegistry>,
    pub module_asts: Option<BTreeMap<String, A>>,
}

impl<A> LevelizedNetlist<A> {
    pub fn gate_count_at(&self, level: u32) -> usize {
        self.levels.get(level as usize).map_or(0, Vec::len)
    }
}

#[derive(Debug)]
pub enum LevelizeError {
    InvalidNetlist(NetlistError),
    /// `unresolved` are the signals that never received a level; `loops` is
    /// the SCC diagnosis from `detect_loops`.
    CombinationalLoop {
        unresolved: Vec<SignalId>,
        loops: Vec<Vec<SignalId>>,
    },
    Behavior(BehaviorError),
}

impl std::fmt::Display for LevelizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelizeError::InvalidNetlist(e) => write!(f, "invalid netlist: {}", e),
            LevelizeError::CombinationalLoop { unresolved, loops } => write!(
                f,
                "combinational loop: {} signals could not be levelized ({} loops found)",
                unresolved.len(),
                loops.len()
            ),
            LevelizeError::Behavior(e) => write!(f, "behavioral compilation failed: {}", e),
        }
    }
}

impl std::error::Error for LevelizeError {}

impl From<NetlistError> for LevelizeError {
    fn from(e: NetlistError) -> Self {
        LevelizeError::InvalidNetlist(e)
    }
}

impl From<BehaviorError> for LevelizeError {
    fn from(e: BehaviorError) -> Self {
        LevelizeError::Behavior(e)
    }
}

fn level_zero_seeds(netlist: &Netlist) -> HashMap<SignalId, u32> {
    let mut levels: HashMap<SignalId, u32> = HashMap::new();
    for s in &netlist.signals {
        if s.is_primary_input || s.is_dff_output || s.constant_value().is_some() {
            levels.insert(s.id, 0);
        }
    }
    for dff in &netlist.dffs {
        levels.insert(dff.q, 0);
    }
    for intrinsic in &netlist.intrinsics {
        for port in &intrinsic.outputs {
            for s in &port.signals {
                levels.insert(*s, 0);
            }
        }
    }
    levels.extend(netlist.clock_signal.map(|c| (c, 0)));

    let mut driven: HashSet<SignalId> = netlist.nand_gates.iter().map(|g| g.out).collect();
    for m in &netlist.behavioral_modules {
        driven.extend(m.flattened_outputs());
    }
    let undriven: Vec<SignalId> = netlist
        .signals
        .iter()
        .map(|s| s.id)
        .filter(|id| !driven.contains(id) && !levels.contains_key(id))
        .collect();
    if !undriven.is_empty() {
        log::warn!(
            "levelize; '{}' has {} undriven signals, treating them as level 0 (first: '{}')",
            netlist.name,
            undriven.len(),
            netlist.signal_name(undriven[0])
        );
    }
    levels.extend(undriven.into_iter().map(|id| (id, 0)));
    levels
}

fn max_known_level(levels: &HashMap<SignalId, u32>, inputs: &[SignalId]) -> Option<u32> {
    inputs
        .iter()
        .try_fold(0u32, |acc, s| levels.get(s).map(|l| acc.max(*l)))
}

/// Levelizes a netlist that has no behavioral program attached.
pub fn levelize(netlist: &Netlist) -> Result<LevelizedNetlist, LevelizeError> {
    levelize_structure(netlist)
}

/// Levelizes `netlist` and, when `program` is given, compiles all of its
/// behaviors into a registry attached to the result along with the module
/// ASTs. Every behavioral instance must name a compiled module.
pub fn levelize_with_program<P: BehavioralProgram>(
    netlist: &Netlist,
    program: Option<&P>,
) -> Result<LevelizedNetlist<P::ModuleAst>, LevelizeError> {
    let mut result = levelize_structure::<P::ModuleAst>(netlist)?;
    if let Some(program) = program {
        let registry = compile_all(program)?;
        if let Some(missing) = netlist
            .behavioral_modules
            .iter()
            .find(|m| !registry.contains(&m.module_name))
        {
            return Err(BehaviorError::UnknownModule(missing.module_name.clone()).into());
        }
        result.behaviors = Some(registry);
        result.module_asts = Some(program.modules().into_iter().collect());
    }
    Ok(result)
}

fn levelize_structure<A>(netlist: &Netlist) -> Result<LevelizedNetlist<A>, LevelizeError> {
    netlist.validate()?;
    let mut levels = level_zero_seeds(netlist);

    let module_inputs: Vec<Vec<SignalId>> = netlist
        .behavioral_modules
        .iter()
        .map(|m| m.flattened_inputs())
        .collect();
    let mut module_level: Vec<Option<u32>> = vec![None; netlist.behavioral_modules.len()];
    let behavioral_outputs: usize = netlist
        .behavioral_modules
        .iter()
        .map(|m| m.flattened_outputs().len())
        .sum();

    let budget = netlist.nand_gates.len() + behavioral_outputs + ITERATION_MARGIN;
    let mut iterations = 0usize;
    let mut exhausted = false;
    loop {
        let mut changed = false;
        for gate in &netlist.nand_gates {
            if levels.contains_key(&gate.out) {
                continue;
            }
            if let (Some(a), Some(b)) = (levels.get(&gate.in1), levels.get(&gate.in2)) {
                let level = a.max(b) + 1;
                levels.insert(gate.out, level);
                changed = true;
            }
        }
        for (i, module) in netlist.behavioral_modules.iter().enumerate() {
            if module_level[i].is_some() {
                continue;
            }
            if let Some(deepest) = max_known_level(&levels, &module_inputs[i]) {
                let level = deepest + 1;
                module_level[i] = Some(level);
                for s in module.flattened_outputs() {
                    levels.insert(s, level);
                }
                changed = true;
            }
        }
        if !changed {
            break;
        }
        iterations += 1;
        if iterations > budget {
            exhausted = true;
            break;
        }
    }

    let mut unresolved: Vec<SignalId> = netlist
        .nand_gates
        .iter()
        .map(|g| g.out)
        .chain(
            netlist
                .behavioral_modules
                .iter()
                .flat_map(|m| m.flattened_outputs()),
        )
        .filter(|s| !levels.contains_key(s))
        .collect();
    if exhausted || !unresolved.is_empty() {
        unresolved.sort();
        unresolved.dedup();
        let loops = detect_loops(netlist);
        log::error!(
            "levelize; '{}' has a combinational loop: {} unresolved signals, {} SCCs",
            netlist.name,
            unresolved.len(),
            loops.len()
        );
        return Err(LevelizeError::CombinationalLoop { unresolved, loops });
    }

    let max_level = netlist
        .nand_gates
        .iter()
        .map(|g| levels[&g.out])
        .chain(module_level.iter().flatten().copied())
        .max()
        .unwrap_or(0);

    let mut gate_levels: Vec<Vec<NandGate>> = vec![Vec::new(); max_level as usize + 1];
    let mut leveled = netlist.clone();
    for gate in leveled.nand_gates.iter_mut() {
        let level = levels[&gate.out];
        gate.level = Some(level);
        gate_levels[level as usize].push(gate.clone());
    }
    let mut behavioral_levels: Vec<Vec<usize>> = vec![Vec::new(); max_level as usize + 1];
    for (i, level) in module_level.iter().enumerate() {
        if let Some(level) = level {
            behavioral_levels[*level as usize].push(i);
        }
    }

    let signal_buffer_size = netlist.signal_slots().div_ceil(SIGNAL_BUFFER_WORD_BITS);
    log::info!(
        "levelize; '{}': {} gates over {} levels, signal buffer {} words",
        netlist.name,
        netlist.nand_gates.len(),
        max_level,
        signal_buffer_size
    );
    Ok(LevelizedNetlist {
        netlist: leveled,
        levels: gate_levels,
        behavioral_levels,
        signal_levels: levels.into_iter().collect(),
        max_level,
        signal_buffer_size,
        behaviors: None,
        module_asts: None,
    })
}
