// SPDX-License-Identifier: Apache-2.0

//! Simulation-based equivalence checking of two netlists with the same
//! interface.
//!
//! Signals are matched by name: primary inputs, DFF outputs (as state), and on
//! the observation side primary outputs plus each DFF's next-state value.
//! This is how an optimized netlist is checked against its original, since
//! the optimizer preserves the names of every signal it keeps.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::behavior::BehaviorRegistry;
use crate::gate_sim::{eval_combinational, GateSimError, SignalValues};
use crate::levelize::{levelize, LevelizeError, LevelizedNetlist};
use crate::netlist::Netlist;

/// Largest number of free bits (inputs plus state) `exhaustive_equivalence`
/// will enumerate.
pub const MAX_EXHAUSTIVE_BITS: usize = 20;

#[derive(Debug)]
pub enum EquivalenceError {
    Levelize(LevelizeError),
    Simulation(GateSimError),
    InterfaceMismatch(String),
    TooManyBits { bits: usize, max: usize },
    /// `observed` names the differing output or next-state bit; `assignment`
    /// is the input/state vector that exposed it.
    Counterexample {
        observed: String,
        assignment: Vec<(String, bool)>,
    },
}

impl std::fmt::Display for EquivalenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquivalenceError::Levelize(e) => write!(f, "{}", e),
            EquivalenceError::Simulation(e) => write!(f, "{}", e),
            EquivalenceError::InterfaceMismatch(msg) => write!(f, "interface mismatch: {}", msg),
            EquivalenceError::TooManyBits { bits, max } => write!(
                f,
                "{} free bits exceed the exhaustive limit of {}",
                bits, max
            ),
            EquivalenceError::Counterexample {
                observed,
                assignment,
            } => {
                let assignment: Vec<String> = assignment
                    .iter()
                    .map(|(name, v)| format!("{}={}", name, *v as u8))
                    .collect();
                write!(f, "'{}' differs under {}", observed, assignment.join(" "))
            }
        }
    }
}

impl std::error::Error for EquivalenceError {}

impl From<LevelizeError> for EquivalenceError {
    fn from(e: LevelizeError) -> Self {
        EquivalenceError::Levelize(e)
    }
}

impl From<GateSimError> for EquivalenceError {
    fn from(e: GateSimError) -> Self {
        EquivalenceError::Simulation(e)
    }
}

/// One side of the comparison, with its free and observed bits by name.
struct Side {
    levelized: LevelizedNetlist,
    input_names: Vec<String>,
    state_names: Vec<String>,
}

impl Side {
    fn new(
        netlist: &Netlist,
        behaviors: Option<&BehaviorRegistry>,
    ) -> Result<Self, EquivalenceError> {
        let mut levelized = levelize(netlist)?;
        levelized.behaviors = behaviors.cloned();
        let input_names = netlist
            .primary_inputs
            .iter()
            .map(|s| netlist.signal_name(*s))
            .collect();
        let state_names = netlist.dffs.iter().map(|d| netlist.signal_name(d.q)).collect();
        Ok(Side {
            levelized,
            input_names,
            state_names,
        })
    }

    fn run(
        &self,
        assignment: &BTreeMap<String, bool>,
    ) -> Result<BTreeMap<String, bool>, EquivalenceError> {
        let inputs: Vec<bool> = self.input_names.iter().map(|n| assignment[n]).collect();
        let state: Vec<bool> = self.state_names.iter().map(|n| assignment[n]).collect();
        let values: SignalValues = eval_combinational(&self.levelized, &inputs, &state)?;
        let netlist = &self.levelized.netlist;
        let mut observed = BTreeMap::new();
        for po in &netlist.primary_outputs {
            observed.insert(netlist.signal_name(*po), values.get(*po));
        }
        for (dff, name) in netlist.dffs.iter().zip(&self.state_names) {
            observed.insert(format!("{}.next", name), values.get(dff.d));
        }
        Ok(observed)
    }

    fn free_bits(&self) -> BTreeSet<&String> {
        self.input_names.iter().chain(&self.state_names).collect()
    }
}

fn prepare(
    lhs: &Netlist,
    rhs: &Netlist,
    behaviors: Option<&BehaviorRegistry>,
) -> Result<(Side, Side, Vec<String>), EquivalenceError> {
    let l = Side::new(lhs, behaviors)?;
    let r = Side::new(rhs, behaviors)?;
    let free: Vec<String> = {
        let (lf, rf) = (l.free_bits(), r.free_bits());
        if lf != rf {
            return Err(EquivalenceError::InterfaceMismatch(format!(
                "inputs/state present on one side only: {:?}",
                lf.symmetric_difference(&rf).collect::<Vec<_>>()
            )));
        }
        lf.into_iter().cloned().collect()
    };
    let mut lo: Vec<String> = lhs.primary_outputs.iter().map(|s| lhs.signal_name(*s)).collect();
    let mut ro: Vec<String> = rhs.primary_outputs.iter().map(|s| rhs.signal_name(*s)).collect();
    lo.sort();
    ro.sort();
    if lo != ro {
        return Err(EquivalenceError::InterfaceMismatch(format!(
            "outputs differ: {:?} vs {:?}",
            lo, ro
        )));
    }
    Ok((l, r, free))
}

fn compare(
    l: &Side,
    r: &Side,
    assignment: &BTreeMap<String, bool>,
) -> Result<(), EquivalenceError> {
    let lv = l.run(assignment)?;
    let rv = r.run(assignment)?;
    for (name, v) in &lv {
        if rv.get(name) != Some(v) {
            return Err(EquivalenceError::Counterexample {
                observed: name.clone(),
                assignment: assignment.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            });
        }
    }
    Ok(())
}

/// Compares the netlists on `samples` random input/state vectors.
pub fn random_equivalence<R: Rng>(
    lhs: &Netlist,
    rhs: &Netlist,
    behaviors: Option<&BehaviorRegistry>,
    samples: usize,
    rng: &mut R,
) -> Result<(), EquivalenceError> {
    let (l, r, free) = prepare(lhs, rhs, behaviors)?;
    for _ in 0..samples {
        let assignment: BTreeMap<String, bool> =
            free.iter().map(|n| (n.clone(), rng.gen::<bool>())).collect();
        compare(&l, &r, &assignment)?;
    }
    log::info!(
        "random_equivalence; '{}' vs '{}' agree on {} samples",
        lhs.name,
        rhs.name,
        samples
    );
    Ok(())
}

/// Compares the netlists on every input/state vector.
pub fn exhaustive_equivalence(
    lhs: &Netlist,
    rhs: &Netlist,
    behaviors: Option<&BehaviorRegistry>,
) -> Result<(), EquivalenceError> {
    let (l, r, free) = prepare(lhs, rhs, behaviors)?;
    if free.len() > MAX_EXHAUSTIVE_BITS {
        return Err(EquivalenceError::TooManyBits {
            bits: free.len(),
            max: MAX_EXHAUSTIVE_BITS,
        });
    }
    for word in 0..(1u64 << free.len()) {
        let assignment: BTreeMap<String, bool> = free
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), (word >> i) & 1 == 1))
            .collect();
        compare(&l, &r, &assignment)?;
    }
    Ok(())
}
