// SPDX-License-Identifier: Apache-2.0

//! Brute-force enumeration of a cone's Boolean function.

use std::collections::HashMap;

use bitvec::vec::BitVec;

use crate::cone::LogicCone;
use crate::netlist::{NandGate, SignalId};

/// Above this many inputs the `2^k` enumeration is refused outright.
pub const MAX_TRUTH_TABLE_INPUTS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthTable {
    pub num_inputs: usize,
    /// Bit `i` of an assignment is the value of `input_signals[i]`.
    pub input_signals: Vec<SignalId>,
    pub output_signal: SignalId,
    /// Assignments producing 1, ascending.
    pub minterms: Vec<u32>,
    /// Never populated by `build_truth_table`; kept for callers that know
    /// some assignments are unreachable.
    pub dont_cares: Vec<u32>,
}

impl TruthTable {
    pub fn evaluate(&self, assignment: u32) -> bool {
        self.minterms.binary_search(&assignment).is_ok()
    }

    pub fn assignment_count(&self) -> u64 {
        1u64 << self.num_inputs
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TruthTableError {
    TooManyInputs { inputs: usize, max: usize },
    UnresolvedSignal { signal: SignalId },
}

impl std::fmt::Display for TruthTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TruthTableError::TooManyInputs { inputs, max } => write!(
                f,
                "cone has {} inputs; truth tables are limited to {}",
                inputs, max
            ),
            TruthTableError::UnresolvedSignal { signal } => write!(
                f,
                "signal {} is neither a cone input nor produced by an earlier gate",
                signal
            ),
        }
    }
}

impl std::error::Error for TruthTableError {}

/// Gate operands resolved to dense slot indices: inputs occupy slots
/// `0..k`, gate `j`'s output occupies slot `k + j`.
struct SlotProgram {
    operands: Vec<(usize, usize)>,
    output_slot: Option<usize>,
}

fn compile_slots(cone: &LogicCone) -> Result<SlotProgram, TruthTableError> {
    let k = cone.inputs.len();
    let mut slot_of: HashMap<SignalId, usize> = cone
        .inputs
        .iter()
        .enumerate()
        .map(|(i, s)| (*s, i))
        .collect();
    let mut operands = Vec::with_capacity(cone.gates.len());
    let lookup = |slot_of: &HashMap<SignalId, usize>, s: SignalId| {
        slot_of
            .get(&s)
            .copied()
            .ok_or(TruthTableError::UnresolvedSignal { signal: s })
    };
    for (j, gate) in cone.gates.iter().enumerate() {
        let NandGate { in1, in2, out, .. } = gate;
        operands.push((lookup(&slot_of, *in1)?, lookup(&slot_of, *in2)?));
        slot_of.insert(*out, k + j);
    }
    Ok(SlotProgram {
        operands,
        output_slot: slot_of.get(&cone.output).copied(),
    })
}

pub fn build_truth_table(cone: &LogicCone) -> Result<TruthTable, TruthTableError> {
    let k = cone.inputs.len();
    if k > MAX_TRUTH_TABLE_INPUTS {
        return Err(TruthTableError::TooManyInputs {
            inputs: k,
            max: MAX_TRUTH_TABLE_INPUTS,
        });
    }
    let program = compile_slots(cone)?;
    let output_slot = program
        .output_slot
        .ok_or(TruthTableError::UnresolvedSignal {
            signal: cone.output,
        })?;

    let mut values: BitVec = BitVec::repeat(false, k + program.operands.len());
    let mut minterms = Vec::new();
    for assignment in 0..(1u32 << k) {
        for i in 0..k {
            values.set(i, (assignment >> i) & 1 == 1);
        }
        for (j, &(a, b)) in program.operands.iter().enumerate() {
            let v = NandGate::eval(values[a], values[b]);
            values.set(k + j, v);
        }
        if values[output_slot] {
            minterms.push(assignment);
        }
    }
    Ok(TruthTable {
        num_inputs: k,
        input_signals: cone.inputs.clone(),
        output_signal: cone.output,
        minterms,
        dont_cares: Vec::new(),
    })
}
