// SPDX-License-Identifier: Apache-2.0

//! Resynthesis of a minimized sum-of-products into 2-input NAND gates.
//!
//! Each product term is built as an AND chain whose final NAND is left
//! un-inverted, which yields the negated product for free. The OR of the
//! products is then `NAND(np_0, np_1, ...)`, built the same way over the
//! negated products with the last NAND driving the output.

use std::collections::HashMap;

use crate::netlist::{GateId, NandGate, Netlist, SignalId};
use crate::qm::MinimizedFunction;

/// Hands out netlist-global gate and signal ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    pub next_gate_id: usize,
    pub next_signal_id: usize,
}

impl IdAllocator {
    /// Starts allocating just past the largest ids in use in `netlist`.
    pub fn for_netlist(netlist: &Netlist) -> Self {
        IdAllocator {
            next_gate_id: netlist.next_gate_id(),
            next_signal_id: netlist.next_signal_id(),
        }
    }

    pub fn alloc_gate(&mut self) -> GateId {
        let id = GateId(self.next_gate_id);
        self.next_gate_id += 1;
        id
    }

    pub fn alloc_signal(&mut self) -> SignalId {
        let id = SignalId(self.next_signal_id);
        self.next_signal_id += 1;
        id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NandImplementation {
    /// Gates in topological order; exactly one drives the requested output.
    pub gates: Vec<NandGate>,
    /// Fresh internal signals the gates drive, excluding the output.
    pub temp_signals: Vec<SignalId>,
    pub original_gate_count: usize,
}

impl NandImplementation {
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SynthError {
    /// A constant function with no input to derive the constant from.
    NoInputs,
    InputCountMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for SynthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthError::NoInputs => {
                write!(f, "cannot synthesize a constant without any input signal")
            }
            SynthError::InputCountMismatch { expected, actual } => write!(
                f,
                "function has {} inputs but {} input signals were supplied",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for SynthError {}

struct NandEmitter<'a> {
    alloc: &'a mut IdAllocator,
    gates: Vec<NandGate>,
    temp_signals: Vec<SignalId>,
    not_cache: HashMap<SignalId, SignalId>,
}

impl<'a> NandEmitter<'a> {
    fn nand_to(&mut self, a: SignalId, b: SignalId, out: SignalId) {
        let id = self.alloc.alloc_gate();
        self.gates.push(NandGate::new(id, a, b, out));
    }

    fn nand(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let out = self.alloc.alloc_signal();
        self.temp_signals.push(out);
        self.nand_to(a, b, out);
        out
    }

    fn not(&mut self, a: SignalId) -> SignalId {
        if let Some(n) = self.not_cache.get(&a) {
            return *n;
        }
        let n = self.nand(a, a);
        self.not_cache.insert(a, n);
        n
    }

    fn and(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let n = self.nand(a, b);
        self.not(n)
    }

    /// `x NAND NOT(x)`, which is always 1.
    fn one(&mut self, x: SignalId) -> SignalId {
        let nx = self.not(x);
        self.nand(x, nx)
    }

    /// Folds `terms` with AND, leaving the last step as a bare NAND: returns
    /// `NOT(AND(terms))`. If `out` is given the final NAND drives it.
    fn nand_chain(&mut self, terms: &[SignalId], out: Option<SignalId>) -> SignalId {
        debug_assert!(terms.len() >= 2);
        let last = terms[terms.len() - 1];
        let mut acc = terms[0];
        for t in &terms[1..terms.len() - 1] {
            acc = self.and(acc, *t);
        }
        match out {
            Some(out) => {
                self.nand_to(acc, last, out);
                out
            }
            None => self.nand(acc, last),
        }
    }
}

pub fn sop_to_nand(
    function: &MinimizedFunction,
    inputs: &[SignalId],
    output: SignalId,
    alloc: &mut IdAllocator,
    original_gate_count: usize,
) -> Result<NandImplementation, SynthError> {
    if inputs.len() != function.num_inputs {
        return Err(SynthError::InputCountMismatch {
            expected: function.num_inputs,
            actual: inputs.len(),
        });
    }
    let needs_constant = function.implicants.is_empty()
        || function.implicants.iter().any(|imp| imp.literal_count == 0);
    if needs_constant && inputs.is_empty() {
        return Err(SynthError::NoInputs);
    }

    let mut emitter = NandEmitter {
        alloc,
        gates: Vec::new(),
        temp_signals: Vec::new(),
        not_cache: HashMap::new(),
    };

    if function.implicants.is_empty() {
        let one = emitter.one(inputs[0]);
        emitter.nand_to(one, one, output);
    } else {
        let mut negated_products = Vec::with_capacity(function.implicants.len());
        for imp in &function.implicants {
            let literals = imp.literals();
            let np = match literals.as_slice() {
                [] => {
                    let one = emitter.one(inputs[0]);
                    emitter.not(one)
                }
                [(i, true)] => emitter.not(inputs[*i]),
                [(i, false)] => inputs[*i],
                _ => {
                    let terms: Vec<SignalId> = literals
                        .iter()
                        .map(|&(i, positive)| {
                            if positive {
                                inputs[i]
                            } else {
                                emitter.not(inputs[i])
                            }
                        })
                        .collect();
                    emitter.nand_chain(&terms, None)
                }
            };
            negated_products.push(np);
        }
        if let [np] = negated_products.as_slice() {
            emitter.nand_to(*np, *np, output);
        } else {
            emitter.nand_chain(&negated_products, Some(output));
        }
    }

    Ok(NandImplementation {
        gates: emitter.gates,
        temp_signals: emitter.temp_signals,
        original_gate_count,
    })
}

/// Closed-form gate estimate: one inverter per input position that appears
/// complemented, `2m - 3` gates for each product of `m >= 2` literals (one
/// otherwise), and `2p - 3` gates for an OR of `p >= 2` products (one
/// otherwise). Never decreases when literals or implicants are added.
pub fn estimate_gate_count(function: &MinimizedFunction) -> usize {
    let p = function.implicants.len();
    if p == 0 {
        return 0;
    }
    let mut negated_positions = 0u32;
    let mut products = 0usize;
    for imp in &function.implicants {
        negated_positions |= !imp.value & !imp.mask & low_bits(imp.num_inputs);
        let m = imp.literal_count;
        products += if m <= 1 { 1 } else { 2 * m - 3 };
    }
    let or = if p == 1 { 1 } else { 2 * p - 3 };
    negated_positions.count_ones() as usize + products + or
}

fn low_bits(n: usize) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qm::{quine_mccluskey, Implicant};
    use crate::truth_table::TruthTable;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::collections::BTreeSet;

    fn table(num_inputs: usize, minterms: Vec<u32>) -> TruthTable {
        TruthTable {
            num_inputs,
            input_signals: (0..num_inputs).map(SignalId).collect(),
            output_signal: SignalId(100),
            minterms,
            dont_cares: vec![],
        }
    }

    fn run(imp: &NandImplementation, inputs: &[SignalId], output: SignalId, a: u32) -> bool {
        let mut values: HashMap<SignalId, bool> = inputs
            .iter()
            .enumerate()
            .map(|(i, s)| (*s, (a >> i) & 1 == 1))
            .collect();
        for g in &imp.gates {
            let v = NandGate::eval(values[&g.in1], values[&g.in2]);
            values.insert(g.out, v);
        }
        values[&output]
    }

    fn synth(num_inputs: usize, minterms: Vec<u32>) -> (NandImplementation, Vec<SignalId>) {
        let t = table(num_inputs, minterms);
        let f = quine_mccluskey(&t).unwrap();
        let inputs = t.input_signals.clone();
        let mut alloc = IdAllocator {
            next_gate_id: 0,
            next_signal_id: 200,
        };
        (sop_to_nand(&f, &inputs, SignalId(100), &mut alloc, 0).unwrap(), inputs)
    }

    #[test]
    fn test_and_resynthesizes_to_two_gates() {
        let (imp, inputs) = synth(2, vec![3]);
        assert_eq!(imp.gate_count(), 2);
        for a in 0..4 {
            assert_eq!(run(&imp, &inputs, SignalId(100), a), a == 3);
        }
        assert_eq!(imp.temp_signals, vec![SignalId(200)]);
        assert_eq!(imp.gates.last().unwrap().out, SignalId(100));
    }

    #[test]
    fn test_majority_gate_count_matches_estimate() {
        let t = table(3, vec![3, 5, 6, 7]);
        let f = quine_mccluskey(&t).unwrap();
        assert_eq!(estimate_gate_count(&f), 6);
        let (imp, inputs) = synth(3, vec![3, 5, 6, 7]);
        assert_eq!(imp.gate_count(), 6);
        for a in 0..8 {
            assert_eq!(run(&imp, &inputs, SignalId(100), a), t.evaluate(a));
        }
    }

    #[test]
    fn test_constants() {
        let (zero, inputs) = synth(2, vec![]);
        let (one, _) = synth(2, vec![0, 1, 2, 3]);
        for a in 0..4 {
            assert!(!run(&zero, &inputs, SignalId(100), a));
            assert!(run(&one, &inputs, SignalId(100), a));
        }
    }

    #[test]
    fn test_single_negated_literal_uses_input_directly() {
        // f = !a
        let (imp, inputs) = synth(1, vec![0]);
        assert_eq!(imp.gate_count(), 1);
        assert_eq!(imp.gates[0].in1, inputs[0]);
        assert!(run(&imp, &inputs, SignalId(100), 0));
        assert!(!run(&imp, &inputs, SignalId(100), 1));
    }

    #[test]
    fn test_not_cache_shares_inverters() {
        // f = !a!b + !a!c: NOT a must only be built once.
        let t = table(3, vec![0, 2, 4]);
        let f = quine_mccluskey(&t).unwrap();
        let inputs = t.input_signals.clone();
        let mut alloc = IdAllocator {
            next_gate_id: 0,
            next_signal_id: 10,
        };
        let imp = sop_to_nand(&f, &inputs, SignalId(100), &mut alloc, 0).unwrap();
        let inverters_of_a = imp
            .gates
            .iter()
            .filter(|g| g.in1 == inputs[0] && g.in2 == inputs[0])
            .count();
        assert_eq!(inverters_of_a, 1);
        assert_eq!(alloc.next_gate_id, imp.gate_count());
    }

    #[test]
    fn test_no_inputs_constant_is_an_error() {
        let f = MinimizedFunction {
            num_inputs: 0,
            implicants: vec![],
            original_minterm_count: 0,
        };
        let mut alloc = IdAllocator {
            next_gate_id: 0,
            next_signal_id: 0,
        };
        assert_eq!(
            sop_to_nand(&f, &[], SignalId(0), &mut alloc, 0),
            Err(SynthError::NoInputs)
        );
        assert_eq!(
            sop_to_nand(&f, &[SignalId(1)], SignalId(0), &mut alloc, 0),
            Err(SynthError::InputCountMismatch {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn test_random_functions_resynthesize_equivalently() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..64 {
            let n = rng.gen_range(1..=5usize);
            let minterms: Vec<u32> = (0..(1u32 << n)).filter(|_| rng.gen_bool(0.5)).collect();
            let (imp, inputs) = synth(n, minterms.clone());
            let t = table(n, minterms);
            for a in 0..(1u32 << n) {
                assert_eq!(run(&imp, &inputs, SignalId(100), a), t.evaluate(a));
            }
            let drivers_of_output = imp.gates.iter().filter(|g| g.out == SignalId(100)).count();
            assert_eq!(drivers_of_output, 1);
        }
    }

    fn cube(value: u32, mask: u32, num_inputs: usize) -> Implicant {
        Implicant {
            value,
            mask,
            num_inputs,
            covered: BTreeSet::new(),
            literal_count: num_inputs - mask.count_ones() as usize,
        }
    }

    #[test]
    fn test_estimate_is_monotone() {
        let base = MinimizedFunction {
            num_inputs: 4,
            implicants: vec![cube(0b0011, 0b1100, 4)],
            original_minterm_count: 0,
        };
        let more_literals = MinimizedFunction {
            implicants: vec![cube(0b0011, 0b1000, 4)],
            ..base.clone()
        };
        let more_terms = MinimizedFunction {
            implicants: vec![cube(0b0011, 0b1100, 4), cube(0b0100, 0b1011, 4)],
            ..base.clone()
        };
        assert!(estimate_gate_count(&more_literals) >= estimate_gate_count(&base));
        assert!(estimate_gate_count(&more_terms) >= estimate_gate_count(&base));
        assert_eq!(
            estimate_gate_count(&MinimizedFunction {
                implicants: vec![],
                ..base
            }),
            0
        );
    }
}
