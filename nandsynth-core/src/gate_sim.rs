// SPDX-License-Identifier: Apache-2.0

//! Reference evaluator for levelized netlists.
//!
//! Evaluates gates and behavioral modules strictly in level order, one bit per
//! signal. Intrinsic outputs read as 0. This is a checking aid for the
//! optimizer and levelizer, not a performance simulator.

use bitvec::vec::BitVec;

use crate::behavior::BehaviorError;
use crate::levelize::LevelizedNetlist;
use crate::netlist::{NandGate, SignalId};

/// One bit per signal slot, indexed by signal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalValues {
    bits: BitVec,
}

impl SignalValues {
    fn new(slots: usize) -> Self {
        SignalValues {
            bits: BitVec::repeat(false, slots),
        }
    }

    pub fn get(&self, signal: SignalId) -> bool {
        self.bits.get(signal.0).map(|b| *b).unwrap_or(false)
    }

    fn set(&mut self, signal: SignalId, value: bool) {
        if signal.0 < self.bits.len() {
            self.bits.set(signal.0, value);
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum GateSimError {
    InputCount { expected: usize, actual: usize },
    StateCount { expected: usize, actual: usize },
    Behavior(BehaviorError),
}

impl std::fmt::Display for GateSimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateSimError::InputCount { expected, actual } => {
                write!(f, "expected {} primary input values, got {}", expected, actual)
            }
            GateSimError::StateCount { expected, actual } => {
                write!(f, "expected {} DFF state values, got {}", expected, actual)
            }
            GateSimError::Behavior(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GateSimError {}

impl From<BehaviorError> for GateSimError {
    fn from(e: BehaviorError) -> Self {
        GateSimError::Behavior(e)
    }
}

/// Settles the combinational logic for one cycle. `inputs` follows
/// `primary_inputs` order and `dff_state` follows `dffs` order.
pub fn eval_combinational<A>(
    levelized: &LevelizedNetlist<A>,
    inputs: &[bool],
    dff_state: &[bool],
) -> Result<SignalValues, GateSimError> {
    let netlist = &levelized.netlist;
    if inputs.len() != netlist.primary_inputs.len() {
        return Err(GateSimError::InputCount {
            expected: netlist.primary_inputs.len(),
            actual: inputs.len(),
        });
    }
    if dff_state.len() != netlist.dffs.len() {
        return Err(GateSimError::StateCount {
            expected: netlist.dffs.len(),
            actual: dff_state.len(),
        });
    }

    let mut values = SignalValues::new(netlist.signal_slots());
    for s in &netlist.signals {
        if let Some(v) = s.constant_value() {
            values.set(s.id, v);
        }
    }
    for (pi, v) in netlist.primary_inputs.iter().zip(inputs) {
        values.set(*pi, *v);
    }
    for (dff, v) in netlist.dffs.iter().zip(dff_state) {
        values.set(dff.q, *v);
    }

    for (level, gates) in levelized.levels.iter().enumerate() {
        for gate in gates {
            let v = NandGate::eval(values.get(gate.in1), values.get(gate.in2));
            values.set(gate.out, v);
        }
        for &index in &levelized.behavioral_levels[level] {
            let module = &netlist.behavioral_modules[index];
            let registry = levelized
                .behaviors
                .as_ref()
                .ok_or_else(|| BehaviorError::UnknownModule(module.module_name.clone()))?;
            let args = module.pack_inputs(|s| values.get(s));
            let words = registry.call(&module.module_name, &args)?;
            for (s, v) in module.unpack_outputs(&words) {
                values.set(s, v);
            }
        }
    }
    Ok(values)
}

/// The DFF state after a clock edge: each DFF latches its `d` value.
pub fn step_clock<A>(levelized: &LevelizedNetlist<A>, values: &SignalValues) -> Vec<bool> {
    levelized
        .netlist
        .dffs
        .iter()
        .map(|dff| values.get(dff.d))
        .collect()
}

/// Reset-value state for every DFF.
pub fn reset_state<A>(levelized: &LevelizedNetlist<A>) -> Vec<bool> {
    levelized
        .netlist
        .dffs
        .iter()
        .map(|dff| dff.reset_value)
        .collect()
}

pub fn output_values<A>(levelized: &LevelizedNetlist<A>, values: &SignalValues) -> Vec<bool> {
    levelized
        .netlist
        .primary_outputs
        .iter()
        .map(|s| values.get(*s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::expr::{BehaviorExpr, ExprModule, ExprOutput, ExprProgram};
    use crate::levelize::{levelize, levelize_with_program};
    use crate::netlist::builder::NetlistBuilder;
    use crate::netlist::Port;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(false, false, false)]
    #[test_case(false, true, true)]
    #[test_case(true, false, true)]
    #[test_case(true, true, false)]
    fn test_xor(a: bool, b: bool, want: bool) {
        let mut builder = NetlistBuilder::new("xor");
        let x = builder.add_input("a");
        let y = builder.add_input("b");
        let z = builder.add_xor(x, y);
        builder.add_output("z", z);
        let l = levelize(&builder.build()).unwrap();
        let values = eval_combinational(&l, &[a, b], &[]).unwrap();
        assert_eq!(output_values(&l, &values), vec![want]);
    }

    #[test]
    fn test_toggle_flop_counts() {
        let mut b = NetlistBuilder::new("toggle");
        let clk = b.add_clock("clk");
        let q = b.add_wire("q");
        let d = b.add_not(q);
        b.add_dff_to(d, clk, q, false);
        b.add_output("q_out", d);
        let l = levelize(&b.build()).unwrap();
        let mut state = reset_state(&l);
        let mut seen = Vec::new();
        for _ in 0..4 {
            let values = eval_combinational(&l, &[false], &state).unwrap();
            seen.push(values.get(q));
            state = step_clock(&l, &values);
        }
        assert_eq!(seen, vec![false, true, false, true]);
    }

    #[test]
    fn test_behavioral_module_is_evaluated() {
        let mut b = NetlistBuilder::new("t");
        let xs = b.add_input_bus("x", 2);
        let outs = b.add_behavioral("u0", "inc", vec![Port::new("x", xs)], &[("y", 2)]);
        b.add_output("y0", outs[0][0]);
        b.add_output("y1", outs[0][1]);
        let program = ExprProgram {
            modules: vec![ExprModule {
                name: "inc".to_string(),
                input_widths: vec![2],
                outputs: vec![ExprOutput {
                    width: 2,
                    expr: BehaviorExpr::Add {
                        lhs: Box::new(BehaviorExpr::Input { index: 0 }),
                        rhs: Box::new(BehaviorExpr::Const { value: 1 }),
                    },
                }],
            }],
        };
        let n = b.build();
        let l = levelize_with_program(&n, Some(&program)).unwrap();
        // x = 0b01 -> y = 0b10
        let values = eval_combinational(&l, &[true, false], &[]).unwrap();
        assert_eq!(output_values(&l, &values), vec![false, true]);

        let bare = levelize(&n).unwrap();
        assert!(matches!(
            eval_combinational(&bare, &[true, false], &[]),
            Err(GateSimError::Behavior(BehaviorError::UnknownModule(_)))
        ));
    }

    #[test]
    fn test_input_count_is_checked() {
        let mut b = NetlistBuilder::new("t");
        b.add_input("a");
        let l = levelize(&b.build()).unwrap();
        assert_eq!(
            eval_combinational(&l, &[], &[]),
            Err(GateSimError::InputCount {
                expected: 1,
                actual: 0
            })
        );
    }
}
