// SPDX-License-Identifier: Apache-2.0

//! Basic integrity checks for netlists.
//!
//! These checks look for wiring issues such as references to signals that were
//! never declared, signals with more than one driver, and outputs that are
//! never driven.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::netlist::{Netlist, NetlistError, SignalId};

/// A specific integrity problem found during checking.
#[derive(Debug, PartialEq, Eq)]
pub enum IntegrityFinding {
    /// A signal id is used by some element but is absent from the signal set.
    UnknownSignal { id: SignalId, context: String },
    /// Two signal records share an id.
    DuplicateSignalId(SignalId),
    /// A signal is driven by more than one gate/DFF/intrinsic/behavioral
    /// output.
    MultipleDrivers { signal: String, drivers: Vec<String> },
    /// A primary input is also driven from inside the netlist.
    DrivenPrimaryInput { signal: String, driver: String },
    /// A primary output is never driven and is not itself an input.
    UndrivenOutput(String),
}

impl IntegrityFinding {
    /// Findings that make the netlist unusable for optimization/levelization.
    pub fn into_fatal_error(self) -> Option<NetlistError> {
        match self {
            IntegrityFinding::UnknownSignal { id, context } => {
                Some(NetlistError::UnknownSignal { id, context })
            }
            IntegrityFinding::DuplicateSignalId(id) => Some(NetlistError::DuplicateSignalId { id }),
            IntegrityFinding::MultipleDrivers { signal, drivers } => {
                Some(NetlistError::MultipleDrivers { signal, drivers })
            }
            IntegrityFinding::DrivenPrimaryInput { signal, driver } => {
                Some(NetlistError::DrivenPrimaryInput { signal, driver })
            }
            IntegrityFinding::UndrivenOutput(_) => None,
        }
    }
}

impl std::fmt::Display for IntegrityFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityFinding::UnknownSignal { id, context } => {
                write!(f, "unknown signal {} referenced by {}", id, context)
            }
            IntegrityFinding::DuplicateSignalId(id) => write!(f, "duplicate signal id {}", id),
            IntegrityFinding::MultipleDrivers { signal, drivers } => {
                write!(f, "multiple drivers for '{}': {}", signal, drivers.join(", "))
            }
            IntegrityFinding::DrivenPrimaryInput { signal, driver } => {
                write!(f, "primary input '{}' driven by {}", signal, driver)
            }
            IntegrityFinding::UndrivenOutput(name) => write!(f, "undriven output '{}'", name),
        }
    }
}

/// Result of running the integrity checker over a netlist.
#[derive(Debug, PartialEq, Eq)]
pub enum IntegritySummary {
    /// No issues were found.
    Clean,
    /// One or more problems were detected.
    Findings(Vec<IntegrityFinding>),
}

/// Check a netlist for wiring issues.
pub fn check_netlist(netlist: &Netlist) -> IntegritySummary {
    let mut findings = Vec::new();

    let mut declared: HashSet<SignalId> = HashSet::new();
    for s in &netlist.signals {
        if !declared.insert(s.id) {
            findings.push(IntegrityFinding::DuplicateSignalId(s.id));
        }
    }

    let check_ref =
        |id: SignalId, context: &dyn Fn() -> String, findings: &mut Vec<IntegrityFinding>| {
            if !declared.contains(&id) {
                findings.push(IntegrityFinding::UnknownSignal {
                    id,
                    context: context(),
                });
            }
        };

    // Drivers, keyed by signal, in a deterministic order.
    let mut drivers: BTreeMap<SignalId, Vec<String>> = BTreeMap::new();

    for gate in &netlist.nand_gates {
        let ctx = || format!("nand gate {}", gate.id.0);
        check_ref(gate.in1, &ctx, &mut findings);
        check_ref(gate.in2, &ctx, &mut findings);
        check_ref(gate.out, &ctx, &mut findings);
        drivers.entry(gate.out).or_default().push(ctx());
    }
    for (i, dff) in netlist.dffs.iter().enumerate() {
        let ctx = || format!("dff {}", i);
        check_ref(dff.d, &ctx, &mut findings);
        check_ref(dff.clk, &ctx, &mut findings);
        check_ref(dff.q, &ctx, &mut findings);
        drivers.entry(dff.q).or_default().push(ctx());
    }
    for intrinsic in &netlist.intrinsics {
        let ctx = || format!("intrinsic '{}'", intrinsic.name);
        for port in &intrinsic.inputs {
            for s in &port.signals {
                check_ref(*s, &ctx, &mut findings);
            }
        }
        for port in &intrinsic.outputs {
            for s in &port.signals {
                check_ref(*s, &ctx, &mut findings);
                drivers.entry(*s).or_default().push(ctx());
            }
        }
    }
    for module in &netlist.behavioral_modules {
        let ctx = || format!("behavioral module '{}'", module.instance_name);
        for s in module.flattened_inputs() {
            check_ref(s, &ctx, &mut findings);
        }
        for s in module.flattened_outputs() {
            check_ref(s, &ctx, &mut findings);
            drivers.entry(s).or_default().push(ctx());
        }
    }
    for s in netlist.primary_inputs.iter().chain(netlist.primary_outputs.iter()) {
        check_ref(*s, &|| "port list".to_string(), &mut findings);
    }
    if let Some(clk) = netlist.clock_signal {
        check_ref(clk, &|| "clock".to_string(), &mut findings);
    }

    let index = netlist.signal_index();
    let name_of = |id: SignalId| -> String {
        index
            .get(&id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let is_input: HashMap<SignalId, bool> = netlist
        .signals
        .iter()
        .map(|s| (s.id, s.is_primary_input))
        .collect();

    for (signal, ds) in &drivers {
        if ds.len() > 1 {
            findings.push(IntegrityFinding::MultipleDrivers {
                signal: name_of(*signal),
                drivers: ds.clone(),
            });
        }
        if is_input.get(signal).copied().unwrap_or(false) {
            findings.push(IntegrityFinding::DrivenPrimaryInput {
                signal: name_of(*signal),
                driver: ds[0].clone(),
            });
        }
    }

    for po in &netlist.primary_outputs {
        let is_pi = is_input.get(po).copied().unwrap_or(false);
        let is_const = index
            .get(po)
            .map(|s| s.constant_value().is_some())
            .unwrap_or(false);
        if !drivers.contains_key(po) && !is_pi && !is_const {
            findings.push(IntegrityFinding::UndrivenOutput(name_of(*po)));
        }
    }

    if findings.is_empty() {
        IntegritySummary::Clean
    } else {
        IntegritySummary::Findings(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::builder::NetlistBuilder;
    use crate::netlist::{GateId, NandGate};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_netlist() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let y = b.add_not(a);
        b.add_output("y", y);
        assert_eq!(check_netlist(&b.build()), IntegritySummary::Clean);
    }

    #[test]
    fn test_multiple_drivers_is_fatal() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let w = b.add_wire("w");
        b.add_nand_to(a, a, w);
        b.add_nand_to(a, a, w);
        b.add_output("w", w);
        let n = b.build();
        match check_netlist(&n) {
            IntegritySummary::Findings(f) => {
                assert!(matches!(f[0], IntegrityFinding::MultipleDrivers { .. }));
            }
            IntegritySummary::Clean => panic!("expected findings"),
        }
        assert!(matches!(
            n.validate(),
            Err(NetlistError::MultipleDrivers { .. })
        ));
    }

    #[test]
    fn test_unknown_signal_and_undriven_output() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let w = b.add_wire("w");
        b.add_output("w", w);
        let mut n = b.build();
        n.nand_gates
            .push(NandGate::new(GateId(0), a, SignalId(99), SignalId(98)));
        let summary = check_netlist(&n);
        let IntegritySummary::Findings(findings) = summary else {
            panic!("expected findings");
        };
        assert!(findings.iter().any(|f| matches!(
            f,
            IntegrityFinding::UnknownSignal { id, .. } if *id == SignalId(99)
        )));
        assert!(findings.contains(&IntegrityFinding::UndrivenOutput("w".to_string())));
        assert!(matches!(n.validate(), Err(NetlistError::UnknownSignal { .. })));
    }

    #[test]
    fn test_driven_primary_input() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let c = b.add_input("c");
        b.add_nand_to(c, c, a);
        let n = b.build();
        assert!(matches!(
            n.validate(),
            Err(NetlistError::DrivenPrimaryInput { .. })
        ));
    }
}
