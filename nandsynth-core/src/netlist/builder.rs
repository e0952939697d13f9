// SPDX-License-Identifier: Apache-2.0

//! The `NetlistBuilder` builds up a `Netlist` one element at a time, handing
//! out fresh signal and gate ids as it goes.
//!
//! Basic example usage:
//! ```
//! use nandsynth_core::netlist::builder::NetlistBuilder;
//!
//! let mut builder = NetlistBuilder::new("my_and");
//! let a = builder.add_input("a");
//! let b = builder.add_input("b");
//! let y = builder.add_and(a, b);
//! builder.add_output("y", y);
//! let netlist = builder.build();
//! assert_eq!(netlist.nand_gates.len(), 2);
//! ```

use crate::netlist::{
    BehavioralModule, Dff, GateId, Intrinsic, NandGate, Netlist, Port, Signal, SignalId,
};

pub struct NetlistBuilder {
    netlist: Netlist,
    next_signal_id: usize,
    next_gate_id: usize,
}

impl NetlistBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        NetlistBuilder {
            netlist: Netlist::new(name),
            next_signal_id: 0,
            next_gate_id: 0,
        }
    }

    pub fn build(mut self) -> Netlist {
        self.netlist.rebuild_signal_map();
        self.netlist
    }

    fn fresh_signal(&mut self, name: String) -> SignalId {
        let id = SignalId(self.next_signal_id);
        self.next_signal_id += 1;
        self.netlist.signals.push(Signal::new(id, name));
        id
    }

    fn signal_mut(&mut self, id: SignalId) -> &mut Signal {
        self.netlist
            .signals
            .iter_mut()
            .find(|s| s.id == id)
            .expect("builder only hands out ids it has allocated")
    }

    /// Adds an internal wire with no driver yet.
    pub fn add_wire(&mut self, name: &str) -> SignalId {
        self.fresh_signal(name.to_string())
    }

    pub fn add_input(&mut self, name: &str) -> SignalId {
        let id = self.fresh_signal(name.to_string());
        self.signal_mut(id).is_primary_input = true;
        self.netlist.primary_inputs.push(id);
        id
    }

    /// Adds an input port of `width` bits named `name[i]`, LSB first.
    pub fn add_input_bus(&mut self, name: &str, width: usize) -> Vec<SignalId> {
        (0..width)
            .map(|i| self.add_input(&format!("{}[{}]", name, i)))
            .collect()
    }

    /// Marks `signal` as a primary output. `name` renames the signal so it is
    /// addressable by its port name.
    pub fn add_output(&mut self, name: &str, signal: SignalId) {
        let s = self.signal_mut(signal);
        s.is_primary_output = true;
        s.name = name.to_string();
        self.netlist.primary_outputs.push(signal);
    }

    pub fn add_clock(&mut self, name: &str) -> SignalId {
        let id = self.add_input(name);
        self.netlist.clock_signal = Some(id);
        id
    }

    /// Returns the constant marker signal for `value`, creating it on first
    /// use.
    pub fn add_const(&mut self, value: bool) -> SignalId {
        let name = if value { "const_1" } else { "const_0" };
        if let Some(s) = self.netlist.signals.iter().find(|s| s.name == name) {
            return s.id;
        }
        self.fresh_signal(name.to_string())
    }

    /// Adds a NAND gate driving a fresh signal.
    pub fn add_nand(&mut self, in1: SignalId, in2: SignalId) -> SignalId {
        let out = self.fresh_signal(format!("_n{}", self.next_signal_id));
        self.add_nand_to(in1, in2, out);
        out
    }

    /// Adds a NAND gate driving an existing signal (e.g. a wire created with
    /// `add_wire`, which is how feedback is expressed).
    pub fn add_nand_to(&mut self, in1: SignalId, in2: SignalId, out: SignalId) {
        let id = GateId(self.next_gate_id);
        self.next_gate_id += 1;
        self.netlist.nand_gates.push(NandGate::new(id, in1, in2, out));
    }

    pub fn add_not(&mut self, a: SignalId) -> SignalId {
        self.add_nand(a, a)
    }

    pub fn add_and(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let n = self.add_nand(a, b);
        self.add_not(n)
    }

    pub fn add_or(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let na = self.add_not(a);
        let nb = self.add_not(b);
        self.add_nand(na, nb)
    }

    pub fn add_xor(&mut self, a: SignalId, b: SignalId) -> SignalId {
        let n = self.add_nand(a, b);
        let l = self.add_nand(a, n);
        let r = self.add_nand(b, n);
        self.add_nand(l, r)
    }

    /// Adds a DFF whose output is a fresh signal named `name`.
    pub fn add_dff(
        &mut self,
        name: &str,
        d: SignalId,
        clk: SignalId,
        reset_value: bool,
    ) -> SignalId {
        let q = self.fresh_signal(name.to_string());
        self.signal_mut(q).is_dff_output = true;
        self.netlist.dffs.push(Dff {
            d,
            clk,
            q,
            reset_value,
        });
        q
    }

    /// Adds a DFF whose output is an already-allocated wire (used to close
    /// state feedback loops).
    pub fn add_dff_to(&mut self, d: SignalId, clk: SignalId, q: SignalId, reset_value: bool) {
        self.signal_mut(q).is_dff_output = true;
        self.netlist.dffs.push(Dff {
            d,
            clk,
            q,
            reset_value,
        });
    }

    /// Adds an intrinsic block; output ports are allocated as fresh signals
    /// named `<name>.<port>[i]` and returned in port order.
    pub fn add_intrinsic(
        &mut self,
        name: &str,
        kind: &str,
        inputs: Vec<Port>,
        output_widths: &[(&str, usize)],
    ) -> Vec<Vec<SignalId>> {
        let outputs = self.alloc_ports(name, output_widths);
        self.netlist.intrinsics.push(Intrinsic {
            name: name.to_string(),
            kind: kind.to_string(),
            inputs,
            outputs: outputs.clone(),
        });
        outputs.into_iter().map(|p| p.signals).collect()
    }

    /// Adds a behavioral module instance; output ports are allocated like
    /// `add_intrinsic`.
    pub fn add_behavioral(
        &mut self,
        instance_name: &str,
        module_name: &str,
        inputs: Vec<Port>,
        output_widths: &[(&str, usize)],
    ) -> Vec<Vec<SignalId>> {
        let outputs = self.alloc_ports(instance_name, output_widths);
        self.netlist.behavioral_modules.push(BehavioralModule {
            instance_name: instance_name.to_string(),
            module_name: module_name.to_string(),
            inputs,
            outputs: outputs.clone(),
        });
        outputs.into_iter().map(|p| p.signals).collect()
    }

    fn alloc_ports(&mut self, owner: &str, widths: &[(&str, usize)]) -> Vec<Port> {
        widths
            .iter()
            .map(|(port_name, width)| {
                let signals = (0..*width)
                    .map(|i| self.fresh_signal(format!("{}.{}[{}]", owner, port_name, i)))
                    .collect();
                Port::new(*port_name, signals)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_allocates_dense_ids() {
        let mut b = NetlistBuilder::new("t");
        let a = b.add_input("a");
        let c = b.add_input("c");
        let y = b.add_or(a, c);
        b.add_output("y", y);
        let n = b.build();
        assert_eq!(n.nand_gates.len(), 3);
        assert_eq!(n.next_signal_id(), n.signals.len());
        assert_eq!(n.signal_by_name("y"), Some(y));
        assert_eq!(n.primary_inputs, vec![a, c]);
        assert!(n.validate().is_ok());
    }

    #[test]
    fn test_add_const_is_memoized() {
        let mut b = NetlistBuilder::new("t");
        let z0 = b.add_const(false);
        let z1 = b.add_const(false);
        let o = b.add_const(true);
        assert_eq!(z0, z1);
        assert_ne!(z0, o);
    }
}
