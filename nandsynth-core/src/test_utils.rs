// SPDX-License-Identifier: Apache-2.0

//! Netlist fixtures shared by unit tests, integration tests and the driver's
//! tests.

use rand::Rng;

use crate::netlist::builder::NetlistBuilder;
use crate::netlist::{Netlist, SignalId};

/// Shape of a netlist produced by `random_netlist`.
#[derive(Debug, Clone, Copy)]
pub struct RandomNetlistShape {
    pub inputs: usize,
    pub gates: usize,
    pub outputs: usize,
    pub dffs: usize,
}

/// Builds a random acyclic netlist: each gate reads two signals chosen from
/// the primary inputs, DFF outputs and earlier gates; outputs and DFF data
/// inputs are drawn from the gates. Inputs are named `i<k>`, outputs `o<k>`
/// and DFF outputs `q<k>`.
pub fn random_netlist<R: Rng>(rng: &mut R, shape: RandomNetlistShape) -> Netlist {
    assert!(shape.inputs + shape.dffs > 0, "need at least one source signal");
    let mut b = NetlistBuilder::new("random");
    let clk = if shape.dffs > 0 { Some(b.add_clock("clk")) } else { None };
    let mut pool: Vec<SignalId> = (0..shape.inputs)
        .map(|i| b.add_input(&format!("i{}", i)))
        .collect();
    let qs: Vec<SignalId> = (0..shape.dffs).map(|i| b.add_wire(&format!("q{}", i))).collect();
    pool.extend(&qs);

    let mut gate_outs = Vec::with_capacity(shape.gates);
    for _ in 0..shape.gates {
        let a = pool[rng.gen_range(0..pool.len())];
        let c = pool[rng.gen_range(0..pool.len())];
        let out = b.add_nand(a, c);
        pool.push(out);
        gate_outs.push(out);
    }
    let pick = |rng: &mut R| -> SignalId {
        if gate_outs.is_empty() {
            pool[rng.gen_range(0..pool.len())]
        } else {
            gate_outs[rng.gen_range(0..gate_outs.len())]
        }
    };
    let mut used_outputs = Vec::new();
    for k in 0..shape.outputs {
        let mut s = pick(rng);
        // An output renames its signal, so one signal cannot be two outputs.
        let mut tries = 0;
        while used_outputs.contains(&s) && tries < 8 {
            s = pick(rng);
            tries += 1;
        }
        if used_outputs.contains(&s) {
            continue;
        }
        used_outputs.push(s);
        b.add_output(&format!("o{}", k), s);
    }
    if let Some(clk) = clk {
        for q in qs {
            let d = pick(rng);
            let reset = rng.gen_bool(0.5);
            b.add_dff_to(d, clk, q, reset);
        }
    }
    b.build()
}

/// `y = (a & b) | (a & !b)`, which is just `a`, spelled out in eight gates.
pub fn setup_redundant_or() -> Netlist {
    let mut b = NetlistBuilder::new("redundant_or");
    let a = b.add_input("a");
    let c = b.add_input("b");
    let ab = b.add_and(a, c);
    let nc = b.add_not(c);
    let anb = b.add_and(a, nc);
    let y = b.add_or(ab, anb);
    b.add_output("y", y);
    b.build()
}

/// Two NAND gates feeding each other: the classic SR latch.
pub fn setup_cross_coupled_nands() -> Netlist {
    let mut b = NetlistBuilder::new("sr_latch");
    let s = b.add_input("s_n");
    let r = b.add_input("r_n");
    let q = b.add_wire("q");
    let qn = b.add_wire("qn");
    b.add_nand_to(s, qn, q);
    b.add_nand_to(r, q, qn);
    b.add_output("q", q);
    b.build()
}

/// 3-input majority built from three ANDs and two ORs.
pub fn setup_majority() -> Netlist {
    let mut b = NetlistBuilder::new("majority");
    let a = b.add_input("a");
    let c = b.add_input("b");
    let d = b.add_input("c");
    let ab = b.add_and(a, c);
    let ac = b.add_and(a, d);
    let bc = b.add_and(c, d);
    let t = b.add_or(ab, ac);
    let y = b.add_or(t, bc);
    b.add_output("y", y);
    b.build()
}
