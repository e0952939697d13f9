// SPDX-License-Identifier: Apache-2.0

use nandsynth_core::levelize::{levelize, LevelizeError};
use nandsynth_core::loops::detect_loops;
use nandsynth_core::netlist::builder::NetlistBuilder;
use nandsynth_core::netlist::io::{netlist_from_json_str, netlist_to_json_string};
use nandsynth_core::stats::summarize;
use nandsynth_core::test_utils::{random_netlist, setup_cross_coupled_nands, RandomNetlistShape};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[test]
fn test_every_gate_gets_a_level_above_its_inputs() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    for _ in 0..16 {
        let n = random_netlist(
            &mut rng,
            RandomNetlistShape {
                inputs: 6,
                gates: 64,
                outputs: 4,
                dffs: 3,
            },
        );
        let l = levelize(&n).unwrap();
        let placed: usize = l.levels.iter().map(Vec::len).sum();
        assert_eq!(placed, n.nand_gates.len());
        assert!(l.levels[0].is_empty());
        for (level, gates) in l.levels.iter().enumerate() {
            for g in gates {
                assert_eq!(g.level, Some(level as u32));
                let deepest = l.signal_levels[&g.in1].max(l.signal_levels[&g.in2]);
                assert_eq!(level as u32, deepest + 1);
                assert_eq!(l.signal_levels[&g.out], level as u32);
            }
        }
        for dff in &n.dffs {
            assert_eq!(l.signal_levels[&dff.q], 0);
        }
    }
}

#[test]
fn test_register_only_design_has_no_levels() {
    let mut b = NetlistBuilder::new("shift");
    let clk = b.add_clock("clk");
    let d = b.add_input("d");
    let q0 = b.add_dff("q0", d, clk, false);
    let q1 = b.add_dff("q1", q0, clk, true);
    b.add_output("out", q1);
    let l = levelize(&b.build()).unwrap();
    assert_eq!(l.max_level, 0);
    assert_eq!(summarize(&l).nand_gates, 0);
}

#[test]
fn test_latch_is_rejected_with_its_loop() {
    let n = setup_cross_coupled_nands();
    let loops = detect_loops(&n);
    assert_eq!(loops.len(), 1);
    let q = n.signal_by_name("q").unwrap();
    let qn = n.signal_by_name("qn").unwrap();
    assert_eq!(loops[0], vec![q.min(qn), q.max(qn)]);
    match levelize(&n) {
        Err(LevelizeError::CombinationalLoop { unresolved, loops: found }) => {
            assert_eq!(unresolved.len(), 2);
            assert_eq!(found, loops);
        }
        other => panic!("expected a loop error, got {:?}", other.map(|l| l.max_level)),
    }
}

#[test]
fn test_levelize_after_json_reload() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let n = random_netlist(
        &mut rng,
        RandomNetlistShape {
            inputs: 3,
            gates: 20,
            outputs: 2,
            dffs: 1,
        },
    );
    let reloaded = netlist_from_json_str(&netlist_to_json_string(&n).unwrap()).unwrap();
    assert_eq!(
        summarize(&levelize(&n).unwrap()),
        summarize(&levelize(&reloaded).unwrap())
    );
}
