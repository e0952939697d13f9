// SPDX-License-Identifier: Apache-2.0

//! Logic minimization and simulation scheduling for flattened NAND netlists.
//!
//! The optimization path is `cone` -> `truth_table` -> `qm` -> `sop2nand`,
//! driven cone by cone by `optimize`. `levelize` schedules a netlist (and any
//! compiled `behavior`s) for level-by-level simulation and reports
//! combinational loops with help from `loops`.

pub mod behavior;
pub mod check_equivalence;
pub mod cone;
pub mod gate_sim;
pub mod levelize;
pub mod loops;
pub mod netlist;
pub mod optimize;
pub mod qm;
pub mod simplify;
pub mod sop2nand;
pub mod stats;
pub mod test_utils;
pub mod topo;
pub mod truth_table;
pub mod use_count;
