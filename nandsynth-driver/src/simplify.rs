// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::ArgMatches;
use nandsynth_core::simplify::simplify;

use crate::common::{input_netlist, maybe_write_output};
use crate::report_cli_error::report_anyhow_error_and_exit;
use crate::toolchain_config::ToolchainConfig;

fn run_simplify(matches: &ArgMatches) -> Result<()> {
    let netlist = input_netlist(matches)?;
    let (simplified, stats) = simplify(&netlist).context("simplifying netlist")?;
    println!("gates folded:        {}", stats.gates_folded);
    println!("inverters rewritten: {}", stats.inverters_rewritten);
    println!("outputs tied:        {}", stats.outputs_tied);
    println!(
        "nand gates:          {} -> {}",
        netlist.nand_gates.len(),
        simplified.nand_gates.len()
    );
    maybe_write_output(matches, &simplified)
}

pub fn handle_simplify(matches: &ArgMatches, _config: &Option<ToolchainConfig>) {
    if let Err(e) = run_simplify(matches) {
        report_anyhow_error_and_exit(&e, Some("simplify"), vec![]);
    }
}
