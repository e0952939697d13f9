// SPDX-License-Identifier: Apache-2.0

use clap::ArgMatches;
use nandsynth_core::loops::detect_loops;

use crate::common::input_netlist;
use crate::levelize::format_loop;
use crate::report_cli_error::report_anyhow_error_and_exit;
use crate::toolchain_config::ToolchainConfig;

pub fn handle_loops(matches: &ArgMatches, _config: &Option<ToolchainConfig>) {
    let netlist = match input_netlist(matches) {
        Ok(n) => n,
        Err(e) => report_anyhow_error_and_exit(&e, Some("loops"), vec![]),
    };
    let loops = detect_loops(&netlist);
    if loops.is_empty() {
        println!("no combinational loops");
        return;
    }
    for (i, members) in loops.iter().enumerate() {
        println!("loop {}: {}", i, format_loop(&netlist, members));
    }
}
