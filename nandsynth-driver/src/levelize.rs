// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::ArgMatches;
use nandsynth_core::levelize::{levelize_with_program, LevelizeError};
use nandsynth_core::netlist::{Netlist, SignalId};
use nandsynth_core::stats::summarize;

use crate::common::{behaviors_program, input_netlist, parse_bool_flag};
use crate::report_cli_error::{report_anyhow_error_and_exit, report_cli_error_and_exit};
use crate::toolchain_config::ToolchainConfig;

pub fn format_loop(netlist: &Netlist, members: &[SignalId]) -> String {
    members
        .iter()
        .map(|s| netlist.signal_name(*s))
        .collect::<Vec<String>>()
        .join(" ")
}

fn run_levelize(matches: &ArgMatches) -> Result<()> {
    let netlist = input_netlist(matches)?;
    let program = behaviors_program(matches)?;
    let levelized = match levelize_with_program(&netlist, program.as_ref()) {
        Ok(l) => l,
        Err(LevelizeError::CombinationalLoop { unresolved, loops }) => {
            let rendered: Vec<String> = loops.iter().map(|l| format_loop(&netlist, l)).collect();
            let unresolved = unresolved.len().to_string();
            let mut details = vec![("unresolved signals", unresolved.as_str())];
            for l in &rendered {
                details.push(("loop", l.as_str()));
            }
            report_cli_error_and_exit("combinational loop detected", Some("levelize"), details);
        }
        Err(e) => return Err(e.into()),
    };
    let summary = summarize(&levelized);
    if parse_bool_flag(matches, "json", false) {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary);
    }
    Ok(())
}

pub fn handle_levelize(matches: &ArgMatches, _config: &Option<ToolchainConfig>) {
    if let Err(e) = run_levelize(matches) {
        report_anyhow_error_and_exit(&e, Some("levelize"), vec![]);
    }
}
