// SPDX-License-Identifier: Apache-2.0

use clap::ArgMatches;
use nandsynth_core::netlist::integrity::{check_netlist, IntegritySummary};

use crate::common::input_netlist;
use crate::report_cli_error::{report_anyhow_error_and_exit, report_cli_error_and_exit};
use crate::toolchain_config::ToolchainConfig;

/// Prints every integrity finding; exits non-zero if any of them is fatal.
pub fn handle_check(matches: &ArgMatches, _config: &Option<ToolchainConfig>) {
    let netlist = match input_netlist(matches) {
        Ok(n) => n,
        Err(e) => report_anyhow_error_and_exit(&e, Some("check"), vec![]),
    };
    let findings = match check_netlist(&netlist) {
        IntegritySummary::Clean => {
            println!("clean");
            return;
        }
        IntegritySummary::Findings(findings) => findings,
    };
    let mut fatal = 0;
    for finding in findings {
        println!("{}", finding);
        if finding.into_fatal_error().is_some() {
            fatal += 1;
        }
    }
    if fatal > 0 {
        report_cli_error_and_exit(
            &format!("{} fatal integrity findings", fatal),
            Some("check"),
            vec![("netlist", netlist.name.as_str())],
        );
    }
}
