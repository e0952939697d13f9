// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use nandsynth_core::behavior::expr::ExprProgram;
use nandsynth_core::netlist::io::{load_netlist, save_netlist};
use nandsynth_core::netlist::Netlist;

pub fn input_netlist(matches: &ArgMatches) -> Result<Netlist> {
    let path = matches
        .get_one::<String>("netlist")
        .context("missing netlist argument")?;
    load_netlist(Path::new(path))
}

/// Loads the `--behaviors` program, if one was given.
pub fn behaviors_program(matches: &ArgMatches) -> Result<Option<ExprProgram>> {
    matches
        .get_one::<String>("behaviors")
        .map(|path| ExprProgram::load(Path::new(path)))
        .transpose()
}

/// Writes `netlist` to `--output` when the flag is present.
pub fn maybe_write_output(matches: &ArgMatches, netlist: &Netlist) -> Result<()> {
    if let Some(path) = matches.get_one::<String>("output") {
        save_netlist(netlist, Path::new(path))?;
        log::info!("wrote netlist '{}' to {}", netlist.name, path);
    }
    Ok(())
}

pub fn parse_bool_flag(matches: &ArgMatches, name: &str, default: bool) -> bool {
    match matches.get_one::<String>(name).map(|s| s.as_str()) {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}
