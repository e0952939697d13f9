// SPDX-License-Identifier: Apache-2.0

//! Command line driver for NAND netlist optimization, levelization and
//! diagnosis.
//!
//! Commands are given like:
//!
//! ```text
//! nandsynth-driver <global-options> <command> <netlist.json> <command-options>
//! ```
//!
//! Commands are:
//!
//! - optimize: Rewrites logic cones through two-level minimization.
//! - levelize: Assigns evaluation levels and prints a level summary.
//! - loops: Lists the combinational loops of a netlist.
//! - check: Reports wiring problems.
//! - simplify: Folds constants through the NAND gates.
//!
//! Sample usage:
//!
//! ```shell
//! $ cargo run -- --toolchain=$HOME/nandsynth-toolchain.toml \
//!     optimize design.json --max_cone_inputs=8 --output=design.opt.json
//! $ cargo run -- levelize design.json --behaviors=behaviors.json
//! ```

mod check;
mod common;
mod levelize;
mod loops;
mod optimize;
mod report_cli_error;
mod simplify;
mod toolchain_config;

use clap::{Arg, ArgAction};
use report_cli_error::{report_anyhow_error_and_exit, report_cli_error_and_exit};
use toolchain_config::{load_toolchain_config, ToolchainConfig};

const DEFAULT_TOOLCHAIN_FILENAME: &str = "nandsynth-toolchain.toml";

trait AppExt {
    fn add_netlist_arg(self) -> Self;
    fn add_output_arg(self) -> Self;
    fn add_behaviors_arg(self) -> Self;
    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self;
    fn add_value_arg(
        self,
        long: &'static str,
        value_name: &'static str,
        help: &'static str,
    ) -> Self;
}

impl AppExt for clap::Command {
    fn add_netlist_arg(self) -> Self {
        (self as clap::Command).arg(
            Arg::new("netlist")
                .help("The input netlist JSON file")
                .required(true)
                .index(1),
        )
    }

    fn add_output_arg(self) -> Self {
        self.add_value_arg("output", "OUTPUT", "Where to write the resulting netlist JSON")
    }

    fn add_behaviors_arg(self) -> Self {
        self.add_value_arg(
            "behaviors",
            "BEHAVIORS",
            "JSON program defining the behavioral modules",
        )
    }

    /// Adds a boolean argument to the command; the helper keeps a uniform
    /// `--flag=true|false` style for boolean arguments.
    fn add_bool_arg(self, long: &'static str, help: &'static str) -> Self {
        (self as clap::Command).arg(
            Arg::new(long)
                .long(long)
                .value_name("BOOL")
                .action(ArgAction::Set)
                .value_parser(["true", "false"])
                .num_args(1)
                .help(help),
        )
    }

    fn add_value_arg(
        self,
        long: &'static str,
        value_name: &'static str,
        help: &'static str,
    ) -> Self {
        (self as clap::Command).arg(
            Arg::new(long)
                .long(long)
                .value_name(value_name)
                .action(ArgAction::Set)
                .help(help),
        )
    }
}

/// Explicit `--toolchain` path, or the default file in the working directory
/// when one exists.
fn resolve_toolchain_config(matches: &clap::ArgMatches) -> Option<ToolchainConfig> {
    let mut toml_path: Option<std::path::PathBuf> = matches
        .get_one::<String>("toolchain")
        .map(std::path::PathBuf::from);

    if toml_path.is_none() {
        let cwd_toml_path = std::path::PathBuf::from(DEFAULT_TOOLCHAIN_FILENAME);
        if cwd_toml_path.exists() {
            log::info!(
                "Using {} in current directory",
                DEFAULT_TOOLCHAIN_FILENAME
            );
            toml_path = Some(cwd_toml_path);
        }
    }

    let path = toml_path?;
    if !path.exists() {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        let path = path.display().to_string();
        report_cli_error_and_exit(
            "toolchain toml file does not exist",
            None,
            vec![("path", path.as_str()), ("working directory", cwd.as_str())],
        );
    }
    match load_toolchain_config(&path) {
        Ok(config) => Some(config),
        Err(e) => report_anyhow_error_and_exit(&e, None, vec![]),
    }
}

fn main() {
    let _ = env_logger::try_init();

    log::info!(
        "nandsynth-driver starting; version: {}",
        env!("CARGO_PKG_VERSION")
    );

    let matches = clap::Command::new("nandsynth-driver")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Command line driver for NAND netlist optimization and levelization")
        .arg(
            Arg::new("toolchain")
                .long("toolchain")
                .value_name("TOOLCHAIN")
                .help("Path to a nandsynth-toolchain.toml file")
                .action(ArgAction::Set),
        )
        .subcommand(clap::Command::new("version").about("Prints the version of the driver"))
        .subcommand(
            clap::Command::new("optimize")
                .about("Minimizes logic cones and resynthesizes them as NAND gates")
                .add_netlist_arg()
                .add_value_arg(
                    "max_cone_inputs",
                    "N",
                    "Skip cones with more distinct inputs than this",
                )
                .add_value_arg(
                    "min_savings_percent",
                    "PERCENT",
                    "Minimum estimated gate savings for a rewrite to be kept",
                )
                .add_bool_arg("verbose", "Log every per-cone decision")
                .add_value_arg(
                    "time_budget_ms",
                    "MILLIS",
                    "Stop optimizing new cones after this many milliseconds",
                )
                .add_value_arg(
                    "max_merge_steps",
                    "STEPS",
                    "Bound on prime-implicant merge steps per cone",
                )
                .add_value_arg(
                    "verify_samples",
                    "N",
                    "Random-simulation samples to check the result against the input",
                )
                .add_value_arg("seed", "SEED", "Seed for verification sampling")
                .add_behaviors_arg()
                .add_bool_arg("stats_json", "Print the statistics as JSON")
                .add_output_arg(),
        )
        .subcommand(
            clap::Command::new("levelize")
                .about("Assigns evaluation levels and prints a summary")
                .add_netlist_arg()
                .add_behaviors_arg()
                .add_bool_arg("json", "Print the summary as JSON"),
        )
        .subcommand(
            clap::Command::new("loops")
                .about("Lists combinational loops by signal name")
                .add_netlist_arg(),
        )
        .subcommand(
            clap::Command::new("check")
                .about("Reports netlist wiring problems")
                .add_netlist_arg(),
        )
        .subcommand(
            clap::Command::new("simplify")
                .about("Propagates constants through NAND gates")
                .add_netlist_arg()
                .add_output_arg(),
        )
        .get_matches();

    let config = resolve_toolchain_config(&matches);

    match matches.subcommand() {
        Some(("optimize", m)) => optimize::handle_optimize(m, &config),
        Some(("levelize", m)) => levelize::handle_levelize(m, &config),
        Some(("loops", m)) => loops::handle_loops(m, &config),
        Some(("check", m)) => check::handle_check(m, &config),
        Some(("simplify", m)) => simplify::handle_simplify(m, &config),
        Some(("version", _)) => println!("{}", env!("CARGO_PKG_VERSION")),
        _ => report_cli_error_and_exit("No valid subcommand provided.", None, vec![]),
    }
}
