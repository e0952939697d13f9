// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::ArgMatches;
use nandsynth_core::behavior::compile_all;
use nandsynth_core::check_equivalence::random_equivalence;
use nandsynth_core::optimize::{optimize, OptimizeStats};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::common::{behaviors_program, input_netlist, maybe_write_output, parse_bool_flag};
use crate::report_cli_error::report_anyhow_error_and_exit;
use crate::toolchain_config::{get_optimize_options, get_verify_samples, ToolchainConfig};

fn print_stats(stats: &OptimizeStats) {
    println!("original gates:  {}", stats.original_gates);
    println!("optimized gates: {}", stats.optimized_gates);
    println!("gates saved:     {}", stats.gates_saved);
    println!(
        "cones:           {} extracted, {} optimized, {} skipped",
        stats.cones_extracted, stats.cones_optimized, stats.cones_skipped
    );
    println!("time:            {} ms", stats.optimization_time_ms);
}

fn run_optimize(matches: &ArgMatches, config: &Option<ToolchainConfig>) -> Result<()> {
    let netlist = input_netlist(matches)?;
    let options = get_optimize_options(matches, config)?;
    let verify_samples = get_verify_samples(matches, config)?;
    log::info!("optimize; options: {:?}", options);

    let result = optimize(&netlist, &options).context("optimizing netlist")?;

    if verify_samples > 0 {
        let registry = match behaviors_program(matches)? {
            Some(program) => Some(compile_all(&program).context("compiling behaviors")?),
            None => None,
        };
        let seed = matches
            .get_one::<String>("seed")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("parsing --seed")?
            .unwrap_or(0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        random_equivalence(
            &netlist,
            &result.netlist,
            registry.as_ref(),
            verify_samples,
            &mut rng,
        )
        .context("optimized netlist is not equivalent to the input")?;
        log::info!("optimize; verified on {} samples", verify_samples);
    }

    if parse_bool_flag(matches, "stats_json", false) {
        println!("{}", serde_json::to_string_pretty(&result.stats)?);
    } else {
        print_stats(&result.stats);
    }
    maybe_write_output(matches, &result.netlist)
}

pub fn handle_optimize(matches: &ArgMatches, config: &Option<ToolchainConfig>) {
    if let Err(e) = run_optimize(matches, config) {
        let netlist = matches
            .get_one::<String>("netlist")
            .map(String::as_str)
            .unwrap_or("<none>");
        report_anyhow_error_and_exit(&e, Some("optimize"), vec![("netlist", netlist)]);
    }
}
