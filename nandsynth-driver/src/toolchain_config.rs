// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use nandsynth_core::optimize::OptimizeOptions;
use serde::Deserialize;

/// Top-level shape of a `nandsynth-toolchain.toml` file.
#[derive(Deserialize)]
struct NandsynthToolchain {
    toolchain: ToolchainConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ToolchainConfig {
    /// Defaults for the `optimize` subcommand.
    pub optimizer: Option<OptimizerConfig>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct OptimizerConfig {
    /// Cones with more distinct inputs than this are left alone.
    pub max_cone_inputs: Option<usize>,

    /// Minimum estimated gate savings, in percent, for a rewrite to be kept.
    pub min_savings_percent: Option<f64>,

    pub verbose: Option<bool>,

    /// Wall-clock budget for the whole optimization run.
    pub time_budget_ms: Option<u64>,

    /// Bound on Quine-McCluskey merge steps per cone.
    pub max_merge_steps: Option<usize>,

    /// Random-simulation samples used to verify the optimized netlist.
    pub verify_samples: Option<usize>,
}

pub fn parse_toolchain_config(text: &str) -> Result<ToolchainConfig> {
    let toolchain: NandsynthToolchain =
        toml::from_str(text).context("parsing toolchain config")?;
    Ok(toolchain.toolchain)
}

pub fn load_toolchain_config(path: &Path) -> Result<ToolchainConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading toolchain config '{}'", path.display()))?;
    parse_toolchain_config(&text).with_context(|| format!("in '{}'", path.display()))
}

fn optimizer_config(config: &Option<ToolchainConfig>) -> Option<&OptimizerConfig> {
    config.as_ref().and_then(|c| c.optimizer.as_ref())
}

fn parse_flag<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match matches.get_one::<String>(name) {
        Some(text) => text
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid --{} value '{}': {}", name, text, e)),
        None => Ok(None),
    }
}

/// Builds optimizer options from the command line flag, if specified, then the
/// toolchain config, then the library default.
pub fn get_optimize_options(
    matches: &ArgMatches,
    config: &Option<ToolchainConfig>,
) -> Result<OptimizeOptions> {
    let defaults = OptimizeOptions::default();
    let from_config = optimizer_config(config);
    let max_cone_inputs = parse_flag::<usize>(matches, "max_cone_inputs")?
        .or_else(|| from_config.and_then(|c| c.max_cone_inputs))
        .unwrap_or(defaults.max_cone_inputs);
    let min_savings_percent = parse_flag::<f64>(matches, "min_savings_percent")?
        .or_else(|| from_config.and_then(|c| c.min_savings_percent))
        .unwrap_or(defaults.min_savings_percent);
    let verbose = parse_flag::<bool>(matches, "verbose")?
        .or_else(|| from_config.and_then(|c| c.verbose))
        .unwrap_or(defaults.verbose);
    let time_budget = parse_flag::<u64>(matches, "time_budget_ms")?
        .or_else(|| from_config.and_then(|c| c.time_budget_ms))
        .map(Duration::from_millis)
        .or(defaults.time_budget);
    let max_merge_steps = parse_flag::<usize>(matches, "max_merge_steps")?
        .or_else(|| from_config.and_then(|c| c.max_merge_steps))
        .or(defaults.max_merge_steps);
    Ok(OptimizeOptions {
        max_cone_inputs,
        min_savings_percent,
        verbose,
        time_budget,
        max_merge_steps,
    })
}

/// Number of random verification samples; zero disables verification.
pub fn get_verify_samples(matches: &ArgMatches, config: &Option<ToolchainConfig>) -> Result<usize> {
    Ok(parse_flag::<usize>(matches, "verify_samples")?
        .or_else(|| optimizer_config(config).and_then(|c| c.verify_samples))
        .unwrap_or(0))
}
