// SPDX-License-Identifier: Apache-2.0

//! Uniform error reporting for driver subcommands: a colored headline on
//! stderr, optional `key: value` details, then exit status 1.

use colored::Colorize;

fn headline(subcommand: Option<&str>, message: &str) -> String {
    match subcommand {
        Some(subcommand) => format!("nandsynth-driver: {}: {}", subcommand, message.red().bold()),
        None => format!("nandsynth-driver: {}", message.red().bold()),
    }
}

pub fn report_cli_error_and_exit(
    message: &str,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
) -> ! {
    eprintln!("{}", headline(subcommand, message));
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(1);
}

/// Reports an `anyhow` error with its outermost context as the headline and
/// each underlying cause on its own line.
pub fn report_anyhow_error_and_exit(
    error: &anyhow::Error,
    subcommand: Option<&str>,
    details: Vec<(&str, &str)>,
) -> ! {
    eprintln!("{}", headline(subcommand, &error.to_string()));
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".yellow(), cause);
    }
    for (key, value) in details {
        eprintln!("  {}: {}", key, value);
    }
    std::process::exit(1);
}
