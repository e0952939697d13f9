// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nandsynth_core::netlist::io::{load_netlist, save_netlist};
use nandsynth_core::netlist::Netlist;
use nandsynth_core::optimize::OptimizeStats;
use nandsynth_core::test_utils::{setup_cross_coupled_nands, setup_majority, setup_redundant_or};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn write_netlist(dir: &Path, netlist: &Netlist) -> PathBuf {
    let path = dir.join(format!("{}.json", netlist.name));
    save_netlist(netlist, &path).expect("write netlist");
    path
}

fn run_driver(dir: &Path, args: &[&str]) -> Output {
    let driver = env!("CARGO_BIN_EXE_nandsynth-driver");
    Command::new(driver)
        .current_dir(dir)
        .args(args)
        .output()
        .expect("driver invocation should run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "driver failed: status={:?}\nstdout={}\nstderr={}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
}

#[test]
fn test_optimize_writes_smaller_verified_netlist() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_majority());
    let out_path = temp_dir.path().join("out.json");
    let output = run_driver(
        temp_dir.path(),
        &[
            "optimize",
            input.to_str().unwrap(),
            "--verify_samples=32",
            "--stats_json=true",
            "--output",
            out_path.to_str().unwrap(),
        ],
    );
    assert_success(&output);
    let stats: OptimizeStats =
        serde_json::from_slice(&output.stdout).expect("stats should be JSON");
    assert_eq!(stats.original_gates, 12);
    assert_eq!(stats.optimized_gates, 6);
    assert_eq!(load_netlist(&out_path).unwrap().nand_gates.len(), 6);
}

#[test]
fn test_toolchain_config_supplies_optimizer_defaults() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_majority());
    let toolchain = temp_dir.path().join("custom.toml");
    std::fs::write(&toolchain, "[toolchain.optimizer]\nmax_cone_inputs = 2\n").unwrap();
    let output = run_driver(
        temp_dir.path(),
        &[
            "--toolchain",
            toolchain.to_str().unwrap(),
            "optimize",
            input.to_str().unwrap(),
            "--stats_json=true",
        ],
    );
    assert_success(&output);
    let stats: OptimizeStats = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats.cones_optimized, 0);
    assert_eq!(stats.optimized_gates, stats.original_gates);

    // The command line flag wins over the config value.
    let output = run_driver(
        temp_dir.path(),
        &[
            "--toolchain",
            toolchain.to_str().unwrap(),
            "optimize",
            input.to_str().unwrap(),
            "--max_cone_inputs=3",
            "--stats_json=true",
        ],
    );
    assert_success(&output);
    let stats: OptimizeStats = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats.cones_optimized, 1);
}

#[test]
fn test_missing_toolchain_file_is_reported() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_redundant_or());
    let output = run_driver(
        temp_dir.path(),
        &["--toolchain", "nope.toml", "optimize", input.to_str().unwrap()],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_levelize_prints_summary() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_redundant_or());
    let output = run_driver(temp_dir.path(), &["levelize", input.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("netlist: redundant_or"), "{}", stdout);
    assert!(stdout.contains("nand gates:         8"), "{}", stdout);
}

#[test]
fn test_levelize_reports_latch_loop() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_cross_coupled_nands());
    let output = run_driver(temp_dir.path(), &["levelize", input.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("combinational loop"), "{}", stderr);
    assert!(stderr.contains("q qn"), "{}", stderr);
}

#[test]
fn test_optimize_error_shows_cause_chain() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_cross_coupled_nands());
    let output = run_driver(temp_dir.path(), &["optimize", input.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("optimize: "), "{}", stderr);
    assert!(stderr.contains("optimizing netlist"), "{}", stderr);
    assert!(stderr.contains("caused by:"), "{}", stderr);
    assert!(stderr.contains("combinational loop through"), "{}", stderr);
}

#[test]
fn test_loops_lists_signal_names() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_cross_coupled_nands());
    let output = run_driver(temp_dir.path(), &["loops", input.to_str().unwrap()]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "loop 0: q qn\n");
}

#[test_case("check", "clean\n"; "check")]
#[test_case("loops", "no combinational loops\n"; "loops")]
fn test_clean_netlist(subcommand: &str, want: &str) {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let input = write_netlist(temp_dir.path(), &setup_majority());
    let output = run_driver(temp_dir.path(), &[subcommand, input.to_str().unwrap()]);
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), want);
}

#[test]
fn test_simplify_writes_output() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let mut b = nandsynth_core::netlist::builder::NetlistBuilder::new("consts");
    let a = b.add_input("a");
    let one = b.add_const(true);
    let y = b.add_nand(a, one);
    b.add_output("y", y);
    let input = write_netlist(temp_dir.path(), &b.build());
    let out_path = temp_dir.path().join("simplified.json");
    let output = run_driver(
        temp_dir.path(),
        &[
            "simplify",
            input.to_str().unwrap(),
            "--output",
            out_path.to_str().unwrap(),
        ],
    );
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("inverters rewritten: 1"));
    let simplified = load_netlist(&out_path).unwrap();
    assert_eq!(simplified.nand_gates[0].in1, a);
    assert_eq!(simplified.nand_gates[0].in2, a);
}

#[test]
fn test_version() {
    let temp_dir = tempfile::tempdir().expect("create tempdir");
    let output = run_driver(temp_dir.path(), &["version"]);
    assert_success(&output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );
}
