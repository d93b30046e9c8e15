//! Runs the `tessera` binary end to end.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn tessera(args: &[&str], dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tessera"))
        .args(args)
        .current_dir(dir.path())
        .output()
        .expect("failed to run tessera")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn generate_writes_verilog_to_stdout() {
    let tmp = TempDir::new().unwrap();
    let out = tessera(&["--color", "never", "generate", "--wx", "8", "--wy", "8"], &tmp);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("module IntMultiplier_8x8_16_u_"));
    assert!(text.trim_end().ends_with("endmodule"));
    assert!(stderr(&out).contains("IntMultiplier_8x8_16_u on artix7/"));
}

#[test]
fn generate_from_config_with_every_output() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("tessera.toml"),
        r#"
[multiplier]
wx = 10
wy = 10
w_out = 10
signed = true

[target]
family = "cyclone_v"
frequency = "300MHz"

[tiling]
method = "beam-search"
"#,
    )
    .unwrap();
    let out = tessera(
        &[
            "--quiet",
            "--config",
            "tessera.toml",
            "generate",
            "-o",
            "mult.v",
            "--emit-json",
            "calls.json",
            "--export-tiling",
            "tiling",
            "--test-vectors",
            "20",
        ],
        &tmp,
    );
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).is_empty());

    let verilog = fs::read_to_string(tmp.path().join("mult.v")).unwrap();
    assert!(verilog.contains("module IntMultiplier_10x10_10_s_"));

    let calls: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("calls.json")).unwrap()).unwrap();
    assert_eq!(calls["calls"][0]["call"], "begin_entity");

    assert!(tmp.path().join("tiling/multiplier_tiling.svg").is_file());
    assert!(tmp.path().join("tiling/multiplier_tiling.tex").is_file());

    let vectors = fs::read_to_string(tmp.path().join("test_vectors.txt")).unwrap();
    assert_eq!(vectors.lines().count(), 21);
    assert!(vectors.starts_with("# IntMultiplier_10x10_10_s seed 1"));
}

#[test]
fn invalid_widths_fail_with_a_fatal_diagnostic() {
    let tmp = TempDir::new().unwrap();
    let out = tessera(&["--color", "never", "generate", "--wx", "0", "--wy", "8"], &tmp);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error[E100]"));
    assert!(stdout(&out).is_empty());
}

#[test]
fn missing_widths_are_fatal() {
    let tmp = TempDir::new().unwrap();
    let out = tessera(&["--format", "json", "generate"], &tmp);
    assert_eq!(out.status.code(), Some(1));
    let line = stderr(&out);
    let diag: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(diag["severity"], "Error");
}

#[test]
fn truncation_prints_the_budget() {
    let tmp = TempDir::new().unwrap();
    let out = tessera(&["truncation", "16", "8"], &tmp);
    assert!(out.status.success());
    assert!(stdout(&out).contains("truncated bits   8"));

    let out = tessera(&["--format", "json", "truncation", "16", "8"], &tmp);
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["truncated_bits"], 8);
    assert_eq!(json["error_budget"], 128);
}

#[test]
fn catalog_lists_tiles() {
    let tmp = TempDir::new().unwrap();
    let out = tessera(&["catalog", "--wx", "16", "--wy", "16", "--no-dsp"], &tmp);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("name"));
    assert!(text.lines().count() > 1);
}
