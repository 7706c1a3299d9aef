//! CLI end-to-end tests for the `cc0` binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

fn cc0() -> Command {
    Command::new(PathBuf::from(env!("CARGO_BIN_EXE_cc0")))
}

fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

#[test]
fn test_help_exits_zero() {
    cc0()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_no_mode_prints_usage_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "prog.c0", "int main() { return 0; }");

    cc0()
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_text_output() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "prog.c0", "int main() { print(1 + 2 * 3); return 0; }");
    let output = dir.path().join("prog.s");

    cc0()
        .arg("-s")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let listing = fs::read_to_string(&output).unwrap();
    assert!(listing.contains(".constants:"));
    assert!(listing.contains("ipush 1\nipush 2\nipush 3\nimul\niadd\niprint\nprintl\n"));
}

#[test]
fn test_binary_output_has_the_magic() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "prog.c0", "int main() { return 0; }");
    let output = dir.path().join("prog.o");

    cc0()
        .arg("-c")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..8], &[0x43, 0x30, 0x3a, 0x29, 0x00, 0x00, 0x00, 0x01]);
}

#[test]
fn test_default_output_name_is_out() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "prog.c0", "int main() { return 0; }");

    cc0()
        .current_dir(dir.path())
        .arg("-s")
        .arg(&input)
        .assert()
        .success();

    assert!(dir.path().join("out").exists());
}

#[test]
fn test_missing_source_exits_one() {
    let dir = TempDir::new().unwrap();

    cc0()
        .arg("-s")
        .arg(dir.path().join("nope.c0"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Fatal"));
}

#[test]
fn test_lexical_error_exits_two() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "bad.c0", "int main() { return 0 @ 1; }");

    cc0()
        .arg("-s")
        .arg(&input)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized token"));
}

#[test]
fn test_analyzer_error_exits_three() {
    let dir = TempDir::new().unwrap();
    let input = write_source(
        &dir,
        "bad.c0",
        "int main() { const int c = 1; c = 2; return 0; }",
    );

    cc0()
        .arg("-s")
        .arg(&input)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("constant"));
}

#[test]
fn test_missing_main_exits_four() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "nomain.c0", "int helper() { return 1; }");

    cc0()
        .arg("-s")
        .arg(&input)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("main"));
}

#[test]
fn test_overflow_warning_goes_to_stderr_but_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write_source(
        &dir,
        "warn.c0",
        "int main() { print(99999999999); return 0; }",
    );
    let output = dir.path().join("warn.s");

    cc0()
        .arg("-s")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning"));
}

#[test]
fn test_binary_mode_wins_over_text_mode() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "prog.c0", "int main() { return 0; }");
    let output = dir.path().join("prog.bin");

    cc0()
        .arg("-s")
        .arg("-c")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[..4], &[0x43, 0x30, 0x3a, 0x29]);
}
