//! Integration tests that drive the flowkit binary itself.

use crate::helpers::{read_sports, write_flow_file};
use std::process::Command;
use tempfile::TempDir;

fn flowkit() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flowkit"))
}

#[test]
fn test_sort_command_basic() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[5, 1, 9, 3, 7]);
    let output = dir.path().join("out.flw");

    let status = flowkit()
        .args([
            "sort",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--fields",
            "sport",
        ])
        .status()
        .expect("run flowkit sort");

    assert!(status.success());
    assert_eq!(read_sports(&output), vec![1, 3, 5, 7, 9]);
}

#[test]
fn test_sort_command_reverse_with_tmp_dir() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[1, 2, 3]);
    let output = dir.path().join("out.flw");

    let status = flowkit()
        .args([
            "sort",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--fields",
            "sport",
            "--reverse",
            "--sort-buffer-size",
            "1M",
            "--tmp-dir",
            tmp.path().to_str().unwrap(),
        ])
        .status()
        .expect("run flowkit sort");

    assert!(status.success());
    assert_eq!(read_sports(&output), vec![3, 2, 1]);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_sort_command_presorted() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.flw");
    let b = dir.path().join("b.flw");
    write_flow_file(&a, &[1, 4, 7]);
    write_flow_file(&b, &[2, 3, 8]);
    let output = dir.path().join("out.flw");

    let status = flowkit()
        .args([
            "sort",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--fields",
            "sport",
            "--presorted",
        ])
        .status()
        .expect("run flowkit sort");

    assert!(status.success());
    assert_eq!(read_sports(&output), vec![1, 2, 3, 4, 7, 8]);
}

#[test]
fn test_sort_command_rejects_unknown_field() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[1]);
    let output = dir.path().join("out.flw");

    let result = flowkit()
        .args([
            "sort",
            input.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--fields",
            "country",
        ])
        .output()
        .expect("run flowkit sort");

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("country"));
}

#[test]
fn test_sort_command_rejects_missing_input() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.flw");

    let result = flowkit()
        .args([
            "sort",
            "/nonexistent/flows.flw",
            "--output",
            output.to_str().unwrap(),
        ])
        .output()
        .expect("run flowkit sort");

    assert!(!result.status.success());
}

#[test]
fn test_view_command() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[80, 443]);

    let result = flowkit()
        .args(["view", input.to_str().unwrap(), "--limit", "1"])
        .output()
        .expect("run flowkit view");

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("sIP"));
    assert!(stdout.contains("80"));
    // Limited to one record.
    assert_eq!(stdout.lines().count(), 2);
}
