//! End-to-end sorting scenarios: in-memory, spilling, fan-in cascades, the
//! presorted fast path, reverse order, and empty input.

use crate::helpers::{assert_dir_empty, read_sports, write_flow_file};
use flowkit_lib::flow::record::RECORD_SIZE;
use flowkit_lib::flow::stream::FILE_HEADER_LEN;
use flowkit_lib::sort::{ExternalSorter, SortField};
use tempfile::TempDir;

fn sport_sorter() -> ExternalSorter {
    ExternalSorter::new(vec![SortField::Sport])
}

#[test]
fn test_small_in_memory_sort() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let inputs = vec![
        dir.path().join("a.flw"),
        dir.path().join("b.flw"),
        dir.path().join("c.flw"),
    ];
    write_flow_file(&inputs[0], &[5, 1, 9]);
    write_flow_file(&inputs[1], &[3, 7]);
    write_flow_file(&inputs[2], &[4]);
    let output = dir.path().join("out.flw");

    let stats = sport_sorter()
        .temp_dir(tmp.path().to_path_buf())
        .sort(&inputs, &output)
        .unwrap();

    assert_eq!(read_sports(&output), vec![1, 3, 4, 5, 7, 9]);
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.output_records, 6);
    assert_eq!(stats.runs_written, 0, "small input must not spill");
    assert_dir_empty(tmp.path());
}

#[test]
fn test_single_spill_cycle() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
    let output = dir.path().join("out.flw");

    // Buffer holds exactly 4 records: runs of 4, 4, and 2.
    let stats = sport_sorter()
        .sort_buffer_size((4 * RECORD_SIZE) as u64)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[input], &output)
        .unwrap();

    assert_eq!(read_sports(&output), (0..10).collect::<Vec<u16>>());
    assert_eq!(stats.runs_written, 3);
    assert_eq!(stats.merge_passes, 1);
    assert_dir_empty(tmp.path());
}

#[test]
fn test_fan_in_overflow_cascades() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    // 14 records with a 2-record buffer produce runs 0..=6.
    let keys: Vec<u16> = (0..14).rev().collect();
    write_flow_file(&input, &keys);
    let output = dir.path().join("out.flw");

    // With a window of 3: runs 0..2 merge into run 7, runs 3..5 into run 8,
    // and runs 6..8 merge into the output.
    let stats = sport_sorter()
        .sort_buffer_size((2 * RECORD_SIZE) as u64)
        .max_fan_in(3)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[input], &output)
        .unwrap();

    assert_eq!(read_sports(&output), (0..14).collect::<Vec<u16>>());
    assert_eq!(stats.runs_written, 9, "7 spills plus 2 cascaded runs");
    assert_eq!(stats.merge_passes, 3);
    assert_dir_empty(tmp.path());
}

#[test]
fn test_presorted_fast_path() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let inputs = vec![dir.path().join("a.flw"), dir.path().join("b.flw")];
    write_flow_file(&inputs[0], &[1, 4, 7]);
    write_flow_file(&inputs[1], &[2, 3, 8]);
    let output = dir.path().join("out.flw");

    let stats = sport_sorter()
        .presorted(true)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&inputs, &output)
        .unwrap();

    assert_eq!(read_sports(&output), vec![1, 2, 3, 4, 7, 8]);
    assert_eq!(stats.runs_written, 0, "presorted merge within the window must not spill");
    assert_dir_empty(tmp.path());
}

#[test]
fn test_presorted_cascades_past_window() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let inputs = vec![
        dir.path().join("a.flw"),
        dir.path().join("b.flw"),
        dir.path().join("c.flw"),
    ];
    write_flow_file(&inputs[0], &[1, 10]);
    write_flow_file(&inputs[1], &[2, 9]);
    write_flow_file(&inputs[2], &[3, 8]);
    let output = dir.path().join("out.flw");

    // Window of 2 over 3 inputs: two cascaded runs, then a run merge.
    let stats = sport_sorter()
        .presorted(true)
        .max_fan_in(2)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&inputs, &output)
        .unwrap();

    assert_eq!(read_sports(&output), vec![1, 2, 3, 8, 9, 10]);
    assert_eq!(stats.runs_written, 2);
    assert_dir_empty(tmp.path());
}

#[test]
fn test_reverse_sort() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[1, 2, 3]);
    let output = dir.path().join("out.flw");

    sport_sorter().reverse(true).sort(&[input], &output).unwrap();

    assert_eq!(read_sports(&output), vec![3, 2, 1]);
}

#[test]
fn test_empty_input_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.flw");

    let stats = sport_sorter().sort(&[], &output).unwrap();

    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.output_records, 0);
    assert!(output.is_file());
    assert_eq!(std::fs::metadata(&output).unwrap().len(), FILE_HEADER_LEN as u64);
    assert_eq!(read_sports(&output), Vec::<u16>::new());
}

#[test]
fn test_empty_input_presorted_writes_header_only() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.flw");

    let stats = sport_sorter().presorted(true).sort(&[], &output).unwrap();

    assert_eq!(stats.output_records, 0);
    assert_eq!(std::fs::metadata(&output).unwrap().len(), FILE_HEADER_LEN as u64);
}

#[test]
fn test_input_with_no_records() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.flw");
    let full = dir.path().join("full.flw");
    write_flow_file(&empty, &[]);
    write_flow_file(&full, &[2, 1]);
    let output = dir.path().join("out.flw");

    let stats = sport_sorter().sort(&[empty, full], &output).unwrap();

    assert_eq!(read_sports(&output), vec![1, 2]);
    assert_eq!(stats.total_records, 2);
}
