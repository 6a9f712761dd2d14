//! Property-style invariants of the sort engine: permutation, ordering,
//! reversibility, fast-path equivalence, idempotence, and temp-file
//! cleanup on both success and fatal failure.

use crate::helpers::{assert_dir_empty, flow_record, read_records, read_sports, write_flow_file};
use flowkit_lib::errors::{FlowkitError, Result};
use flowkit_lib::flow::record::{FlowView, RECORD_SIZE};
use flowkit_lib::flow::stream::FlowWriter;
use flowkit_lib::sort::{DerivedKey, ExternalSorter, SortField};
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn sport_sorter() -> ExternalSorter {
    ExternalSorter::new(vec![SortField::Sport])
}

/// Shuffled keys with duplicates, enough to force several spill cycles with
/// a small buffer.
fn shuffled_keys(n: usize) -> Vec<u16> {
    let mut keys: Vec<u16> = (0..n).map(|i| (i % 500) as u16).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys
}

#[test]
fn test_permutation_and_order_with_spills() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    let keys = shuffled_keys(5000);
    write_flow_file(&input, &keys);
    let output = dir.path().join("out.flw");

    sport_sorter()
        .sort_buffer_size((64 * RECORD_SIZE) as u64)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[input], &output)
        .unwrap();

    let sorted = read_sports(&output);

    // Order: every consecutive pair is non-decreasing.
    assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

    // Permutation: the output multiset equals the input multiset.
    let mut expected = keys;
    expected.sort_unstable();
    assert_eq!(sorted, expected);

    assert_dir_empty(tmp.path());
}

#[test]
fn test_reversibility() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    // Distinct keys so the two orders are exact mirrors.
    let mut keys: Vec<u16> = (0..1000).collect();
    keys.shuffle(&mut rand::thread_rng());
    write_flow_file(&input, &keys);

    let forward = dir.path().join("fwd.flw");
    let backward = dir.path().join("rev.flw");
    sport_sorter().sort(&[input.clone()], &forward).unwrap();
    sport_sorter().reverse(true).sort(&[input], &backward).unwrap();

    let mut fwd = read_sports(&forward);
    fwd.reverse();
    assert_eq!(fwd, read_sports(&backward));
}

#[test]
fn test_fast_path_equivalence() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        dir.path().join("a.flw"),
        dir.path().join("b.flw"),
        dir.path().join("c.flw"),
    ];
    // Individually sorted inputs with interleaved and duplicated keys.
    write_flow_file(&inputs[0], &sorted((0..300).map(|i| i * 3 % 700).collect()));
    write_flow_file(&inputs[1], &sorted((0..200).map(|i| i * 7 % 700).collect()));
    write_flow_file(&inputs[2], &sorted((0..100).map(|i| i * 11 % 700).collect()));

    let via_random = dir.path().join("random.flw");
    let via_presorted = dir.path().join("presorted.flw");
    sport_sorter().sort(&inputs, &via_random).unwrap();
    sport_sorter().presorted(true).sort(&inputs, &via_presorted).unwrap();

    assert_eq!(read_sports(&via_random), read_sports(&via_presorted));
    assert_eq!(
        std::fs::read(&via_random).unwrap().len(),
        std::fs::read(&via_presorted).unwrap().len()
    );
}

#[test]
fn test_idempotence_on_sorted_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    let keys: Vec<u16> = (0..500).collect();
    write_flow_file(&input, &keys);
    let output = dir.path().join("out.flw");

    sport_sorter().sort(&[input.clone()], &output).unwrap();

    // Byte-identical record sequence.
    assert_eq!(std::fs::read(&input).unwrap(), std::fs::read(&output).unwrap());
}

#[test]
fn test_multi_field_ordering() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    let output = dir.path().join("out.flw");

    // Same sport, differing dport; sport alone cannot decide the order.
    let mut writer = FlowWriter::create(&input).unwrap();
    for (sport, dport) in [(2u16, 9u16), (1, 5), (2, 1), (1, 8), (1, 2)] {
        let mut rec = flow_record(sport);
        rec.set_dport(dport);
        writer.write_record(rec.as_bytes()).unwrap();
    }
    writer.finish().unwrap();

    ExternalSorter::new(vec![SortField::Sport, SortField::Dport])
        .sort(&[input], &output)
        .unwrap();

    let pairs: Vec<(u16, u16)> =
        read_records(&output).iter().map(|r| (r.view().sport(), r.view().dport())).collect();
    assert_eq!(pairs, vec![(1, 2), (1, 5), (1, 8), (2, 1), (2, 9)]);
}

/// Orders by the bitwise complement of the source port, so ascending key
/// order is descending port order.
struct InvertedPortKey;

impl DerivedKey for InvertedPortKey {
    fn name(&self) -> &str {
        "inverted-port"
    }

    fn width(&self) -> usize {
        2
    }

    fn materialize(&self, record: FlowView<'_>, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(&(!record.sport()).to_be_bytes());
        Ok(())
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        Ok(a.cmp(b))
    }
}

#[test]
fn test_derived_key_spills_and_merges() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    let mut keys: Vec<u16> = (0..200).collect();
    keys.shuffle(&mut rand::thread_rng());
    write_flow_file(&input, &keys);
    let output = dir.path().join("out.flw");

    let node_size = RECORD_SIZE + 2;
    ExternalSorter::new(Vec::new())
        .derived_key(Arc::new(InvertedPortKey))
        .sort_buffer_size((16 * node_size) as u64)
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[input], &output)
        .unwrap();

    let expected: Vec<u16> = (0..200).rev().collect();
    assert_eq!(read_sports(&output), expected);
    assert_dir_empty(tmp.path());
}

/// A key whose comparison always fails, driving the fatal-error path.
struct PoisonKey;

impl DerivedKey for PoisonKey {
    fn name(&self) -> &str {
        "poison"
    }

    fn width(&self) -> usize {
        1
    }

    fn materialize(&self, _record: FlowView<'_>, _out: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn compare(&self, _a: &[u8], _b: &[u8]) -> Result<Ordering> {
        Err(FlowkitError::KeyField {
            name: "poison".to_string(),
            reason: "comparison unavailable".to_string(),
        })
    }
}

#[test]
fn test_fatal_error_cleans_temp_dir() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let input = dir.path().join("in.flw");
    write_flow_file(&input, &[3, 1, 2]);
    let output = dir.path().join("out.flw");

    let err = ExternalSorter::new(Vec::new())
        .derived_key(Arc::new(PoisonKey))
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[input], &output)
        .unwrap_err();

    assert!(err.to_string().contains("poison"));
    assert_dir_empty(tmp.path());
}

#[test]
fn test_missing_input_is_fatal_and_cleans_up() {
    let dir = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let output = dir.path().join("out.flw");

    let err = sport_sorter()
        .temp_dir(tmp.path().to_path_buf())
        .sort(&[Path::new("/nonexistent/flows.flw").to_path_buf()], &output)
        .unwrap_err();

    assert!(matches!(err, FlowkitError::Input { .. }));
    assert_dir_empty(tmp.path());
}

fn sorted(mut keys: Vec<u16>) -> Vec<u16> {
    keys.sort_unstable();
    keys
}
