//! Integration tests for the flowkit library and binary.
//!
//! These tests validate end-to-end sorting workflows across module
//! boundaries: codec, comparator, spill protocol, and the bounded fan-in
//! merge.

mod helpers;
mod test_sort_command;
mod test_sort_invariants;
mod test_sort_scenarios;
