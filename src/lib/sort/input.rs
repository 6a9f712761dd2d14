//! Input stream hand-out and node fill.
//!
//! Inputs are opened one at a time as the sort engine asks for them. Open
//! failures from descriptor or memory exhaustion are reported as
//! [`NextInput::Exhausted`] so the pre-sorted merge path can cascade instead
//! of failing; every other open failure is fatal.

use crate::errors::{FlowkitError, Result};
use crate::flow::stream::FlowReader;
use crate::sort::layout::NodeLayout;
use crate::sort::spill::is_resource_exhausted;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of asking for the next input stream.
pub enum NextInput {
    /// The next input, opened and header-checked.
    Stream(FlowReader),
    /// Opening failed with `EMFILE`/`ENFILE`/`ENOMEM`. The same input will
    /// be retried on the next call.
    Exhausted {
        /// Path that could not be opened.
        path: PathBuf,
        /// The classifying I/O error.
        source: io::Error,
    },
    /// All inputs have been handed out.
    Done,
}

/// Hands out the configured input streams in order, one at a time.
pub struct InputQueue {
    paths: Vec<PathBuf>,
    next: usize,
}

impl InputQueue {
    /// Creates a queue over `paths` in the given order.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, next: 0 }
    }

    /// Opens the next input. A resource-exhausted open does not consume the
    /// input; calling again after closing other streams retries it.
    pub fn next_input(&mut self) -> Result<NextInput> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(NextInput::Done);
        };
        match File::open(path) {
            Ok(file) => {
                let reader = FlowReader::from_file(file, path)?;
                self.next += 1;
                Ok(NextInput::Stream(reader))
            }
            Err(e) if is_resource_exhausted(&e) => {
                Ok(NextInput::Exhausted { path: path.clone(), source: e })
            }
            Err(e) => Err(FlowkitError::Input { path: path.clone(), source: e }),
        }
    }

    /// Number of inputs not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }
}

/// Reads one record from `reader` into the record prefix of `node` and
/// materializes every derived key into the suffix. Returns `Ok(false)` on
/// clean end of stream.
pub fn fill_node(reader: &mut FlowReader, layout: &NodeLayout, node: &mut [u8]) -> Result<bool> {
    debug_assert_eq!(node.len(), layout.node_size());
    if !reader.read_record_bytes(&mut node[..layout.record_size()])? {
        return Ok(false);
    }
    layout.materialize_suffix(node)?;
    Ok(true)
}
