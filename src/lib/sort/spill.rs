//! Temporary run files for spilled sorted data.
//!
//! Runs are numbered files inside an invocation-private directory created
//! under the caller's temp dir (or the system default). The directory and
//! everything in it are removed when [`SpillDir`] drops, so every exit path
//! of a sort invocation, fatal ones included, cleans up after itself.
//!
//! Opening a run classifies `EMFILE`/`ENFILE`/`ENOMEM` as recoverable
//! resource exhaustion: the merger responds by narrowing its window rather
//! than failing.

use crate::errors::{FlowkitError, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

/// Identifier of one run file; ids are issued sequentially from 0.
pub type RunId = u32;

/// Read/write buffer size for run files.
const RUN_BUFFER_SIZE: usize = 64 * 1024;

/// True for open failures the merge protocol can adapt to by narrowing its
/// fan-in window.
pub(crate) fn is_resource_exhausted(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EMFILE | libc::ENFILE | libc::ENOMEM))
}

/// Error opening an existing run for reading.
#[derive(Debug, Error)]
pub enum OpenRunError {
    /// Out of descriptors or memory; the caller may retry with fewer files open.
    #[error("file handles exhausted")]
    Exhausted(#[source] io::Error),
    /// Any other I/O failure; fatal.
    #[error("I/O error")]
    Io(#[source] io::Error),
}

impl OpenRunError {
    /// Unwraps the underlying I/O error.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        match self {
            OpenRunError::Exhausted(e) | OpenRunError::Io(e) => e,
        }
    }
}

/// Manager for the numbered spill files of one sort invocation.
pub struct SpillDir {
    dir: TempDir,
    node_size: usize,
    next_id: RunId,
}

impl SpillDir {
    /// Creates the invocation-private spill directory under `base`, or under
    /// the system temp dir when `base` is `None`.
    pub fn new(base: Option<&Path>, node_size: usize) -> Result<Self> {
        let dir = match base {
            Some(base) => TempDir::with_prefix_in("flowkit-sort-", base),
            None => TempDir::with_prefix("flowkit-sort-"),
        }
        .map_err(|source| FlowkitError::TempFile { source })?;
        debug!("using {} for spill files", dir.path().display());
        Ok(Self { dir, node_size, next_id: 0 })
    }

    /// Path of the spill directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of run ids issued so far.
    #[must_use]
    pub fn runs_created(&self) -> u32 {
        self.next_id
    }

    fn run_path(&self, id: RunId) -> PathBuf {
        self.dir.path().join(format!("run_{id:06}.spill"))
    }

    /// Allocates the next run id and creates its file for writing.
    pub fn create(&mut self) -> Result<(RunId, RunWriter)> {
        let id = self.next_id;
        let path = self.run_path(id);
        let file = File::create(&path).map_err(|source| FlowkitError::TempFile { source })?;
        self.next_id += 1;
        Ok((id, RunWriter { inner: BufWriter::with_capacity(RUN_BUFFER_SIZE, file), id }))
    }

    /// Opens run `id` for reading.
    pub fn open(&self, id: RunId) -> std::result::Result<RunReader, OpenRunError> {
        let file = File::open(self.run_path(id)).map_err(|e| {
            if is_resource_exhausted(&e) {
                OpenRunError::Exhausted(e)
            } else {
                OpenRunError::Io(e)
            }
        })?;
        Ok(RunReader {
            inner: BufReader::with_capacity(RUN_BUFFER_SIZE, file),
            id,
            node_size: self.node_size,
        })
    }

    /// Unlinks run `id`. Idempotent; other failures are logged, not raised,
    /// because the directory drop removes stragglers anyway.
    pub fn remove(&self, id: RunId) {
        match std::fs::remove_file(self.run_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove run #{id}: {e}"),
        }
    }

    /// Creates a run and writes `nodes` to it in order.
    pub fn write_sorted_run(&mut self, nodes: &[&[u8]]) -> Result<RunId> {
        let (id, mut writer) = self.create()?;
        for node in nodes {
            writer.write_node(node)?;
        }
        writer.finish()?;
        Ok(id)
    }
}

/// Sequential writer for one run file.
pub struct RunWriter {
    inner: BufWriter<File>,
    id: RunId,
}

impl RunWriter {
    /// Run id this writer belongs to.
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Appends one node.
    pub fn write_node(&mut self, node: &[u8]) -> Result<()> {
        self.inner.write_all(node).map_err(|source| FlowkitError::TempFile { source })
    }

    /// Flushes and closes the run.
    pub fn finish(mut self) -> Result<()> {
        self.inner.flush().map_err(|source| FlowkitError::TempFile { source })
    }
}

/// Sequential reader for one run file.
pub struct RunReader {
    inner: BufReader<File>,
    id: RunId,
    node_size: usize,
}

impl RunReader {
    /// Run id this reader belongs to.
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Reads one node into `out`. Returns `Ok(false)` on clean end of file;
    /// a file ending mid-node is a truncated run and fatal.
    pub fn read_node(&mut self, out: &mut [u8]) -> Result<bool> {
        debug_assert_eq!(out.len(), self.node_size);
        let at_eof = self
            .inner
            .fill_buf()
            .map_err(|source| FlowkitError::TempFile { source })?
            .is_empty();
        if at_eof {
            return Ok(false);
        }
        self.inner.read_exact(out).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                FlowkitError::TruncatedRun { id: self.id }
            } else {
                FlowkitError::TempFile { source: e }
            }
        })?;
        Ok(true)
    }
}
