//! Flow file codec.
//!
//! A flow file is an 8-byte header followed by raw fixed-width records:
//!
//! ```text
//! [magic "FLWK"][version: u16 le][record size: u16 le][records ...]
//! ```
//!
//! The writer emits the header lazily on the first record write; calling
//! [`FlowWriter::finish`] on a writer that never saw a record produces a
//! valid, header-only file. The reader validates the magic, version, and
//! record size on open, so files produced with a different record layout are
//! rejected up front.

use crate::errors::{FlowkitError, Result};
use crate::flow::record::{FlowRecord, RECORD_SIZE};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of every flow file.
pub const FLOW_MAGIC: [u8; 4] = *b"FLWK";

/// Current on-disk format version.
pub const FORMAT_VERSION: u16 = 1;

/// Length of the file header in bytes.
pub const FILE_HEADER_LEN: usize = 8;

/// Read/write buffer size for flow streams.
const STREAM_BUFFER_SIZE: usize = 64 * 1024;

/// Sequential flow-record writer.
pub struct FlowWriter {
    inner: BufWriter<File>,
    path: PathBuf,
    header_written: bool,
    records_written: u64,
}

impl FlowWriter {
    /// Creates (truncating) a flow file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .map_err(|source| FlowkitError::Output { path: path.to_path_buf(), source })?;
        Ok(Self {
            inner: BufWriter::with_capacity(STREAM_BUFFER_SIZE, file),
            path: path.to_path_buf(),
            header_written: false,
            records_written: 0,
        })
    }

    fn output_err(&self, source: std::io::Error) -> FlowkitError {
        FlowkitError::Output { path: self.path.clone(), source }
    }

    fn write_header(&mut self) -> Result<()> {
        let mut header = [0u8; FILE_HEADER_LEN];
        header[..4].copy_from_slice(&FLOW_MAGIC);
        header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        header[6..8].copy_from_slice(&(RECORD_SIZE as u16).to_le_bytes());
        self.inner.write_all(&header).map_err(|e| self.output_err(e))?;
        self.header_written = true;
        Ok(())
    }

    /// Writes the raw bytes of one record, emitting the header first if this
    /// is the first write.
    pub fn write_record(&mut self, record: &[u8]) -> Result<()> {
        debug_assert_eq!(record.len(), RECORD_SIZE);
        if !self.header_written {
            self.write_header()?;
        }
        self.inner.write_all(record).map_err(|e| self.output_err(e))?;
        self.records_written += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Path of the file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes and closes the stream, writing the header first if no record
    /// was ever written.
    pub fn finish(mut self) -> Result<()> {
        if !self.header_written {
            self.write_header()?;
        }
        self.inner.flush().map_err(|e| self.output_err(e))?;
        Ok(())
    }
}

/// Sequential flow-record reader.
#[derive(Debug)]
pub struct FlowReader {
    inner: BufReader<File>,
    path: PathBuf,
    records_read: u64,
}

impl FlowReader {
    /// Opens the flow file at `path` and validates its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|source| FlowkitError::Input { path: path.to_path_buf(), source })?;
        Self::from_file(file, path)
    }

    /// Wraps an already-open file, validating the header.
    pub fn from_file(file: File, path: &Path) -> Result<Self> {
        let mut inner = BufReader::with_capacity(STREAM_BUFFER_SIZE, file);
        let mut header = [0u8; FILE_HEADER_LEN];
        inner.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FlowkitError::InvalidFileFormat {
                    path: path.display().to_string(),
                    reason: "missing or truncated header".to_string(),
                }
            } else {
                FlowkitError::Input { path: path.to_path_buf(), source: e }
            }
        })?;

        if header[..4] != FLOW_MAGIC {
            return Err(FlowkitError::InvalidFileFormat {
                path: path.display().to_string(),
                reason: "bad magic number".to_string(),
            });
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(FlowkitError::InvalidFileFormat {
                path: path.display().to_string(),
                reason: format!("unsupported format version {version}"),
            });
        }
        let record_size = u16::from_le_bytes([header[6], header[7]]) as usize;
        if record_size != RECORD_SIZE {
            return Err(FlowkitError::InvalidFileFormat {
                path: path.display().to_string(),
                reason: format!("record size {record_size} does not match expected {RECORD_SIZE}"),
            });
        }

        Ok(Self { inner, path: path.to_path_buf(), records_read: 0 })
    }

    /// Reads one record into `out`, which must be at least [`RECORD_SIZE`]
    /// bytes. Returns `Ok(false)` on clean end of file.
    pub fn read_record_bytes(&mut self, out: &mut [u8]) -> Result<bool> {
        debug_assert!(out.len() >= RECORD_SIZE);
        let at_eof = self
            .inner
            .fill_buf()
            .map_err(|source| FlowkitError::Input { path: self.path.clone(), source })?
            .is_empty();
        if at_eof {
            return Ok(false);
        }
        self.inner.read_exact(&mut out[..RECORD_SIZE]).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FlowkitError::InvalidFileFormat {
                    path: self.path.display().to_string(),
                    reason: "file ends mid-record".to_string(),
                }
            } else {
                FlowkitError::Input { path: self.path.clone(), source: e }
            }
        })?;
        self.records_read += 1;
        Ok(true)
    }

    /// Reads one record. Returns `Ok(false)` on clean end of file.
    pub fn read_record(&mut self, record: &mut FlowRecord) -> Result<bool> {
        self.read_record_bytes(record.as_bytes_mut())
    }

    /// Number of records read so far.
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
