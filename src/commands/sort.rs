//! Sort flow files by one or more record fields.
//!
//! Uses the external merge-sort engine: records are collected in a bounded
//! in-memory buffer, sorted runs are spilled to disk when the buffer fills,
//! and runs are merged under a fixed file-handle budget. Inputs that are
//! already sorted can be merged directly with `--presorted`.

use anyhow::{bail, Result};
use clap::Parser;
use flowkit_lib::logging::OperationTimer;
use flowkit_lib::sort::{parse_field_list, ExternalSorter, DEFAULT_SORT_BUFFER_SIZE};
use flowkit_lib::validation::{validate_dir_writable, validate_files_exist};
use log::info;
use std::path::PathBuf;

use crate::commands::command::Command;

/// Sort flow files.
///
/// Sorts flow records from one or more input files into a single output
/// file, ordered by the configured field list.
#[derive(Debug, Parser)]
#[command(
    name = "sort",
    about = "Sort flow files by one or more record fields",
    long_about = r#"
Sort flow records from one or more files using external merge-sort.

The sort holds records in a memory buffer bounded by --sort-buffer-size.
When the buffer fills, sorted runs are written to the temp directory and
merged at the end; arbitrarily large inputs sort within a fixed memory and
file-handle budget.

FIELDS:

  The sort key is an ordered, comma-separated field list. Records compare
  field by field; the first difference decides the order. Available fields:

    sip dip nhip sport dport proto pkts bytes flags stime elapsed etime
    sensor input output initflags restflags tcpstate application
    icmptype icmpcode

EXAMPLES:

  # Sort by the default five-tuple
  flowkit sort flows1.flw flows2.flw -o sorted.flw

  # Largest flows first
  flowkit sort flows.flw -o by-bytes.flw --fields bytes --reverse

  # Merge already-sorted hourly files
  flowkit sort hour*.flw -o day.flw --presorted

  # Constrain memory, spill to a fast disk
  flowkit sort huge.flw -o sorted.flw --sort-buffer-size 64M -T /ssd/tmp
"#
)]
pub struct Sort {
    /// Input flow files, processed in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output flow file.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Comma-separated list of fields to sort by.
    #[arg(short = 'f', long = "fields", default_value = "sip,dip,sport,dport,proto")]
    pub fields: String,

    /// Reverse the sort order.
    #[arg(long = "reverse")]
    pub reverse: bool,

    /// Treat every input as already sorted by the same fields and merge
    /// directly, skipping the in-memory sort.
    #[arg(long = "presorted")]
    pub presorted: bool,

    /// Maximum memory for the in-core sort buffer.
    ///
    /// Accepts values like "512M" or "1G". When the buffer fills, sorted
    /// runs are written to temporary files and merged at the end.
    #[arg(short = 'S', long = "sort-buffer-size", default_value = "256M", value_parser = parse_memory)]
    pub sort_buffer_size: u64,

    /// Temporary directory for spill files.
    ///
    /// If not specified, uses the system default temp directory. For best
    /// performance, use a fast disk on the same volume as the output.
    #[arg(short = 'T', long = "tmp-dir")]
    pub tmp_dir: Option<PathBuf>,
}

/// Parse a memory size string (e.g., "512M", "1G", "2G").
fn parse_memory(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();

    if s.is_empty() {
        return Err("Empty memory specification".to_string());
    }

    let (num_str, multiplier) = if s.ends_with('G') {
        (&s[..s.len() - 1], 1024 * 1024 * 1024)
    } else if s.ends_with('M') {
        (&s[..s.len() - 1], 1024 * 1024)
    } else if s.ends_with('K') {
        (&s[..s.len() - 1], 1024)
    } else {
        // Assume bytes
        (s.as_str(), 1)
    };

    let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {num_str}"))?;

    if num < 0.0 {
        return Err("Memory size must be positive".to_string());
    }

    Ok((num * multiplier as f64) as u64)
}

impl Command for Sort {
    fn execute(&self) -> Result<()> {
        validate_files_exist(&self.inputs, "Input flow file")?;
        if let Some(ref tmp) = self.tmp_dir {
            validate_dir_writable(tmp, "Temp directory")?;
        }
        if self.sort_buffer_size == 0 {
            bail!("--sort-buffer-size must be greater than 0");
        }
        let fields = parse_field_list(&self.fields)?;

        let timer = OperationTimer::new("Sorting flows");

        info!("Inputs: {}", self.inputs.len());
        info!("Output: {}", self.output.display());
        info!("Fields: {}", self.fields);
        if self.reverse {
            info!("Order: descending");
        }
        if self.presorted {
            info!("Presorted inputs: merging directly");
        }
        if self.sort_buffer_size != DEFAULT_SORT_BUFFER_SIZE {
            info!("Sort buffer: {} MB", self.sort_buffer_size / (1024 * 1024));
        }
        if let Some(ref tmp) = self.tmp_dir {
            info!("Temp directory: {}", tmp.display());
        }

        let mut sorter = ExternalSorter::new(fields)
            .reverse(self.reverse)
            .presorted(self.presorted)
            .sort_buffer_size(self.sort_buffer_size);
        if let Some(ref tmp) = self.tmp_dir {
            sorter = sorter.temp_dir(tmp.clone());
        }

        let stats = sorter.sort(&self.inputs, &self.output)?;

        info!("=== Summary ===");
        info!("Records read: {}", stats.total_records);
        info!("Records written: {}", stats.output_records);
        if stats.runs_written > 0 {
            info!("Temporary runs: {}", stats.runs_written);
            info!("Merge passes: {}", stats.merge_passes);
        }
        info!("Output: {}", self.output.display());

        timer.log_completion(stats.output_records);
        Ok(())
    }
}
