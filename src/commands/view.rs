//! Dump a flow file as human-readable text.

use anyhow::Result;
use clap::Parser;
use flowkit_lib::flow::record::FlowRecord;
use flowkit_lib::flow::stream::FlowReader;
use flowkit_lib::validation::validate_file_exists;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::commands::command::Command;

/// View a flow file.
///
/// Prints flow records as a text table, one record per line.
#[derive(Debug, Parser)]
#[command(
    name = "view",
    about = "Dump a flow file as text",
    long_about = r#"
Print the records of a flow file as a text table.

EXAMPLES:

  # Show a whole file
  flowkit view flows.flw

  # Show the first ten records
  flowkit view flows.flw --limit 10
"#
)]
pub struct View {
    /// Input flow file.
    pub input: PathBuf,

    /// Stop after this many records.
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<u64>,
}

impl Command for View {
    fn execute(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input flow file")?;

        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        writeln!(
            out,
            "{:>39}|{:>39}|{:>5}|{:>5}|{:>5}|{:>10}|{:>10}|{:>13}|{:>9}|",
            "sIP", "dIP", "sPort", "dPort", "proto", "packets", "bytes", "sTime(ms)", "dur(ms)"
        )?;

        let mut reader = FlowReader::open(&self.input)?;
        let mut rec = FlowRecord::new();
        let mut shown = 0u64;
        while reader.read_record(&mut rec)? {
            let v = rec.view();
            writeln!(
                out,
                "{:>39}|{:>39}|{:>5}|{:>5}|{:>5}|{:>10}|{:>10}|{:>13}|{:>9}|",
                v.sip(),
                v.dip(),
                v.sport(),
                v.dport(),
                v.proto(),
                v.pkts(),
                v.bytes(),
                v.stime_ms(),
                v.elapsed_ms()
            )?;
            shown += 1;
            if self.limit.is_some_and(|limit| shown >= limit) {
                break;
            }
        }
        out.flush()?;
        Ok(())
    }
}
