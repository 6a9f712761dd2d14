//! Utilities for generating and inspecting test flow files.

use flowkit_lib::flow::record::FlowRecord;
use flowkit_lib::flow::stream::{FlowReader, FlowWriter};
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

/// Builds a record whose sort-relevant field is the source port; the other
/// fields are filled deterministically from it so records differ beyond the
/// key.
pub fn flow_record(sport: u16) -> FlowRecord {
    let mut rec = FlowRecord::new();
    let [hi, lo] = sport.to_be_bytes();
    rec.set_sip(IpAddr::V4(Ipv4Addr::new(10, 0, hi, lo)))
        .set_dip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))
        .set_sport(sport)
        .set_dport(443)
        .set_proto(6)
        .set_pkts(u32::from(sport) + 1)
        .set_bytes(u32::from(sport) * 40 + 64)
        .set_stime_ms(1_700_000_000_000 + u64::from(sport))
        .set_elapsed_ms(250);
    rec
}

/// Writes one flow file containing `flow_record` entries for `sports` in
/// order.
pub fn write_flow_file(path: &Path, sports: &[u16]) {
    let mut writer = FlowWriter::create(path).expect("create flow file");
    for &sport in sports {
        writer.write_record(flow_record(sport).as_bytes()).expect("write record");
    }
    writer.finish().expect("finish flow file");
}

/// Reads every record of a flow file.
pub fn read_records(path: &Path) -> Vec<FlowRecord> {
    let mut reader = FlowReader::open(path).expect("open flow file");
    let mut rec = FlowRecord::new();
    let mut out = Vec::new();
    while reader.read_record(&mut rec).expect("read record") {
        out.push(rec);
    }
    out
}

/// Reads the source ports of every record of a flow file.
pub fn read_sports(path: &Path) -> Vec<u16> {
    read_records(path).iter().map(|r| r.view().sport()).collect()
}

/// Asserts the directory contains no entries.
pub fn assert_dir_empty(path: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(path)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name())
        .collect();
    assert!(leftovers.is_empty(), "directory {} not empty: {leftovers:?}", path.display());
}
