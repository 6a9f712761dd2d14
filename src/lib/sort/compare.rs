//! Ordered multi-field comparison over node byte slabs.
//!
//! The comparator walks an ordered list of builtin fields and then the
//! layout's derived keys, returning the first non-equal ordering. The
//! `reverse` orientation negates each field's non-zero result individually,
//! so ties always flow to the next configured field. Equal under every field
//! is `Equal`; no tiebreaker on record identity is applied.
//!
//! Addresses compare as unsigned big-endian integers over their full stored
//! width, which realizes dual-stack order (IPv4 is zero-extended at the high
//! end). ICMP type and code compare as zero for non-ICMP records, keeping
//! the ordering total.

use crate::errors::{FlowkitError, Result};
use crate::flow::record::FlowView;
use crate::sort::fields::SortField;
use crate::sort::layout::NodeLayout;
use std::cmp::Ordering;

/// Multi-field node comparator for one sort invocation.
#[derive(Clone)]
pub struct RecordComparator {
    fields: Vec<SortField>,
    layout: NodeLayout,
    reverse: bool,
}

impl RecordComparator {
    /// Builds a comparator over `fields` followed by the layout's derived
    /// keys, oriented by `reverse`.
    #[must_use]
    pub fn new(fields: Vec<SortField>, layout: NodeLayout, reverse: bool) -> Self {
        Self { fields, layout, reverse }
    }

    fn orient(&self, ord: Ordering) -> Ordering {
        if self.reverse { ord.reverse() } else { ord }
    }

    /// Orders two nodes.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering> {
        let va = FlowView::new(a);
        let vb = FlowView::new(b);
        for field in &self.fields {
            let ord = compare_field(*field, va, vb);
            if ord != Ordering::Equal {
                return Ok(self.orient(ord));
            }
        }
        for (placement, key) in self.layout.derived() {
            let range = placement.offset..placement.offset + placement.width;
            let ord = key.compare(&a[range.clone()], &b[range]).map_err(|err| match err {
                FlowkitError::KeyField { .. } => err,
                other => FlowkitError::KeyField {
                    name: key.name().to_string(),
                    reason: other.to_string(),
                },
            })?;
            if ord != Ordering::Equal {
                return Ok(self.orient(ord));
            }
        }
        Ok(Ordering::Equal)
    }

    /// Sorts a slice of node references in place.
    ///
    /// `sort_unstable_by` cannot propagate comparator failures directly, so
    /// the first failure is parked in a cell (remaining comparisons collapse
    /// to `Equal`) and surfaced once the sort returns.
    pub fn sort_nodes(&self, nodes: &mut [&[u8]]) -> Result<()> {
        let mut failure: Option<FlowkitError> = None;
        nodes.sort_unstable_by(|a, b| match self.compare(a, b) {
            Ok(ord) => ord,
            Err(err) => {
                if failure.is_none() {
                    failure = Some(err);
                }
                Ordering::Equal
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn compare_field(field: SortField, a: FlowView<'_>, b: FlowView<'_>) -> Ordering {
    match field {
        SortField::Sip => a.sip_bytes().cmp(b.sip_bytes()),
        SortField::Dip => a.dip_bytes().cmp(b.dip_bytes()),
        SortField::Nhip => a.nhip_bytes().cmp(b.nhip_bytes()),
        SortField::Sport => a.sport().cmp(&b.sport()),
        SortField::Dport => a.dport().cmp(&b.dport()),
        SortField::Proto => a.proto().cmp(&b.proto()),
        SortField::Pkts => a.pkts().cmp(&b.pkts()),
        SortField::Bytes => a.bytes().cmp(&b.bytes()),
        SortField::Flags => a.flags().cmp(&b.flags()),
        SortField::STime => a.stime_ms().cmp(&b.stime_ms()),
        SortField::Elapsed => a.elapsed_ms().cmp(&b.elapsed_ms()),
        SortField::ETime => a.etime_ms().cmp(&b.etime_ms()),
        SortField::Sensor => a.sensor().cmp(&b.sensor()),
        SortField::Input => a.input().cmp(&b.input()),
        SortField::Output => a.output().cmp(&b.output()),
        SortField::InitFlags => a.init_flags().cmp(&b.init_flags()),
        SortField::RestFlags => a.rest_flags().cmp(&b.rest_flags()),
        SortField::TcpState => a.tcp_state().cmp(&b.tcp_state()),
        SortField::Application => a.application().cmp(&b.application()),
        SortField::IcmpType => a.icmp_type().cmp(&b.icmp_type()),
        SortField::IcmpCode => a.icmp_code().cmp(&b.icmp_code()),
    }
}
