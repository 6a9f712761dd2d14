//! Builtin sortable flow fields and `--fields` list parsing.

use crate::errors::{FlowkitError, Result};
use std::fmt;
use std::str::FromStr;

/// A builtin flow-record field that records can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Source address
    Sip,
    /// Destination address
    Dip,
    /// Next-hop address
    Nhip,
    /// Source port
    Sport,
    /// Destination port
    Dport,
    /// Transport protocol
    Proto,
    /// Packet count
    Pkts,
    /// Byte count
    Bytes,
    /// Cumulative TCP flags
    Flags,
    /// Start time
    STime,
    /// Duration
    Elapsed,
    /// End time (start + duration)
    ETime,
    /// Sensor id
    Sensor,
    /// Ingress SNMP interface
    Input,
    /// Egress SNMP interface
    Output,
    /// TCP flags on the first packet
    InitFlags,
    /// TCP flags after the first packet
    RestFlags,
    /// TCP state attributes
    TcpState,
    /// Application id
    Application,
    /// ICMP message type (0 for non-ICMP flows)
    IcmpType,
    /// ICMP message code (0 for non-ICMP flows)
    IcmpCode,
}

impl SortField {
    /// All builtin fields, in display order.
    pub const ALL: &'static [SortField] = &[
        SortField::Sip,
        SortField::Dip,
        SortField::Nhip,
        SortField::Sport,
        SortField::Dport,
        SortField::Proto,
        SortField::Pkts,
        SortField::Bytes,
        SortField::Flags,
        SortField::STime,
        SortField::Elapsed,
        SortField::ETime,
        SortField::Sensor,
        SortField::Input,
        SortField::Output,
        SortField::InitFlags,
        SortField::RestFlags,
        SortField::TcpState,
        SortField::Application,
        SortField::IcmpType,
        SortField::IcmpCode,
    ];

    /// Canonical field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SortField::Sip => "sip",
            SortField::Dip => "dip",
            SortField::Nhip => "nhip",
            SortField::Sport => "sport",
            SortField::Dport => "dport",
            SortField::Proto => "proto",
            SortField::Pkts => "pkts",
            SortField::Bytes => "bytes",
            SortField::Flags => "flags",
            SortField::STime => "stime",
            SortField::Elapsed => "elapsed",
            SortField::ETime => "etime",
            SortField::Sensor => "sensor",
            SortField::Input => "input",
            SortField::Output => "output",
            SortField::InitFlags => "initflags",
            SortField::RestFlags => "restflags",
            SortField::TcpState => "tcpstate",
            SortField::Application => "application",
            SortField::IcmpType => "icmptype",
            SortField::IcmpCode => "icmpcode",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortField {
    type Err = FlowkitError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        SortField::ALL
            .iter()
            .find(|field| field.name() == lowered)
            .copied()
            .ok_or_else(|| FlowkitError::UnknownField { name: s.trim().to_string() })
    }
}

/// The default sort key: the classic five-tuple.
#[must_use]
pub fn default_fields() -> Vec<SortField> {
    vec![SortField::Sip, SortField::Dip, SortField::Sport, SortField::Dport, SortField::Proto]
}

/// Parses a comma-separated field list such as `"sip,dport,stime"`.
///
/// # Errors
/// Returns an error for unknown or duplicated field names, or an empty list.
pub fn parse_field_list(list: &str) -> Result<Vec<SortField>> {
    let mut fields = Vec::new();
    for name in list.split(',') {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let field: SortField = name.parse()?;
        if fields.contains(&field) {
            return Err(FlowkitError::InvalidParameter {
                parameter: "fields".to_string(),
                reason: format!("field '{field}' listed more than once"),
            });
        }
        fields.push(field);
    }
    if fields.is_empty() {
        return Err(FlowkitError::InvalidParameter {
            parameter: "fields".to_string(),
            reason: "at least one sort field is required".to_string(),
        });
    }
    Ok(fields)
}
