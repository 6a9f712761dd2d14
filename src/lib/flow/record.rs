//! Fixed-width flow record layout and accessors.
//!
//! The record is a contiguous byte slab: integers are little-endian at fixed
//! offsets, addresses are 16 bytes in network byte order. IPv4 addresses are
//! zero-extended at the high end, so unsigned big-endian comparison of the
//! full width orders IPv4 addresses numerically and sorts them below any
//! routable IPv6 address.
//!
//! For ICMP and ICMPv6 flows the destination port field carries the message
//! `type` in its high byte and `code` in its low byte; the dedicated
//! accessors return 0 for non-ICMP records so that comparisons on these
//! fields are total.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Size of one flow record in bytes.
pub const RECORD_SIZE: usize = 88;

/// Width of a stored address in bytes.
pub const ADDR_WIDTH: usize = 16;

/// IANA protocol number for ICMP.
pub const PROTO_ICMP: u8 = 1;
/// IANA protocol number for ICMPv6.
pub const PROTO_ICMPV6: u8 = 58;

// Field offsets within the record slab.
pub(crate) const OFF_SIP: usize = 0;
pub(crate) const OFF_DIP: usize = 16;
pub(crate) const OFF_NHIP: usize = 32;
pub(crate) const OFF_SPORT: usize = 48;
pub(crate) const OFF_DPORT: usize = 50;
pub(crate) const OFF_PROTO: usize = 52;
pub(crate) const OFF_FLAGS: usize = 53;
pub(crate) const OFF_INIT_FLAGS: usize = 54;
pub(crate) const OFF_REST_FLAGS: usize = 55;
pub(crate) const OFF_TCP_STATE: usize = 56;
pub(crate) const OFF_APPLICATION: usize = 57;
pub(crate) const OFF_SENSOR: usize = 59;
pub(crate) const OFF_INPUT: usize = 61;
pub(crate) const OFF_OUTPUT: usize = 63;
pub(crate) const OFF_PKTS: usize = 65;
pub(crate) const OFF_BYTES: usize = 69;
pub(crate) const OFF_STIME: usize = 73;
pub(crate) const OFF_ELAPSED: usize = 81;
// Bytes 85..88 are reserved.

fn read_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn read_u64(data: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[off..off + 8]);
    u64::from_le_bytes(bytes)
}

fn read_addr(data: &[u8], off: usize) -> IpAddr {
    let bytes = &data[off..off + ADDR_WIDTH];
    if bytes[..12].iter().all(|&b| b == 0) {
        IpAddr::V4(Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]))
    } else {
        let mut wide = [0u8; 16];
        wide.copy_from_slice(bytes);
        IpAddr::V6(Ipv6Addr::from(wide))
    }
}

fn write_addr(data: &mut [u8], off: usize, addr: IpAddr) {
    let slot = &mut data[off..off + ADDR_WIDTH];
    match addr {
        IpAddr::V4(v4) => {
            slot[..12].fill(0);
            slot[12..].copy_from_slice(&v4.octets());
        }
        IpAddr::V6(v6) => slot.copy_from_slice(&v6.octets()),
    }
}

/// Borrowed, zero-copy view over the bytes of one flow record.
///
/// The underlying slice may be longer than [`RECORD_SIZE`] (e.g. a sort node
/// carrying a key suffix); only the record prefix is interpreted.
#[derive(Clone, Copy)]
pub struct FlowView<'a> {
    data: &'a [u8],
}

impl<'a> FlowView<'a> {
    /// Wraps a byte slice holding at least one full record.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        debug_assert!(data.len() >= RECORD_SIZE);
        Self { data }
    }

    /// Source address.
    #[must_use]
    pub fn sip(&self) -> IpAddr {
        read_addr(self.data, OFF_SIP)
    }

    /// Destination address.
    #[must_use]
    pub fn dip(&self) -> IpAddr {
        read_addr(self.data, OFF_DIP)
    }

    /// Next-hop address.
    #[must_use]
    pub fn nhip(&self) -> IpAddr {
        read_addr(self.data, OFF_NHIP)
    }

    /// Raw 16 network-order bytes of the source address.
    #[must_use]
    pub fn sip_bytes(&self) -> &'a [u8] {
        &self.data[OFF_SIP..OFF_SIP + ADDR_WIDTH]
    }

    /// Raw 16 network-order bytes of the destination address.
    #[must_use]
    pub fn dip_bytes(&self) -> &'a [u8] {
        &self.data[OFF_DIP..OFF_DIP + ADDR_WIDTH]
    }

    /// Raw 16 network-order bytes of the next-hop address.
    #[must_use]
    pub fn nhip_bytes(&self) -> &'a [u8] {
        &self.data[OFF_NHIP..OFF_NHIP + ADDR_WIDTH]
    }

    /// Source port.
    #[must_use]
    pub fn sport(&self) -> u16 {
        read_u16(self.data, OFF_SPORT)
    }

    /// Destination port. For ICMP flows this carries `type << 8 | code`.
    #[must_use]
    pub fn dport(&self) -> u16 {
        read_u16(self.data, OFF_DPORT)
    }

    /// Transport protocol.
    #[must_use]
    pub fn proto(&self) -> u8 {
        self.data[OFF_PROTO]
    }

    /// Cumulative TCP flags.
    #[must_use]
    pub fn flags(&self) -> u8 {
        self.data[OFF_FLAGS]
    }

    /// TCP flags on the first packet.
    #[must_use]
    pub fn init_flags(&self) -> u8 {
        self.data[OFF_INIT_FLAGS]
    }

    /// TCP flags on all packets after the first.
    #[must_use]
    pub fn rest_flags(&self) -> u8 {
        self.data[OFF_REST_FLAGS]
    }

    /// TCP state machine attributes.
    #[must_use]
    pub fn tcp_state(&self) -> u8 {
        self.data[OFF_TCP_STATE]
    }

    /// Application identifier.
    #[must_use]
    pub fn application(&self) -> u16 {
        read_u16(self.data, OFF_APPLICATION)
    }

    /// Sensor that collected the flow.
    #[must_use]
    pub fn sensor(&self) -> u16 {
        read_u16(self.data, OFF_SENSOR)
    }

    /// Ingress SNMP interface.
    #[must_use]
    pub fn input(&self) -> u16 {
        read_u16(self.data, OFF_INPUT)
    }

    /// Egress SNMP interface.
    #[must_use]
    pub fn output(&self) -> u16 {
        read_u16(self.data, OFF_OUTPUT)
    }

    /// Packet count.
    #[must_use]
    pub fn pkts(&self) -> u32 {
        read_u32(self.data, OFF_PKTS)
    }

    /// Byte count.
    #[must_use]
    pub fn bytes(&self) -> u32 {
        read_u32(self.data, OFF_BYTES)
    }

    /// Flow start time, epoch milliseconds.
    #[must_use]
    pub fn stime_ms(&self) -> u64 {
        read_u64(self.data, OFF_STIME)
    }

    /// Flow duration, milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u32 {
        read_u32(self.data, OFF_ELAPSED)
    }

    /// Flow end time, epoch milliseconds.
    #[must_use]
    pub fn etime_ms(&self) -> u64 {
        self.stime_ms() + u64::from(self.elapsed_ms())
    }

    /// True when the transport protocol is ICMP or ICMPv6.
    #[must_use]
    pub fn is_icmp(&self) -> bool {
        matches!(self.proto(), PROTO_ICMP | PROTO_ICMPV6)
    }

    /// ICMP message type, or 0 for non-ICMP flows.
    #[must_use]
    pub fn icmp_type(&self) -> u8 {
        if self.is_icmp() { (self.dport() >> 8) as u8 } else { 0 }
    }

    /// ICMP message code, or 0 for non-ICMP flows.
    #[must_use]
    pub fn icmp_code(&self) -> u8 {
        if self.is_icmp() { (self.dport() & 0xFF) as u8 } else { 0 }
    }
}

/// Owned flow record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlowRecord {
    data: [u8; RECORD_SIZE],
}

impl Default for FlowRecord {
    fn default() -> Self {
        Self { data: [0u8; RECORD_SIZE] }
    }
}

impl FlowRecord {
    /// Creates an all-zero record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the record bytes.
    #[must_use]
    pub fn view(&self) -> FlowView<'_> {
        FlowView::new(&self.data)
    }

    /// Raw record bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw record bytes (used by the stream reader).
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn set_sip(&mut self, addr: IpAddr) -> &mut Self {
        write_addr(&mut self.data, OFF_SIP, addr);
        self
    }

    pub fn set_dip(&mut self, addr: IpAddr) -> &mut Self {
        write_addr(&mut self.data, OFF_DIP, addr);
        self
    }

    pub fn set_nhip(&mut self, addr: IpAddr) -> &mut Self {
        write_addr(&mut self.data, OFF_NHIP, addr);
        self
    }

    pub fn set_sport(&mut self, port: u16) -> &mut Self {
        self.data[OFF_SPORT..OFF_SPORT + 2].copy_from_slice(&port.to_le_bytes());
        self
    }

    pub fn set_dport(&mut self, port: u16) -> &mut Self {
        self.data[OFF_DPORT..OFF_DPORT + 2].copy_from_slice(&port.to_le_bytes());
        self
    }

    /// Packs an ICMP type and code into the destination port field.
    pub fn set_icmp(&mut self, icmp_type: u8, icmp_code: u8) -> &mut Self {
        self.set_dport(u16::from(icmp_type) << 8 | u16::from(icmp_code))
    }

    pub fn set_proto(&mut self, proto: u8) -> &mut Self {
        self.data[OFF_PROTO] = proto;
        self
    }

    pub fn set_flags(&mut self, flags: u8) -> &mut Self {
        self.data[OFF_FLAGS] = flags;
        self
    }

    pub fn set_init_flags(&mut self, flags: u8) -> &mut Self {
        self.data[OFF_INIT_FLAGS] = flags;
        self
    }

    pub fn set_rest_flags(&mut self, flags: u8) -> &mut Self {
        self.data[OFF_REST_FLAGS] = flags;
        self
    }

    pub fn set_tcp_state(&mut self, state: u8) -> &mut Self {
        self.data[OFF_TCP_STATE] = state;
        self
    }

    pub fn set_application(&mut self, app: u16) -> &mut Self {
        self.data[OFF_APPLICATION..OFF_APPLICATION + 2].copy_from_slice(&app.to_le_bytes());
        self
    }

    pub fn set_sensor(&mut self, sensor: u16) -> &mut Self {
        self.data[OFF_SENSOR..OFF_SENSOR + 2].copy_from_slice(&sensor.to_le_bytes());
        self
    }

    pub fn set_input(&mut self, iface: u16) -> &mut Self {
        self.data[OFF_INPUT..OFF_INPUT + 2].copy_from_slice(&iface.to_le_bytes());
        self
    }

    pub fn set_output(&mut self, iface: u16) -> &mut Self {
        self.data[OFF_OUTPUT..OFF_OUTPUT + 2].copy_from_slice(&iface.to_le_bytes());
        self
    }

    pub fn set_pkts(&mut self, pkts: u32) -> &mut Self {
        self.data[OFF_PKTS..OFF_PKTS + 4].copy_from_slice(&pkts.to_le_bytes());
        self
    }

    pub fn set_bytes(&mut self, bytes: u32) -> &mut Self {
        self.data[OFF_BYTES..OFF_BYTES + 4].copy_from_slice(&bytes.to_le_bytes());
        self
    }

    pub fn set_stime_ms(&mut self, stime: u64) -> &mut Self {
        self.data[OFF_STIME..OFF_STIME + 8].copy_from_slice(&stime.to_le_bytes());
        self
    }

    pub fn set_elapsed_ms(&mut self, elapsed: u32) -> &mut Self {
        self.data[OFF_ELAPSED..OFF_ELAPSED + 4].copy_from_slice(&elapsed.to_le_bytes());
        self
    }
}

impl std::fmt::Debug for FlowRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = self.view();
        f.debug_struct("FlowRecord")
            .field("sip", &v.sip())
            .field("dip", &v.dip())
            .field("sport", &v.sport())
            .field("dport", &v.dport())
            .field("proto", &v.proto())
            .field("pkts", &v.pkts())
            .field("bytes", &v.bytes())
            .field("stime_ms", &v.stime_ms())
            .finish_non_exhaustive()
    }
}
