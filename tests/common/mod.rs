//! Shared fixtures for integration tests.
//!
//! ```ignore
//! mod common;
//! use common::{host_topology, line_topology};
//! ```

#![allow(dead_code, clippy::unwrap_used)]

use netcore_slices::{Field, Packet, Topology};

/// Routes `tracing` output from the verifier into the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Payload values used by the header tests, one distinct value per field.
pub const FIELDS: [(Field, i64); 9] = [
    (Field::SrcMac, 1),
    (Field::DstMac, 2),
    (Field::EthType, 3),
    (Field::SrcIp, 4),
    (Field::DstIp, 5),
    (Field::Vlan, 6),
    (Field::Protocol, 7),
    (Field::SrcPort, 8),
    (Field::DstPort, 9),
];

/// Every payload field set to its [`FIELDS`] value.
pub fn full_packet() -> Packet {
    Packet::new(FIELDS)
}

/// Every payload field set to the negation of its [`FIELDS`] value.
pub fn negated_packet() -> Packet {
    Packet::new(FIELDS.map(|(f, v)| (f, -v)))
}

/// Five switches in a line.
///
/// ```text
/// (1)1--1(2)2--1(3)2--1(4)2--1(5)
/// ```
pub fn line_topology() -> Topology {
    let mut topo = Topology::new();
    for s in 1..=5 {
        topo.add_switch(s);
    }
    for s in 1..5 {
        topo.add_link(s, s + 1).unwrap();
    }
    topo
}

/// Two switches, each with one host.
///
/// ```text
///  (1)2--1(3)
///   1      2
///   |      |
///  [2]    [4]
/// ```
pub fn host_topology() -> Topology {
    let mut topo = Topology::new();
    topo.add_switch(1);
    topo.add_host(2);
    topo.add_switch(3);
    topo.add_host(4);
    topo.add_link(1, 2).unwrap();
    topo.add_link(1, 3).unwrap();
    topo.add_link(3, 4).unwrap();
    topo
}
