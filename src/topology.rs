//! Physical topology: nodes, links and the local port numbering on each end.

use std::collections::BTreeMap;

use crate::packet::{Location, PortId, SwitchId};
use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::NetcoreError;

/// What the verifier needs to know about a physical network.
///
/// `edges` lists each undirected link once; `port_toward` gives the local port
/// on `node` that faces `neighbor`.
pub trait PhysicalTopology {
    /// Undirected links, one direction per pair.
    fn edges(&self) -> Vec<(SwitchId, SwitchId)>;

    /// The port on `node` that faces `neighbor`, if they are linked.
    fn port_toward(&self, node: SwitchId, neighbor: SwitchId) -> Option<PortId>;

    /// Both endpoints of every link, in both directions: `(from, to)` pairs of
    /// the location a packet leaves and the location it arrives at.
    fn hops(&self) -> Vec<(Location, Location)> {
        let mut hops = Vec::new();
        for (a, b) in self.edges() {
            if let (Some(pa), Some(pb)) = (self.port_toward(a, b), self.port_toward(b, a)) {
                let ends = (Location::new(a, pa), Location::new(b, pb));
                hops.push(ends);
                hops.push((ends.1, ends.0));
            }
        }
        hops
    }
}

/// Kind of a topology node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// Runs a policy.
    Switch,
    /// Traffic source/sink at the network edge.
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    ports: BTreeMap<SwitchId, PortId>,
}

/// An undirected topology with switch-local port numbering.
///
/// Ports are numbered from 1 on each node in the order links are added.
/// Adding an existing link again (in either direction) is a no-op.
///
/// # Examples
///
/// ```
/// use netcore_slices::{PhysicalTopology, Topology};
///
/// let mut topo = Topology::new();
/// for s in 1..=3 {
///     topo.add_switch(s);
/// }
/// topo.add_link(1, 2)?;
/// topo.add_link(2, 3)?;
///
/// assert_eq!(topo.edges(), vec![(1, 2), (2, 3)]);
/// assert_eq!(topo.port_toward(2, 1), Some(1));
/// assert_eq!(topo.port_toward(2, 3), Some(2));
/// # Ok::<(), netcore_slices::NetcoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Topology {
    nodes: BTreeMap<SwitchId, Node>,
    links: Vec<(SwitchId, SwitchId)>,
}

impl Topology {
    /// An empty topology.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a switch. Re-adding keeps the existing node.
    pub fn add_switch(&mut self, id: SwitchId) {
        self.add_node(id, NodeKind::Switch);
    }

    /// Adds a host. Re-adding keeps the existing node.
    pub fn add_host(&mut self, id: SwitchId) {
        self.add_node(id, NodeKind::Host);
    }

    fn add_node(&mut self, id: SwitchId, kind: NodeKind) {
        self.nodes.entry(id).or_insert_with(|| Node {
            kind,
            ports: BTreeMap::new(),
        });
    }

    /// Links two existing nodes, assigning the next free port on each.
    pub fn add_link(&mut self, a: SwitchId, b: SwitchId) -> Result<(), NetcoreError> {
        if a == b {
            return Err(NetcoreError::InvalidTopology {
                info: format!("self link on node {}", a),
            });
        }
        for id in [a, b] {
            if !self.nodes.contains_key(&id) {
                return Err(NetcoreError::InvalidTopology {
                    info: format!("unknown node {}", id),
                });
            }
        }
        if self.port_toward(a, b).is_some() {
            tracing::trace!(a, b, "link already present");
            return Ok(());
        }
        for (node, neighbor) in [(a, b), (b, a)] {
            if let Some(entry) = self.nodes.get_mut(&node) {
                let next = entry.ports.len() as PortId + 1;
                entry.ports.insert(neighbor, next);
            }
        }
        self.links.push((a, b));
        Ok(())
    }

    /// The kind of a node, if present.
    #[must_use]
    pub fn kind(&self, id: SwitchId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.kind)
    }

    /// Switch ids in ascending order.
    #[must_use]
    pub fn switches(&self) -> Vec<SwitchId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Switch)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Switch ports that face a host, where traffic enters and leaves the network.
    #[must_use]
    pub fn edge_ports(&self) -> Vec<Location> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Switch)
            .flat_map(|(id, n)| {
                n.ports
                    .iter()
                    .filter(|(neighbor, _)| self.kind(**neighbor) == Some(NodeKind::Host))
                    .map(move |(_, port)| Location::new(*id, *port))
            })
            .collect()
    }
}

impl PhysicalTopology for Topology {
    fn edges(&self) -> Vec<(SwitchId, SwitchId)> {
        self.links.clone()
    }

    fn port_toward(&self, node: SwitchId, neighbor: SwitchId) -> Option<PortId> {
        self.nodes.get(&node)?.ports.get(&neighbor).copied()
    }
}

impl InvariantChecker for Topology {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (a, b) in &self.links {
            if self.port_toward(*a, *b).is_none() || self.port_toward(*b, *a).is_none() {
                return Err(InvariantViolation::new("Topology", "link without ports")
                    .with_details(format!("{} -- {}", a, b)));
            }
        }
        for (id, node) in &self.nodes {
            let mut ports: Vec<PortId> = node.ports.values().copied().collect();
            ports.sort_unstable();
            if ports.iter().copied().ne(1..=ports.len() as PortId) {
                return Err(
                    InvariantViolation::new("Topology", "ports are not numbered 1..n")
                        .with_details(format!("node {} has ports {:?}", id, ports)),
                );
            }
            for neighbor in node.ports.keys() {
                if self.port_toward(*neighbor, *id).is_none() {
                    return Err(InvariantViolation::new("Topology", "asymmetric port table")
                        .with_details(format!("{} faces {} but not back", id, neighbor)));
                }
            }
        }
        Ok(())
    }
}
