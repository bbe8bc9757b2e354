//! Policies: predicates paired with actions, composed by union.
//!
//! Union branches are not mutually exclusive and carry no priority: a packet
//! matching several branches receives the actions of all of them, in order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Add;

use crate::action::Action;
use crate::address::AddressMap;
use crate::packet::{Location, Packet};
use crate::predicate::{nary_union, Predicate};
use crate::NetcoreError;

/// Per-edge-port admission predicates for a slice.
///
/// Only traffic entering at a listed location that also satisfies that
/// location's predicate may be claimed by the slice.
pub type EdgePolicy = BTreeMap<Location, Predicate>;

/// A forwarding policy.
///
/// # Examples
///
/// ```
/// use netcore_slices::{forward, Field, Location, Packet, Policy, Predicate};
///
/// let policy = Predicate::inport(2, 1).then([forward(2, 2)])
///     + Predicate::header(Field::Vlan, 5).then([forward(2, 3)]);
///
/// // Both branches match: both actions come out, left branch first.
/// let pkt = Packet::new([(Field::Vlan, 5)]);
/// assert_eq!(policy.get_actions(&pkt, Location::new(2, 1)).len(), 2);
/// assert!(policy.get_actions(&Packet::default(), Location::new(9, 9)).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Policy {
    /// Never matches, never yields actions.
    Bottom,
    /// Yields `actions` when `predicate` matches.
    Primitive {
        /// Guard.
        predicate: Predicate,
        /// Actions yielded, in order, when the guard matches.
        actions: Vec<Action>,
    },
    /// Concatenation of both branches' actions.
    Union(Box<Policy>, Box<Policy>),
}

impl Policy {
    /// A primitive policy.
    #[must_use]
    pub fn primitive(predicate: Predicate, actions: impl IntoIterator<Item = Action>) -> Self {
        Self::Primitive {
            predicate,
            actions: actions.into_iter().collect(),
        }
    }

    /// The actions this policy yields for a packet at a location.
    #[must_use]
    pub fn get_actions(&self, packet: &Packet, location: Location) -> Vec<Action> {
        let mut out = Vec::new();
        self.collect_actions(packet, location, &mut out);
        out
    }

    fn collect_actions(&self, packet: &Packet, location: Location, out: &mut Vec<Action>) {
        match self {
            Self::Bottom => {}
            Self::Primitive { predicate, actions } => {
                if predicate.matches(packet, location) {
                    out.extend(actions.iter().cloned());
                }
            }
            Self::Union(left, right) => {
                left.collect_actions(packet, location, out);
                right.collect_actions(packet, location, out);
            }
        }
    }

    /// Every `(packet, location)` the policy emits for an input.
    #[must_use]
    pub fn outputs(&self, packet: &Packet, location: Location) -> Vec<(Packet, Location)> {
        self.get_actions(packet, location)
            .iter()
            .flat_map(|action| action.modify_packet(packet))
            .collect()
    }

    /// Every tap id the policy reports the input to.
    #[must_use]
    pub fn get_observations(&self, packet: &Packet, location: Location) -> BTreeSet<i64> {
        self.get_actions(packet, location)
            .iter()
            .flat_map(|action| action.observe().iter().copied())
            .collect()
    }

    /// Translates every predicate and action into physical addressing,
    /// keeping the shape of the policy. The first failure is returned.
    pub fn get_physical_rep(&self, map: &AddressMap) -> Result<Self, NetcoreError> {
        Ok(match self {
            Self::Bottom => Self::Bottom,
            Self::Primitive { predicate, actions } => Self::Primitive {
                predicate: predicate.get_physical_predicate(map)?,
                actions: actions
                    .iter()
                    .map(|a| a.get_physical_rep(map))
                    .collect::<Result<_, _>>()?,
            },
            Self::Union(left, right) => Self::Union(
                Box::new(left.get_physical_rep(map)?),
                Box::new(right.get_physical_rep(map)?),
            ),
        })
    }

    /// The primitive branches, left to right. [`Policy::Bottom`] contributes nothing.
    #[must_use]
    pub fn primitives(&self) -> Vec<(&Predicate, &[Action])> {
        let mut out = Vec::new();
        self.collect_primitives(&mut out);
        out
    }

    fn collect_primitives<'a>(&'a self, out: &mut Vec<(&'a Predicate, &'a [Action])>) {
        match self {
            Self::Bottom => {}
            Self::Primitive { predicate, actions } => out.push((predicate, actions.as_slice())),
            Self::Union(left, right) => {
                left.collect_primitives(out);
                right.collect_primitives(out);
            }
        }
    }

    fn map_predicates(&self, f: &impl Fn(&Predicate) -> Predicate) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Primitive { predicate, actions } => Self::Primitive {
                predicate: f(predicate),
                actions: actions.clone(),
            },
            Self::Union(left, right) => Self::Union(
                Box::new(left.map_predicates(f)),
                Box::new(right.map_predicates(f)),
            ),
        }
    }
}

/// Folds policies with union. Empty input yields [`Policy::Bottom`].
#[must_use]
pub fn nary_policy_union(policies: impl IntoIterator<Item = Policy>) -> Policy {
    policies
        .into_iter()
        .reduce(|acc, p| acc + p)
        .unwrap_or(Policy::Bottom)
}

/// Restricts a policy's ingress to what an edge policy admits.
///
/// Each branch guard `g` becomes `g & admitted`, where traffic at a listed
/// edge location must satisfy that location's predicate and traffic anywhere
/// else is admitted unchanged.
#[must_use]
pub fn restrict_to_edges(policy: &Policy, edge_policy: &EdgePolicy) -> Policy {
    if edge_policy.is_empty() {
        return policy.clone();
    }
    let at_listed = nary_union(
        edge_policy
            .keys()
            .map(|location| Predicate::Location(*location)),
    );
    let admitted_at_edges = nary_union(
        edge_policy
            .iter()
            .map(|(location, admit)| Predicate::Location(*location) & admit.clone()),
    );
    let admitted = admitted_at_edges | (Predicate::Top - at_listed);
    policy.map_predicates(&|guard| guard.clone() & admitted.clone())
}

impl Add for Policy {
    type Output = Policy;

    fn add(self, rhs: Self) -> Self::Output {
        Policy::Union(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "drop"),
            Self::Primitive { predicate, actions } => {
                write!(f, "{} => [", predicate)?;
                for (i, action) in actions.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", action)?;
                }
                write!(f, "]")
            }
            Self::Union(left, right) => write!(f, "{}\n+ {}", left, right),
        }
    }
}
