//! Encoding of predicates, policies and topologies as [`Formula`]s.
//!
//! The encodings mirror the concrete semantics in [`Predicate::matches`] and
//! [`Policy::outputs`]: a packet variable stands for a fully specified packet,
//! and `switch`/`port` are its location.

use std::collections::BTreeMap;

use crate::action::Action;
use crate::packet::{Field, WILDCARD};
use crate::policy::Policy;
use crate::predicate::Predicate;
use crate::topology::PhysicalTopology;

use super::formula::{Formula, PacketVar, Term};

/// A packet variable with some fields replaced by other terms.
///
/// `PacketView::new(p).with(Field::Vlan, Term::Var(v))` reads like `p`
/// everywhere except `vlan`, which reads as `v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketView {
    var: PacketVar,
    overrides: BTreeMap<Field, Term>,
}

impl PacketView {
    /// A view with no overrides.
    #[must_use]
    pub fn new(var: PacketVar) -> Self {
        Self {
            var,
            overrides: BTreeMap::new(),
        }
    }

    /// Replaces one field.
    #[must_use]
    pub fn with(mut self, field: Field, term: Term) -> Self {
        self.overrides.insert(field, term);
        self
    }

    /// The underlying packet variable.
    #[must_use]
    pub const fn var(&self) -> PacketVar {
        self.var
    }

    /// The term a field reads as.
    #[must_use]
    pub fn field(&self, field: Field) -> Term {
        self.overrides
            .get(&field)
            .copied()
            .unwrap_or(Term::Field(field, self.var))
    }
}

impl From<PacketVar> for PacketView {
    fn from(var: PacketVar) -> Self {
        Self::new(var)
    }
}

fn wildcard_or_eq(value: i64, term: Term) -> Formula {
    Formula::or([
        Formula::Const(value == WILDCARD),
        Formula::eq(term, Term::Const(value)),
    ])
}

/// `pred` holds of `packet`.
#[must_use]
pub fn predicate(pred: &Predicate, packet: &PacketView) -> Formula {
    match pred {
        Predicate::Top => Formula::TRUE,
        Predicate::Bottom => Formula::FALSE,
        Predicate::Header(field, value) => wildcard_or_eq(*value, packet.field(*field)),
        Predicate::Location(location) => Formula::and([
            wildcard_or_eq(location.switch, packet.field(Field::Switch)),
            wildcard_or_eq(location.port, packet.field(Field::Port)),
        ]),
        Predicate::Union(p, q) => Formula::or([predicate(p, packet), predicate(q, packet)]),
        Predicate::Intersection(p, q) => {
            Formula::and([predicate(p, packet), predicate(q, packet)])
        }
        Predicate::Difference(p, q) => {
            Formula::and([predicate(p, packet), Formula::not(predicate(q, packet))])
        }
    }
}

fn produces(action: &Action, port: i64, input: &PacketView, output: &PacketView) -> Formula {
    let location = [
        Formula::eq(output.field(Field::Switch), Term::Const(action.switch())),
        Formula::eq(output.field(Field::Port), Term::Const(port)),
    ];
    let payload = Field::payload().map(|field| {
        let expected = action
            .modify()
            .get(&field)
            .map_or(input.field(field), |v| Term::Const(*v));
        Formula::eq(output.field(field), expected)
    });
    Formula::and(location.into_iter().chain(payload))
}

/// `policy` emits `output` when given `input`.
///
/// One disjunct per primitive branch and output port. [`Policy::Bottom`]
/// encodes to `false`.
#[must_use]
pub fn forwards_with(policy: &Policy, input: &PacketView, output: &PacketView) -> Formula {
    Formula::or(policy.primitives().into_iter().map(|(guard, actions)| {
        let emitted = Formula::or(actions.iter().flat_map(|action| {
            action
                .ports()
                .iter()
                .map(move |port| produces(action, *port, input, output))
        }));
        Formula::and([predicate(guard, input), emitted])
    }))
}

/// `policy` emits `output` when given `input`, with no overrides.
#[must_use]
pub fn forwards(policy: &Policy, input: PacketVar, output: PacketVar) -> Formula {
    forwards_with(policy, &input.into(), &output.into())
}

/// `policy` reports `packet` to tap `tap`.
#[must_use]
pub fn observes(policy: &Policy, packet: &PacketView, tap: Term) -> Formula {
    Formula::or(policy.primitives().into_iter().map(|(guard, actions)| {
        let tapped = Formula::or(
            actions
                .iter()
                .flat_map(|action| action.observe().iter())
                .map(|id| Formula::eq(tap, Term::Const(*id))),
        );
        Formula::and([predicate(guard, packet), tapped])
    }))
}

/// A packet leaving at `sent`'s location arrives, unchanged, as `received`
/// on the other end of some physical link.
#[must_use]
pub fn transfer<T: PhysicalTopology + ?Sized>(
    topology: &T,
    sent: PacketVar,
    received: PacketVar,
) -> Formula {
    let at = |var: PacketVar, switch: i64, port: i64| {
        [
            Formula::eq(Term::Field(Field::Switch, var), Term::Const(switch)),
            Formula::eq(Term::Field(Field::Port, var), Term::Const(port)),
        ]
    };
    let crosses = Formula::or(topology.hops().into_iter().map(|(from, to)| {
        Formula::and(
            at(sent, from.switch, from.port)
                .into_iter()
                .chain(at(received, to.switch, to.port)),
        )
    }));
    let unchanged = Field::payload()
        .map(|field| Formula::eq(Term::Field(field, sent), Term::Field(field, received)));
    Formula::and(std::iter::once(crosses).chain(unchanged))
}
