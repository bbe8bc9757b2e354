//! Property-based tests for the symbolic encoding.
//!
//! Each property evaluates an encoded formula under the concrete values of a
//! randomly generated packet and compares it with the concrete semantics, so
//! the encoding the solver sees is checked without a solver.
//!
//! # Properties Tested
//!
//! - Predicate encoding agrees with `Predicate::matches`
//! - `forwards` holds exactly for the outputs `Policy::outputs` produces
//! - `observes` holds exactly for the taps `Policy::get_observations` reports
//! - `transfer` holds exactly for the topology's link endpoints
//! - Union/intersection/difference identities with `Top`/`Bottom`
//! - Physical translation of concrete locations follows the port map

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use crate::common::line_topology;
use netcore_slices::symbolic::{
    forwards, observes, predicate, transfer, Assignment, PacketVar, Term,
};
use netcore_slices::{
    nary_policy_union, Action, AddressMap, Field, Location, Packet, PhysicalTopology, Policy,
    Predicate,
};
use proptest::prelude::*;

const P: PacketVar = PacketVar::new("p");
const Q: PacketVar = PacketVar::new("q");

// ============================================================================
// Strategies
// ============================================================================

/// Small values so that wildcards and collisions are common.
fn value_strategy() -> impl Strategy<Value = i64> {
    0i64..4
}

fn field_strategy() -> impl Strategy<Value = Field> {
    prop::sample::select(Field::ALL.to_vec())
}

fn payload_field_strategy() -> impl Strategy<Value = Field> {
    prop::sample::select(Field::payload().collect::<Vec<_>>())
}

/// A location a packet can actually be at: no wildcards.
fn location_strategy() -> impl Strategy<Value = Location> {
    (1i64..4, 1i64..4).prop_map(|(s, p)| Location::new(s, p))
}

/// A packet with every payload field set.
fn packet_strategy() -> impl Strategy<Value = Packet> {
    prop::collection::vec(value_strategy(), 9).prop_map(|values| {
        Packet::new(Field::payload().zip(values))
    })
}

fn predicate_strategy() -> impl Strategy<Value = Predicate> {
    let leaf = prop_oneof![
        Just(Predicate::Top),
        Just(Predicate::Bottom),
        (field_strategy(), value_strategy()).prop_map(|(f, v)| Predicate::header(f, v)),
        (0i64..4, 0i64..4).prop_map(|(s, p)| Predicate::inport(s, p)),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a | b),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a & b),
            (inner.clone(), inner).prop_map(|(a, b)| a - b),
        ]
    })
}

fn action_strategy() -> impl Strategy<Value = Action> {
    (
        0i64..4,
        prop::collection::vec(1i64..4, 0..3),
        prop::option::of((payload_field_strategy(), value_strategy())),
        prop::collection::btree_set(0i64..4, 0..2),
    )
        .prop_map(|(switch, ports, modify, taps)| {
            let action = Action::new(switch, ports).with_observe(taps);
            match modify {
                Some((field, value)) => action.with_modify(field, value).unwrap(),
                None => action,
            }
        })
}

fn policy_strategy() -> impl Strategy<Value = Policy> {
    prop::collection::vec(
        (predicate_strategy(), prop::collection::vec(action_strategy(), 0..3)),
        0..4,
    )
    .prop_map(|branches| {
        nary_policy_union(
            branches
                .into_iter()
                .map(|(guard, actions)| guard.then(actions)),
        )
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn bind(assignment: Assignment, var: PacketVar, packet: &Packet, at: Location) -> Assignment {
    assignment
        .with_packet(var, packet.iter())
        .with_field(var, Field::Switch, at.switch)
        .with_field(var, Field::Port, at.port)
}

// ============================================================================
// Encoding mirrors concrete semantics
// ============================================================================

proptest! {
    /// Encoded predicates agree with `Predicate::matches`
    #[test]
    fn prop_predicate_encoding_matches(
        pred in predicate_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
    ) {
        let formula = predicate(&pred, &P.into());
        let assignment = bind(Assignment::new(), P, &packet, at);
        prop_assert_eq!(formula.eval(&assignment), Some(pred.matches(&packet, at)));
    }

    /// Every concrete output satisfies `forwards`
    #[test]
    fn prop_forwards_holds_for_every_output(
        policy in policy_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
    ) {
        let formula = forwards(&policy, P, Q);
        for (out, out_at) in policy.outputs(&packet, at) {
            let assignment = bind(bind(Assignment::new(), P, &packet, at), Q, &out, out_at);
            prop_assert_eq!(formula.eval(&assignment), Some(true), "{} at {}", out, out_at);
        }
    }

    /// `forwards` admits nothing the policy does not emit
    #[test]
    fn prop_forwards_holds_only_for_outputs(
        policy in policy_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
        candidate in packet_strategy(),
        candidate_at in location_strategy(),
    ) {
        let formula = forwards(&policy, P, Q);
        let assignment = bind(bind(Assignment::new(), P, &packet, at), Q, &candidate, candidate_at);
        let produced = policy
            .outputs(&packet, at)
            .contains(&(candidate.clone(), candidate_at));
        prop_assert_eq!(formula.eval(&assignment), Some(produced));
    }

    /// `observes` holds exactly for the reported taps
    #[test]
    fn prop_observes_matches_taps(
        policy in policy_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
        tap in 0i64..4,
    ) {
        let formula = observes(&policy, &P.into(), Term::Const(tap));
        let assignment = bind(Assignment::new(), P, &packet, at);
        let observed = policy.get_observations(&packet, at).contains(&tap);
        prop_assert_eq!(formula.eval(&assignment), Some(observed));
    }

    /// `transfer` holds exactly between linked endpoints
    #[test]
    fn prop_transfer_follows_links(
        packet in packet_strategy(),
        from in (1i64..6, 1i64..3).prop_map(|(s, p)| Location::new(s, p)),
        to in (1i64..6, 1i64..3).prop_map(|(s, p)| Location::new(s, p)),
    ) {
        let topo = line_topology();
        let formula = transfer(&topo, P, Q);
        let assignment = bind(bind(Assignment::new(), P, &packet, from), Q, &packet, to);
        let linked = topo.hops().contains(&(from, to));
        prop_assert_eq!(formula.eval(&assignment), Some(linked));
    }

    /// Links carry payloads unchanged
    #[test]
    fn prop_transfer_never_changes_payload(
        packet in packet_strategy(),
        field in payload_field_strategy(),
        delta in 1i64..3,
        hop in 0usize..8,
    ) {
        let topo = line_topology();
        let (from, to) = topo.hops()[hop];
        let changed = packet.with(field, packet.get(field).unwrap_or(0) + delta);
        let formula = transfer(&topo, P, Q);
        let same = bind(bind(Assignment::new(), P, &packet, from), Q, &packet, to);
        let different = bind(bind(Assignment::new(), P, &packet, from), Q, &changed, to);
        prop_assert_eq!(formula.eval(&same), Some(true));
        prop_assert_eq!(formula.eval(&different), Some(false));
    }
}

// ============================================================================
// Algebraic identities
// ============================================================================

proptest! {
    /// `Bottom` and `Top` are identities for the predicate operators
    #[test]
    fn prop_bottom_and_top_are_identities(
        pred in predicate_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
    ) {
        let expected = pred.matches(&packet, at);
        prop_assert_eq!((pred.clone() | Predicate::Bottom).matches(&packet, at), expected);
        prop_assert_eq!((pred.clone() & Predicate::Top).matches(&packet, at), expected);
        prop_assert_eq!((pred.clone() - Predicate::Bottom).matches(&packet, at), expected);
        prop_assert!(!(pred - Predicate::Top).matches(&packet, at));
    }

    /// Policy union concatenates actions, left first
    #[test]
    fn prop_union_concatenates_actions(
        left in policy_strategy(),
        right in policy_strategy(),
        packet in packet_strategy(),
        at in location_strategy(),
    ) {
        let mut expected = left.get_actions(&packet, at);
        expected.extend(right.get_actions(&packet, at));
        prop_assert_eq!((left + right).get_actions(&packet, at), expected);
    }

    /// Concrete locations translate through the port map
    #[test]
    fn prop_concrete_locations_translate_through_port_map(
        switch in 1i64..50,
        port in 1i64..50,
        offset in 100i64..200,
    ) {
        let map = AddressMap::new(
            [(switch, switch + offset)],
            [((switch, port), (switch + offset, port + offset))],
        ).unwrap();
        prop_assert_eq!(
            Predicate::inport(switch, port).get_physical_predicate(&map),
            Ok(Predicate::inport(switch + offset, port + offset))
        );
        prop_assert_eq!(
            Predicate::inport(switch, 0).get_physical_predicate(&map),
            Ok(Predicate::inport(switch + offset, 0))
        );
        prop_assert!(Predicate::inport(0, port).get_physical_predicate(&map).is_err());
    }
}
