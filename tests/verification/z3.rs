//! Z3 Verifier Tests
//!
//! End-to-end checks of the [`Verifier`] against Z3: compiler correctness
//! scenarios on small topologies, isolation between slices, and the
//! counterexamples each check produces.
//!
//! ## What These Cover
//!
//! | Check | Scenarios |
//! |-------|-----------|
//! | `simulates` | identical, tag-guarded and tag-rewriting compilations |
//! | `simulates_observes` | lost and extra taps |
//! | `compiled_correctly_in` | with and without edge admission policies |
//! | `simulates_two_hop` | tags carried across a link |
//! | `one_per_edge` | one or several tag values per link |
//! | `isolated` | leaks across a link, separated by tags |
//!
//! ## Running Z3 Tests
//!
//! These tests require the `z3-solver` feature and a system libz3
//! (or `z3-bundled` to build it from source):
//! ```bash
//! cargo test --test verification --features z3-solver -- z3
//! ```

#![cfg(feature = "z3-solver")]
#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use crate::common::{host_topology, init_tracing, line_topology};
use netcore_slices::solver::Z3Backend;
use netcore_slices::symbolic::PacketVar;
use netcore_slices::telemetry::{CheckKind, CheckObserver, CheckOutcome, CollectingObserver};
use netcore_slices::{
    forward, nary_policy_union, Action, EdgePolicy, Field, Location, Policy, Predicate,
    Verifier, VerifierConfig,
};

fn verifier() -> Verifier<Z3Backend> {
    init_tracing();
    Verifier::z3()
}

fn exhaustive() -> Verifier<Z3Backend> {
    init_tracing();
    Verifier::new(Z3Backend::new(), VerifierConfig::exhaustive()).unwrap()
}

fn at(switch: i64, port: i64) -> Predicate {
    Predicate::inport(switch, port)
}

fn vlan(value: i64) -> Predicate {
    Predicate::header(Field::Vlan, value)
}

fn tag(action: Action, value: i64) -> Action {
    action.with_modify(Field::Vlan, value).unwrap()
}

/// Asserts the compiled policy is correct both with and without a topology.
fn assert_compiled(orig: &Policy, result: &Policy) {
    let v = verifier();
    assert!(v.compiled_correctly(orig, result).unwrap(), "{} => {}", orig, result);
    assert!(
        v.compiled_correctly_in(&line_topology(), orig, result, &EdgePolicy::new())
            .unwrap(),
        "{} => {}",
        orig,
        result
    );
}

mod forwards {
    use super::*;

    fn assert_mutual(orig: &Policy, result: &Policy) {
        let v = verifier();
        assert!(v.simulates(orig, result, Field::Vlan).unwrap().is_none());
        assert!(v.simulates(result, orig, Field::Vlan).unwrap().is_none());
    }

    #[test]
    fn identical_policies() {
        let p = at(2, 0).then([Action::new(2, [1])]);
        assert_mutual(&p, &p.clone());

        let p = at(2, 2).then([Action::new(2, [1])]);
        assert_mutual(&p, &p.clone());
    }

    #[test]
    fn tag_guard_is_free() {
        let o = at(2, 2).then([Action::new(2, [1])]);
        let r = (at(2, 2) & vlan(2)).then([Action::new(2, [1])]);
        assert_mutual(&o, &r);
    }

    #[test]
    fn tag_rewrite_is_free() {
        let o = at(2, 2).then([forward(2, 1)]);
        let r = (at(2, 2) & vlan(2)).then([tag(Action::new(2, [1]), 2)]);
        assert_mutual(&o, &r);
    }

    #[test]
    fn wildcard_switch() {
        let o = at(0, 1).then([Action::new(0, [1])]);
        let r = (at(0, 1) & vlan(1)).then([tag(Action::new(0, [1]), 1)]);
        assert_mutual(&o, &r);
    }

    #[test]
    fn extra_headers_are_kept() {
        let guard = at(0, 1)
            & Predicate::header(Field::SrcMac, 32432)
            & Predicate::header(Field::DstMac, 324322);
        let o = guard.clone().then([Action::new(0, [1])]);
        let r = (guard & vlan(1)).then([tag(Action::new(0, [1]), 1)]);
        assert_mutual(&o, &r);
    }

    #[test]
    fn dropped_forwarding_is_found() {
        let o = at(2, 1).then([Action::new(2, [1])]);
        let cx = verifier()
            .simulates(&o, &Policy::Bottom, Field::Vlan)
            .unwrap()
            .unwrap();
        assert_eq!(cx.kind(), CheckKind::Simulation);
        assert_eq!(cx.packets(), &[PacketVar::new("p"), PacketVar::new("pp")]);
    }
}

mod observes {
    use super::*;

    #[test]
    fn nothing_observed() {
        assert!(verifier()
            .simulates_observes(&Policy::Bottom, &Policy::Bottom, Field::Vlan)
            .unwrap()
            .is_none());
    }

    #[test]
    fn same_tap_under_tag() {
        let o = at(1, 1).then([Action::new(1, [2]).with_observe([0])]);
        let r = (at(1, 1) & vlan(1)).then([Action::new(1, [2]).with_observe([0])]);
        assert!(verifier()
            .simulates_observes(&o, &r, Field::Vlan)
            .unwrap()
            .is_none());
    }

    #[test]
    fn extra_tap_is_not_a_loss() {
        let o = at(1, 1).then([Action::new(1, [2])]);
        let r = (at(1, 1) & vlan(1)).then([Action::new(1, [2]).with_observe([0])]);
        assert!(verifier()
            .simulates_observes(&o, &r, Field::Vlan)
            .unwrap()
            .is_none());
    }

    #[test]
    fn lost_tap_is_found() {
        let o = at(1, 1).then([Action::new(1, [2]).with_observe([0])]);
        let r = (at(1, 1) & vlan(1)).then([Action::new(1, [2])]);
        let cx = verifier()
            .simulates_observes(&o, &r, Field::Vlan)
            .unwrap()
            .unwrap();
        assert_eq!(cx.kind(), CheckKind::ObservationSimulation);
    }
}

mod compiled {
    use super::*;

    #[test]
    fn already_tagged_original() {
        let p = (at(2, 2) & vlan(2)).then([Action::new(2, [1])]);
        assert_compiled(&p, &p.clone());
    }

    #[test]
    fn tag_guard() {
        let o = at(2, 2).then([Action::new(2, [1])]);
        let r = (at(2, 2) & vlan(2)).then([Action::new(2, [1])]);
        assert_compiled(&o, &r);
    }

    #[test]
    fn tag_rewrite() {
        let o = at(2, 2).then([forward(2, 1)]);
        let r = (at(2, 2) & vlan(2)).then([tag(Action::new(2, [1]), 2)]);
        assert_compiled(&o, &r);

        let o = at(1, 1).then([Action::new(1, [1])]);
        let r = (at(1, 1) & vlan(1)).then([tag(Action::new(1, [1]), 1)]);
        assert_compiled(&o, &r);
    }

    #[test]
    fn tag_rewrite_with_headers() {
        let guard =
            at(1, 1) & Predicate::header(Field::SrcMac, 33) & Predicate::header(Field::DstMac, 32);
        let o = guard.clone().then([Action::new(1, [1])]);
        let r = (guard & vlan(1)).then([tag(Action::new(1, [1]), 1)]);
        assert_compiled(&o, &r);
    }

    #[test]
    fn dropping_everything_is_wrong() {
        let o = at(2, 1).then([Action::new(2, [1])]);
        let v = verifier();
        assert!(!v.compiled_correctly(&o, &Policy::Bottom).unwrap());
        assert!(!v
            .compiled_correctly_in(&line_topology(), &o, &Policy::Bottom, &EdgePolicy::new())
            .unwrap());
    }

    #[test]
    fn wrong_ingress_is_wrong() {
        let o = at(2, 1).then([Action::new(2, [1])]);
        let r = at(1, 1).then([Action::new(2, [1])]);
        let v = verifier();
        assert!(!v.compiled_correctly(&o, &r).unwrap());
        assert!(!v
            .compiled_correctly_in(&line_topology(), &o, &r, &EdgePolicy::new())
            .unwrap());
    }

    #[test]
    fn wrong_output_port_is_wrong() {
        let o = at(2, 2).then([forward(2, 1)]);
        let r = at(2, 2).then([forward(2, 3)]);
        let v = verifier();
        assert!(!v.compiled_correctly(&o, &r).unwrap());
        assert!(!v
            .compiled_correctly_in(&line_topology(), &o, &r, &EdgePolicy::new())
            .unwrap());
    }

    fn edge_policy() -> EdgePolicy {
        let dstip = Predicate::header(Field::DstIp, 80);
        [(Location::new(1, 1), dstip.clone()), (Location::new(3, 2), dstip)]
            .into_iter()
            .collect()
    }

    #[test]
    fn edge_admission_restricts_the_original() {
        let o = at(1, 1).then([Action::new(1, [2]).with_observe([1])]);
        let r = (at(1, 1) & Predicate::header(Field::DstIp, 80))
            .then([Action::new(1, [2]).with_observe([1])]);
        let v = verifier();
        assert!(v
            .compiled_correctly_in(&host_topology(), &o, &r, &edge_policy())
            .unwrap());
        // Without the admission policy the compiled slice loses traffic.
        assert!(!v
            .compiled_correctly_in(&host_topology(), &o, &r, &EdgePolicy::new())
            .unwrap());
    }

    #[test]
    fn edge_admission_with_tagging_across_a_link() {
        let o = at(1, 1).then([Action::new(1, [2]).with_observe([1])])
            + at(3, 1).then([Action::new(3, [2]).with_observe([2])]);
        let r = (at(1, 1) & Predicate::header(Field::DstIp, 80))
            .then([tag(Action::new(1, [2]), 1).with_observe([1])])
            + (at(3, 1) & vlan(1)).then([tag(Action::new(3, [2]), 0).with_observe([2])]);
        assert!(verifier()
            .compiled_correctly_in(&host_topology(), &o, &r, &edge_policy())
            .unwrap());
    }

    #[test]
    fn composite_reports_once_per_sub_check() {
        let collector = Arc::new(CollectingObserver::new());
        let v = verifier().with_observer(collector.clone() as Arc<dyn CheckObserver>);
        let o = at(2, 2).then([Action::new(2, [1])]);
        let r = (at(2, 2) & vlan(2)).then([Action::new(2, [1])]);

        assert!(v
            .compiled_correctly_in(&line_topology(), &o, &r, &EdgePolicy::new())
            .unwrap());
        assert_eq!(collector.reports_of_kind(CheckKind::Simulation).len(), 2);
        assert_eq!(
            collector
                .reports_of_kind(CheckKind::ObservationSimulation)
                .len(),
            2
        );
        assert_eq!(collector.reports_of_kind(CheckKind::OneTagPerEdge).len(), 1);
        let composite = collector.reports_of_kind(CheckKind::CompiledCorrectly);
        assert_eq!(composite.len(), 1);
        assert_eq!(composite[0].outcome, CheckOutcome::Holds);
        netcore_slices::assert_all_checks_hold!(collector);
    }
}

mod two_hop {
    use super::*;

    fn chain(guards: [(i64, Option<i64>); 2]) -> Policy {
        nary_policy_union(guards.map(|(switch, tag)| {
            let guard = match tag {
                Some(value) => at(switch, 1) & vlan(value),
                None => at(switch, 1),
            };
            guard.then([forward(switch, 2)])
        }))
    }

    #[test]
    fn tag_carried_across_link() {
        let o = chain([(2, None), (3, None)]);
        let r = chain([(2, Some(2)), (3, Some(2))]);
        let v = verifier();
        assert!(v
            .simulates_two_hop(&line_topology(), &o, &r, Field::Vlan)
            .unwrap()
            .is_none());
        assert!(v
            .simulates_two_hop(&line_topology(), &o, &r, Field::SrcMac)
            .unwrap()
            .is_some());
    }

    #[test]
    fn retagged_original() {
        let o = chain([(2, Some(1)), (3, Some(1))]);
        let r = chain([(2, Some(2)), (3, Some(2))]);
        let v = verifier();
        assert!(v
            .simulates_two_hop(&line_topology(), &o, &r, Field::Vlan)
            .unwrap()
            .is_none());
        assert!(v
            .simulates_two_hop(&line_topology(), &o, &r, Field::SrcMac)
            .unwrap()
            .is_some());
    }

    #[test]
    fn per_slice_tags_need_one_tag_per_edge() {
        let o = nary_policy_union([
            at(2, 1).then([forward(2, 2)]),
            at(3, 1).then([forward(3, 2)]),
            at(4, 1).then([forward(4, 2)]),
        ]);
        let r = nary_policy_union([
            (at(2, 1) & vlan(1)).then([forward(2, 2)]),
            (at(3, 1) & vlan(1)).then([forward(3, 2)]),
            (at(3, 1) & vlan(2)).then([forward(3, 2)]),
            (at(4, 1) & vlan(2)).then([forward(4, 2)]),
        ]);
        let topo = line_topology();
        let v = verifier();

        // Hop-by-hop simulation does not notice the tag switching mid-path.
        assert!(v.simulates(&o, &r, Field::Vlan).unwrap().is_none());
        assert!(v.simulates(&r, &o, Field::Vlan).unwrap().is_none());
        assert!(v.compiled_correctly(&o, &r).unwrap());
        assert!(v
            .simulates_two_hop(&topo, &o, &r, Field::Vlan)
            .unwrap()
            .is_none());
        assert!(v
            .simulates_two_hop(&topo, &o, &r, Field::SrcMac)
            .unwrap()
            .is_some());

        // The link check does.
        assert!(!v
            .compiled_correctly_in(&topo, &o, &r, &EdgePolicy::new())
            .unwrap());
    }
}

mod one_per_edge {
    use super::*;

    #[test]
    fn single_tag_per_link() {
        let r = (at(2, 1) & vlan(2)).then([forward(2, 2)])
            + (at(3, 1) & vlan(2)).then([forward(3, 2)]);
        let v = verifier();
        assert!(v
            .one_per_edge(&line_topology(), &r, Field::Vlan)
            .unwrap()
            .is_none());
        assert!(v
            .one_per_edge(&line_topology(), &r, Field::SrcMac)
            .unwrap()
            .is_some());
    }

    #[test]
    fn two_tags_on_one_link() {
        let r = nary_policy_union([
            (at(2, 1) & vlan(1)).then([forward(2, 2)]),
            (at(3, 1) & vlan(1)).then([forward(3, 2)]),
            (at(3, 1) & vlan(2)).then([forward(3, 2)]),
            (at(4, 1) & vlan(2)).then([forward(4, 2)]),
        ]);
        let v = exhaustive();
        let cx = v
            .one_per_edge(&line_topology(), &r, Field::Vlan)
            .unwrap()
            .unwrap();
        assert_eq!(cx.kind(), CheckKind::OneTagPerEdge);

        // Only the link from switch 3 to switch 4 carries both tags.
        let p_out = PacketVar::new("p_out");
        let other_out = PacketVar::new("other_out");
        assert_eq!(cx.evaluate(Field::Switch, p_out), Some(3));
        assert_eq!(cx.evaluate(Field::Port, p_out), Some(2));
        assert_eq!(cx.evaluate(Field::Vlan, p_out), Some(2));
        assert_eq!(cx.evaluate(Field::Vlan, other_out), Some(1));

        assert!(v
            .one_per_edge(&line_topology(), &r, Field::SrcMac)
            .unwrap()
            .is_some());
    }
}

mod not_empty {
    use super::*;

    #[test]
    fn bottom_forwards_nothing() {
        assert!(verifier().not_empty(&Policy::Bottom).unwrap().is_none());
        assert!(verifier()
            .not_empty(&Predicate::Bottom.then([forward(1, 1)]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn witness_is_at_the_guarded_port() {
        let v = exhaustive();
        let policy = (at(2, 3) & vlan(7)).then([tag(Action::new(2, [1]), 8)]);
        let cx = v.not_empty(&policy).unwrap().unwrap();

        let (p_in, p_out) = (PacketVar::new("p_in"), PacketVar::new("p_out"));
        assert_eq!(cx.evaluate(Field::Switch, p_in), Some(2));
        assert_eq!(cx.evaluate(Field::Port, p_in), Some(3));
        assert_eq!(cx.evaluate(Field::Vlan, p_in), Some(7));
        assert_eq!(cx.evaluate(Field::Port, p_out), Some(1));
        assert_eq!(cx.evaluate(Field::Vlan, p_out), Some(8));
        assert!(cx.to_string().contains("p_in:"));

        let json = serde_json::to_value(cx.witness()).unwrap();
        assert_eq!(json["p_in"]["vlan"], 7);
    }

    #[test]
    fn contradictory_guard_forwards_nothing() {
        let policy = (vlan(1) & vlan(2)).then([forward(1, 1)]);
        assert!(verifier().not_empty(&policy).unwrap().is_none());
    }
}

mod equivalence {
    use super::*;

    #[test]
    fn policy_is_equivalent_to_itself() {
        let p = at(1, 1).then([forward(1, 2)]) + vlan(3).then([forward(2, 1)]);
        assert!(verifier().equivalent(&p, &p.clone()).unwrap().is_none());
    }

    #[test]
    fn missing_forwarding_is_found() {
        let p = at(1, 1).then([forward(1, 2)]);
        let cx = verifier().equivalent(&p, &Policy::Bottom).unwrap().unwrap();
        assert_eq!(cx.kind(), CheckKind::Equivalence);
    }
}

mod isolation {
    use super::*;

    #[test]
    fn leak_across_link() {
        let slice1 = at(1, 0).then([forward(1, 2)]);
        let slice2 = at(3, 1).then([forward(3, 2)]);
        let v = verifier();
        assert!(!v.isolated(&host_topology(), &slice1, &slice2).unwrap());

        let diagnostic = v
            .isolated_diagnostic(&host_topology(), &slice1, &slice2)
            .unwrap();
        let stages: Vec<&str> = diagnostic.lines().collect();
        assert_eq!(stages.len(), 7);
        assert_eq!(stages[1], "---policy1--->");
        assert_eq!(stages[3], "---topology-->");
        assert_eq!(stages[5], "---policy2--->");
    }

    #[test]
    fn traffic_to_a_host_is_isolated() {
        let slice1 = at(1, 0).then([forward(1, 1)]);
        let slice2 = at(3, 0).then([forward(3, 2)]);
        let v = verifier();
        assert!(v.isolated(&host_topology(), &slice1, &slice2).unwrap());
        assert_eq!(
            v.isolated_diagnostic(&host_topology(), &slice1, &slice2)
                .unwrap(),
            ""
        );
    }

    #[test]
    fn distinct_tags_isolate() {
        let slice1 = at(1, 0).then([tag(forward(1, 2), 4)]);
        let slice2 = (at(3, 1) & vlan(5)).then([forward(3, 2)]);
        assert!(verifier()
            .isolated(&host_topology(), &slice1, &slice2)
            .unwrap());
    }

    #[test]
    fn leak_witness_follows_the_link() {
        let v = exhaustive();
        let slice1 = at(1, 0).then([forward(1, 2)]);
        let slice2 = at(3, 1).then([forward(3, 2)]);
        let cx = v
            .isolated_model(&host_topology(), &slice1, &slice2)
            .unwrap()
            .unwrap();
        let (pkt2, pkt3) = (PacketVar::new("pkt2"), PacketVar::new("pkt3"));
        assert_eq!(cx.evaluate(Field::Switch, pkt2), Some(1));
        assert_eq!(cx.evaluate(Field::Port, pkt2), Some(2));
        assert_eq!(cx.evaluate(Field::Switch, pkt3), Some(3));
        assert_eq!(cx.evaluate(Field::Port, pkt3), Some(1));
        assert_eq!(cx.evaluate(Field::SrcIp, pkt2), cx.evaluate(Field::SrcIp, pkt3));
    }
}
