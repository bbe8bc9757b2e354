//! Decision procedures over policies.
//!
//! Every check builds one closed [`Query`], hands it to the configured
//! [`SolverBackend`], and reads the answer back:
//!
//! - `Ok(None)`: no counterexample exists (the query is unsatisfiable).
//! - `Ok(Some(cx))`: a [`Counterexample`] whose packets can be inspected field
//!   by field. Fields the solver left unconstrained are absent.
//! - `Err(NetcoreError::SolverUnknown { .. })`: the solver gave up. This is
//!   never folded into either of the other two.
//!
//! Checks are independent: each runs in its own solver context and the
//! verifier holds no state between calls. Each call opens a `tracing` span
//! and emits exactly one [`CheckReport`] to the configured observer
//! ([`TracingObserver`] by default). The composite checks
//! ([`Verifier::compiled_correctly`] and [`Verifier::compiled_correctly_in`])
//! additionally report their sub-checks.
//!
//! Packet variables in witnesses are named per check and are listed on each
//! method; look them up with [`PacketVar::new`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use web_time::Instant;

use crate::config::VerifierConfig;
use crate::packet::Field;
use crate::policy::{restrict_to_edges, EdgePolicy, Policy};
use crate::solver::{FieldsDisplay, Query, SatOutcome, SolverBackend, Witness};
use crate::symbolic::{
    forwards, forwards_with, observes, transfer, Formula, IntVar, PacketVar, PacketView, Term,
};
use crate::telemetry::{CheckKind, CheckObserver, CheckOutcome, CheckReport, TracingObserver};
use crate::topology::PhysicalTopology;
use crate::NetcoreError;

const P_IN: PacketVar = PacketVar::new("p_in");
const P_OUT: PacketVar = PacketVar::new("p_out");

const P: PacketVar = PacketVar::new("p");
const PP: PacketVar = PacketVar::new("pp");
const Q: PacketVar = PacketVar::new("q");
const QQ: PacketVar = PacketVar::new("qq");

const P1_IN: PacketVar = PacketVar::new("p1_in");
const P1_OUT: PacketVar = PacketVar::new("p1_out");
const P2_IN: PacketVar = PacketVar::new("p2_in");
const P2_OUT1: PacketVar = PacketVar::new("p2_out1");
const P2_OUT2: PacketVar = PacketVar::new("p2_out2");

const PKT1: PacketVar = PacketVar::new("pkt1");
const PKT2: PacketVar = PacketVar::new("pkt2");
const PKT3: PacketVar = PacketVar::new("pkt3");
const PKT4: PacketVar = PacketVar::new("pkt4");

const HOP: PacketVar = PacketVar::new("hop");
const HOP_OUT: PacketVar = PacketVar::new("hop_out");
const OTHER_IN: PacketVar = PacketVar::new("other_in");
const OTHER_OUT: PacketVar = PacketVar::new("other_out");

/// A satisfying assignment for a check, restricted to its packet variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample {
    kind: CheckKind,
    packets: Vec<PacketVar>,
    witness: Witness,
}

impl Counterexample {
    /// The check that produced this counterexample.
    #[must_use]
    pub const fn kind(&self) -> CheckKind {
        self.kind
    }

    /// The check's packet variables, in the order the check documents.
    #[must_use]
    pub fn packets(&self) -> &[PacketVar] {
        &self.packets
    }

    /// The value of `field` on `packet`, if the solver fixed it.
    #[must_use]
    pub fn evaluate(&self, field: Field, packet: PacketVar) -> Option<i64> {
        self.witness.evaluate(field, packet)
    }

    /// Every fixed field of `packet`.
    #[must_use]
    pub fn explain(&self, packet: PacketVar) -> BTreeMap<Field, i64> {
        self.witness.explain(packet)
    }

    /// The underlying witness.
    #[must_use]
    pub const fn witness(&self) -> &Witness {
        &self.witness
    }

    fn single_line(&self) -> String {
        self.packets
            .iter()
            .map(|p| format!("{}={}", p, FieldsDisplay(&self.explain(*p))))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, packet) in self.packets.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", packet, FieldsDisplay(&self.explain(*packet)))?;
        }
        Ok(())
    }
}

/// Runs verification checks against a solver backend.
///
/// # Examples
///
/// ```
/// use netcore_slices::solver::{Query, SatOutcome, SolverBackend};
/// use netcore_slices::{NetcoreError, Policy, Verifier, VerifierConfig};
///
/// // A backend that never finds a model.
/// struct Refuter;
///
/// impl SolverBackend for Refuter {
///     fn name(&self) -> &'static str {
///         "refuter"
///     }
///     fn check(&self, _: &Query, _: &VerifierConfig) -> Result<SatOutcome, NetcoreError> {
///         Ok(SatOutcome::Unsat)
///     }
/// }
///
/// let verifier = Verifier::new(Refuter, VerifierConfig::default())?;
/// assert!(verifier.not_empty(&Policy::Bottom)?.is_none());
/// # Ok::<(), NetcoreError>(())
/// ```
pub struct Verifier<B> {
    backend: B,
    config: VerifierConfig,
    observer: Arc<dyn CheckObserver>,
}

impl<B: SolverBackend> fmt::Debug for Verifier<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "z3-solver")]
impl Verifier<crate::solver::Z3Backend> {
    /// A Z3-backed verifier with the default configuration.
    #[must_use]
    pub fn z3() -> Self {
        Self {
            backend: crate::solver::Z3Backend::new(),
            config: VerifierConfig::default(),
            observer: Arc::new(TracingObserver::new()),
        }
    }
}

impl<B: SolverBackend> Verifier<B> {
    /// Creates a verifier that reports to a [`TracingObserver`].
    ///
    /// # Errors
    ///
    /// Returns [`NetcoreError::InvalidConfig`] if `config` does not validate.
    pub fn new(backend: B, config: VerifierConfig) -> Result<Self, NetcoreError> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            observer: Arc::new(TracingObserver::new()),
        })
    }

    /// Replaces the observer that receives one [`CheckReport`] per check.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn CheckObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The solver backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Finds a packet the policy forwards.
    ///
    /// Witness packets: `p_in`, `p_out`.
    pub fn not_empty(&self, policy: &Policy) -> Result<Option<Counterexample>, NetcoreError> {
        let query = Query::new([P_IN, P_OUT]).assert(forwards(policy, P_IN, P_OUT));
        self.run(CheckKind::NotEmpty, query, Vec::new())
    }

    /// Looks for a behavior on which `policy2` fails to refine `policy1`.
    ///
    /// The posed condition is: every forwarding of `policy1` is also one of
    /// `policy2`, and whenever `policy2` forwards an input that `policy1` also
    /// forwards, the result is one `policy1` produces. It is not symmetric and
    /// may have holes as a general notion of equivalence; compiler correctness
    /// relies on [`Verifier::simulates`] instead.
    ///
    /// Witness packets: `p1_in`, `p1_out`, `p2_in`, `p2_out1`, `p2_out2`.
    pub fn equivalent(
        &self,
        policy1: &Policy,
        policy2: &Policy,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let preserved = Formula::implies(
            forwards(policy1, P1_IN, P1_OUT),
            forwards(policy2, P1_IN, P1_OUT),
        );
        let nothing_new = Formula::implies(
            Formula::and([
                forwards(policy2, P2_IN, P2_OUT1),
                forwards(policy1, P2_IN, P2_OUT2),
            ]),
            forwards(policy1, P2_IN, P2_OUT1),
        );
        let query = Query::new([P1_IN, P1_OUT, P2_IN, P2_OUT1, P2_OUT2])
            .assert(Formula::not(Formula::and([preserved, nothing_new])));
        self.run(CheckKind::Equivalence, query, Vec::new())
    }

    /// Looks for a forwarding `p -> pp` of `a` that `b` cannot reproduce,
    /// even after changing `field` freely on the input and on the output.
    ///
    /// `None` means `b` simulates `a` up to `field`. The compiler's tag field
    /// is usually [`Field::Vlan`].
    ///
    /// Witness packets: `p`, `pp`.
    pub fn simulates(
        &self,
        a: &Policy,
        b: &Policy,
        field: Field,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let (v, vv) = (IntVar::new("v"), IntVar::new("vv"));
        let relaxed = forwards_with(
            b,
            &PacketView::new(P).with(field, Term::Var(v)),
            &PacketView::new(PP).with(field, Term::Var(vv)),
        );
        let query = Query::new([P, PP])
            .assert(forwards(a, P, PP))
            .assert(Formula::forall([v, vv], Formula::not(relaxed)));
        self.run(CheckKind::Simulation, query, vec![("field", field.to_string())])
    }

    /// Looks for a packet `a` reports to some tap that `b` does not report to
    /// that tap under any value of `field`.
    ///
    /// Witness packets: `p`.
    pub fn simulates_observes(
        &self,
        a: &Policy,
        b: &Policy,
        field: Field,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let (tap, v) = (IntVar::new("tap"), IntVar::new("v"));
        let relaxed = observes(
            b,
            &PacketView::new(P).with(field, Term::Var(v)),
            Term::Var(tap),
        );
        let query = Query::new([P])
            .assert(observes(a, &P.into(), Term::Var(tap)))
            .assert(Formula::forall([v], Formula::not(relaxed)));
        self.run(
            CheckKind::ObservationSimulation,
            query,
            vec![("field", field.to_string())],
        )
    }

    /// Looks for a two-hop path of `a` (`p -> pp`, one link, `q -> qq`) that
    /// `b` cannot reproduce with `field` free at the ends but carried
    /// unchanged across the link.
    ///
    /// This does not catch a compiler that tags per slice rather than per
    /// link; [`Verifier::one_per_edge`] does.
    ///
    /// Witness packets: `p`, `pp`, `q`, `qq`.
    pub fn simulates_two_hop<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        a: &Policy,
        b: &Policy,
        field: Field,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let (v1, v2, v3) = (IntVar::new("v1"), IntVar::new("v2"), IntVar::new("v3"));
        let first = forwards_with(
            b,
            &PacketView::new(P).with(field, Term::Var(v1)),
            &PacketView::new(PP).with(field, Term::Var(v2)),
        );
        let second = forwards_with(
            b,
            &PacketView::new(Q).with(field, Term::Var(v2)),
            &PacketView::new(QQ).with(field, Term::Var(v3)),
        );
        let query = Query::new([P, PP, Q, QQ])
            .assert(forwards(a, P, PP))
            .assert(transfer(topology, PP, Q))
            .assert(forwards(a, Q, QQ))
            .assert(Formula::forall(
                [v1, v2, v3],
                Formula::not(Formula::and([first, second])),
            ));
        self.run(
            CheckKind::TwoHopSimulation,
            query,
            vec![("field", field.to_string())],
        )
    }

    /// Looks for a link endpoint that carries two different values of `field`.
    ///
    /// The witness is a packet `hop` that `policy` emits at a link endpoint
    /// (`p_in -> p_out`), carries across the link, and forwards again at the
    /// far side (`hop -> hop_out`), together with another output `other_out`
    /// of the policy (from `other_in`) at the same endpoint whose `field`
    /// differs from `p_out`'s.
    ///
    /// Witness packets: `p_in`, `p_out`, `hop`, `hop_out`, `other_in`, `other_out`.
    pub fn one_per_edge<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        policy: &Policy,
        field: Field,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let same = |f: Field| Formula::eq(Term::Field(f, P_OUT), Term::Field(f, OTHER_OUT));
        let query = Query::new([P_IN, P_OUT, HOP, HOP_OUT, OTHER_IN, OTHER_OUT])
            .assert(forwards(policy, P_IN, P_OUT))
            .assert(transfer(topology, P_OUT, HOP))
            .assert(forwards(policy, HOP, HOP_OUT))
            .assert(forwards(policy, OTHER_IN, OTHER_OUT))
            .assert(same(Field::Switch))
            .assert(same(Field::Port))
            .assert(Formula::not(same(field)));
        self.run(
            CheckKind::OneTagPerEdge,
            query,
            vec![("field", field.to_string())],
        )
    }

    /// Whether `result` forwards exactly what `orig` does, up to the
    /// configured tag field: each simulates the other.
    pub fn compiled_correctly(&self, orig: &Policy, result: &Policy) -> Result<bool, NetcoreError> {
        let field = self.config.tag_field;
        let _span = tracing::debug_span!("compiled_correctly", field = field.as_str()).entered();
        let failed = if self.simulates(orig, result, field)?.is_some() {
            Some("lost behavior")
        } else if self.simulates(result, orig, field)?.is_some() {
            Some("new behavior")
        } else {
            None
        };
        Ok(self.report_composite(failed, field))
    }

    /// Compiler correctness against a topology and an edge admission policy.
    ///
    /// `orig` is first restricted to the traffic `edge_policy` admits (an
    /// empty map admits everything). Then, up to the configured tag field:
    /// both policies simulate each other, both tap the same packets, and the
    /// compiled policy uses one tag value per link.
    pub fn compiled_correctly_in<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        orig: &Policy,
        result: &Policy,
        edge_policy: &EdgePolicy,
    ) -> Result<bool, NetcoreError> {
        let field = self.config.tag_field;
        let _span = tracing::debug_span!(
            "compiled_correctly_in",
            field = field.as_str(),
            edges = edge_policy.len()
        )
        .entered();
        let orig = restrict_to_edges(orig, edge_policy);
        let failed = if self.simulates(&orig, result, field)?.is_some() {
            Some("lost behavior")
        } else if self.simulates(result, &orig, field)?.is_some() {
            Some("new behavior")
        } else if self.simulates_observes(&orig, result, field)?.is_some() {
            Some("lost observation")
        } else if self.simulates_observes(result, &orig, field)?.is_some() {
            Some("new observation")
        } else if self.one_per_edge(topology, result, field)?.is_some() {
            Some("several tags on one link")
        } else {
            None
        };
        Ok(self.report_composite(failed, field))
    }

    /// Finds a packet `policy1` emits that crosses one link and is then
    /// forwarded by `policy2`.
    ///
    /// Witness packets: `pkt1`, `pkt2`, `pkt3`, `pkt4`.
    pub fn isolated_model<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        policy1: &Policy,
        policy2: &Policy,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let query = Query::new([PKT1, PKT2, PKT3, PKT4])
            .assert(forwards(policy1, PKT1, PKT2))
            .assert(transfer(topology, PKT2, PKT3))
            .assert(forwards(policy2, PKT3, PKT4));
        self.run(CheckKind::Isolation, query, Vec::new())
    }

    /// Whether no packet of `policy1` reaches `policy2` over one link.
    pub fn isolated<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        policy1: &Policy,
        policy2: &Policy,
    ) -> Result<bool, NetcoreError> {
        Ok(self.isolated_model(topology, policy1, policy2)?.is_none())
    }

    /// An empty string if the policies are isolated, otherwise the four
    /// packets of the leak, one per line, separated by the stage that
    /// produced the next one. Unconstrained fields are left out.
    pub fn isolated_diagnostic<T: PhysicalTopology + ?Sized>(
        &self,
        topology: &T,
        policy1: &Policy,
        policy2: &Policy,
    ) -> Result<String, NetcoreError> {
        let Some(cx) = self.isolated_model(topology, policy1, policy2)? else {
            return Ok(String::new());
        };
        let stage = |var| FieldsDisplay(&cx.explain(var)).to_string();
        Ok(format!(
            "{}\n---policy1--->\n{}\n---topology-->\n{}\n---policy2--->\n{}",
            stage(PKT1),
            stage(PKT2),
            stage(PKT3),
            stage(PKT4)
        ))
    }

    fn report_composite(&self, failed: Option<&str>, field: Field) -> bool {
        let report = match failed {
            None => CheckReport::new(
                CheckKind::CompiledCorrectly,
                CheckOutcome::Holds,
                "compiled policy matches the original",
            ),
            Some(reason) => CheckReport::new(
                CheckKind::CompiledCorrectly,
                CheckOutcome::Violated,
                format!("compiled policy differs from the original: {}", reason),
            ),
        };
        self.observer
            .on_check(&report.with_context("field", field.as_str()));
        failed.is_none()
    }

    fn run(
        &self,
        kind: CheckKind,
        query: Query,
        context: Vec<(&'static str, String)>,
    ) -> Result<Option<Counterexample>, NetcoreError> {
        let _span = tracing::debug_span!(
            "check",
            kind = kind.as_str(),
            backend = self.backend.name()
        )
        .entered();
        tracing::trace!(
            size = query.size(),
            packets = query.packets().len(),
            "posing query"
        );

        let started = Instant::now();
        let outcome = if query.is_trivially_unsat() {
            SatOutcome::Unsat
        } else {
            self.backend.check(&query, &self.config)?
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (report, result) = match outcome {
            SatOutcome::Unsat => (
                CheckReport::new(kind, CheckOutcome::Holds, "no counterexample"),
                Ok(None),
            ),
            SatOutcome::Sat(witness) => {
                let cx = Counterexample {
                    kind,
                    packets: query.packets().to_vec(),
                    witness,
                };
                (
                    CheckReport::new(kind, CheckOutcome::Violated, "counterexample found")
                        .with_context("witness", cx.single_line()),
                    Ok(Some(cx)),
                )
            }
            SatOutcome::Unknown(reason) => (
                CheckReport::new(kind, CheckOutcome::Unknown, format!("solver gave up: {}", reason)),
                Err(NetcoreError::SolverUnknown {
                    check: kind.as_str(),
                    reason,
                }),
            ),
        };
        let report = context
            .into_iter()
            .fold(report.with_elapsed_ms(elapsed_ms), |r, (k, v)| r.with_context(k, v));
        self.observer.on_check(&report);
        result
    }
}
