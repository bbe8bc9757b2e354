//! Satisfiability backends.
//!
//! A backend decides a [`Query`], a conjunction of [`Formula`]s over symbolic
//! packets, and on `sat` returns a [`Witness`]: the value of every field of
//! every declared packet that the model fixes.
//!
//! With the `z3-solver` feature enabled, [`Z3Backend`] decides queries with
//! the Z3 SMT solver, modelling packets as an uninterpreted sort with one
//! integer accessor per [`Field`].

use std::collections::BTreeMap;
use std::fmt;

use crate::config::VerifierConfig;
use crate::packet::Field;
use crate::symbolic::{Formula, PacketVar};
use crate::NetcoreError;

#[cfg(feature = "z3-solver")]
mod z3_backend;

#[cfg(feature = "z3-solver")]
pub use z3_backend::Z3Backend;

/// A satisfiability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    packets: Vec<PacketVar>,
    assertions: Vec<Formula>,
}

impl Query {
    /// A query over the given packet variables. Only declared packets appear
    /// in the witness.
    #[must_use]
    pub fn new(packets: impl IntoIterator<Item = PacketVar>) -> Self {
        Self {
            packets: packets.into_iter().collect(),
            assertions: Vec::new(),
        }
    }

    /// Adds an assertion.
    #[must_use]
    pub fn assert(mut self, formula: Formula) -> Self {
        self.assertions.push(formula);
        self
    }

    /// Declared packets, in declaration order.
    #[must_use]
    pub fn packets(&self) -> &[PacketVar] {
        &self.packets
    }

    /// Assertions, in order.
    #[must_use]
    pub fn assertions(&self) -> &[Formula] {
        &self.assertions
    }

    /// Total formula size, for logging.
    #[must_use]
    pub fn size(&self) -> usize {
        self.assertions.iter().map(Formula::size).sum()
    }

    /// Whether some assertion folded to `false`, making the query trivially unsat.
    #[must_use]
    pub fn is_trivially_unsat(&self) -> bool {
        self.assertions.iter().any(|a| *a == Formula::FALSE)
    }
}

/// Field values of the packets in a satisfying model.
///
/// Serializes as `{"p_in": {"switch": 1, "vlan": 3}, ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Witness {
    values: BTreeMap<PacketVar, BTreeMap<Field, i64>>,
}

impl Witness {
    /// An empty witness.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a field value.
    pub fn insert(&mut self, packet: PacketVar, field: Field, value: i64) {
        self.values.entry(packet).or_default().insert(field, value);
    }

    /// The value of `field` on `packet`, if the model fixes it.
    #[must_use]
    pub fn evaluate(&self, field: Field, packet: PacketVar) -> Option<i64> {
        self.values.get(&packet)?.get(&field).copied()
    }

    /// Every known field of `packet`. Empty if the model says nothing about it.
    #[must_use]
    pub fn explain(&self, packet: PacketVar) -> BTreeMap<Field, i64> {
        self.values.get(&packet).cloned().unwrap_or_default()
    }
}

/// Renders a field map as `{switch: 1, port: 2, vlan: 3}`.
pub(crate) struct FieldsDisplay<'a>(pub(crate) &'a BTreeMap<Field, i64>);

impl fmt::Display for FieldsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, value)?;
        }
        write!(f, "}}")
    }
}

/// The result of deciding a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    /// Satisfiable, with the model's field values.
    Sat(Witness),
    /// Unsatisfiable.
    Unsat,
    /// The solver gave up, with its stated reason.
    Unknown(String),
}

/// A decision procedure for [`Query`]s.
///
/// Implementations must treat `config.timeout` as a per-query budget and
/// report exhaustion as [`SatOutcome::Unknown`], not as an error. Errors are
/// reserved for formulas the backend cannot express.
pub trait SolverBackend {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decides `query`.
    fn check(&self, query: &Query, config: &VerifierConfig) -> Result<SatOutcome, NetcoreError>;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn check(&self, query: &Query, config: &VerifierConfig) -> Result<SatOutcome, NetcoreError> {
        (**self).check(query, config)
    }
}
