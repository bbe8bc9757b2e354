//! Z3 backend.
//!
//! Packets are constants of an uninterpreted sort `Packet`; each [`Field`] is
//! an uninterpreted function `Packet -> Int`. Integer variables are Z3 integer
//! constants, and [`Formula::ForAll`] is lowered with `forall_const` over the
//! constants of its bound variables.

use std::collections::BTreeMap;

use z3::ast::{forall_const, Ast, Bool, Dynamic, Int};
use z3::{with_z3_config, Config, FuncDecl, Model, SatResult, Solver, Sort, Symbol};

use super::{Query, SatOutcome, SolverBackend, Witness};
use crate::config::VerifierConfig;
use crate::packet::Field;
use crate::symbolic::{Formula, IntVar, PacketVar, Term};
use crate::NetcoreError;

/// Decides queries with Z3.
///
/// Each call to [`SolverBackend::check`] runs in a fresh Z3 context configured
/// from the [`VerifierConfig`], so the backend holds no solver state between
/// queries and can be shared freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Z3Backend;

impl Z3Backend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SolverBackend for Z3Backend {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn check(&self, query: &Query, config: &VerifierConfig) -> Result<SatOutcome, NetcoreError> {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        if let Some(ms) = config.timeout_ms() {
            cfg.set_timeout_msec(ms);
        }
        let model_completion = config.model_completion;
        with_z3_config(&cfg, || decide(query, model_completion))
    }
}

fn decide(query: &Query, model_completion: bool) -> Result<SatOutcome, NetcoreError> {
    let mut lowering = Lowering::new();
    let solver = Solver::new();
    for assertion in query.assertions() {
        let lowered = lowering.formula(assertion)?;
        solver.assert(&lowered);
    }
    for var in query.packets() {
        lowering.packet(*var);
    }
    tracing::trace!(
        assertions = query.assertions().len(),
        packets = query.packets().len(),
        "z3 query lowered"
    );
    match solver.check() {
        SatResult::Unsat => Ok(SatOutcome::Unsat),
        SatResult::Unknown => Ok(SatOutcome::Unknown(
            solver
                .get_reason_unknown()
                .unwrap_or_else(|| "unknown".to_owned()),
        )),
        SatResult::Sat => {
            let model = solver.get_model().ok_or_else(|| NetcoreError::Backend {
                context: "solver reported sat without a model".to_owned(),
            })?;
            lowering.witness(&model, query.packets(), model_completion)
        }
    }
}

struct Lowering {
    accessors: BTreeMap<Field, FuncDecl>,
    packet_sort: Sort,
    packets: BTreeMap<PacketVar, Dynamic>,
    ints: BTreeMap<IntVar, Int>,
}

impl Lowering {
    fn new() -> Self {
        let packet_sort = Sort::uninterpreted(Symbol::String("Packet".to_owned()));
        let int_sort = Sort::int();
        let accessors = Field::ALL
            .into_iter()
            .map(|field| {
                (
                    field,
                    FuncDecl::new(field.as_str(), &[&packet_sort], &int_sort),
                )
            })
            .collect();
        Self {
            accessors,
            packet_sort,
            packets: BTreeMap::new(),
            ints: BTreeMap::new(),
        }
    }

    fn packet(&mut self, var: PacketVar) -> Dynamic {
        let sort = &self.packet_sort;
        self.packets
            .entry(var)
            .or_insert_with(|| Dynamic::new_const(var.name(), sort))
            .clone()
    }

    fn int(&mut self, var: IntVar) -> Int {
        self.ints
            .entry(var)
            .or_insert_with(|| Int::new_const(var.name()))
            .clone()
    }

    fn field(&mut self, field: Field, var: PacketVar) -> Result<Int, NetcoreError> {
        let packet = self.packet(var);
        let accessor = self
            .accessors
            .get(&field)
            .ok_or_else(|| NetcoreError::Backend {
                context: format!("no accessor declared for {}", field),
            })?;
        accessor
            .apply(&[&packet as &dyn Ast])
            .as_int()
            .ok_or_else(|| NetcoreError::Backend {
                context: format!("accessor {} did not produce an integer", field),
            })
    }

    fn term(&mut self, term: &Term) -> Result<Int, NetcoreError> {
        Ok(match term {
            Term::Const(v) => Int::from_i64(*v),
            Term::Field(field, var) => self.field(*field, *var)?,
            Term::Var(var) => self.int(*var),
        })
    }

    fn all(&mut self, formulas: &[Formula]) -> Result<Vec<Bool>, NetcoreError> {
        formulas.iter().map(|f| self.formula(f)).collect()
    }

    fn formula(&mut self, formula: &Formula) -> Result<Bool, NetcoreError> {
        Ok(match formula {
            Formula::Const(b) => Bool::from_bool(*b),
            Formula::Eq(a, b) => {
                let a = self.term(a)?;
                let b = self.term(b)?;
                a.eq(&b)
            }
            Formula::Not(inner) => self.formula(inner)?.not(),
            Formula::And(parts) => Bool::and(&self.all(parts)?),
            Formula::Or(parts) => Bool::or(&self.all(parts)?),
            Formula::Implies(premise, conclusion) => {
                let premise = self.formula(premise)?;
                let conclusion = self.formula(conclusion)?;
                premise.implies(&conclusion)
            }
            Formula::ForAll(vars, body) => {
                let bound: Vec<Int> = vars.iter().map(|v| self.int(*v)).collect();
                let body = self.formula(body)?;
                let bound_refs: Vec<&dyn Ast> = bound.iter().map(|b| b as &dyn Ast).collect();
                forall_const(&bound_refs, &[], &body)
            }
        })
    }

    fn witness(
        &mut self,
        model: &Model,
        packets: &[PacketVar],
        model_completion: bool,
    ) -> Result<SatOutcome, NetcoreError> {
        let mut witness = Witness::new();
        for var in packets {
            for field in Field::ALL {
                let term = self.field(field, *var)?;
                let value = model
                    .eval(&term, model_completion)
                    .and_then(|v| v.as_i64());
                if let Some(value) = value {
                    witness.insert(*var, field, value);
                }
            }
        }
        Ok(SatOutcome::Sat(witness))
    }
}
