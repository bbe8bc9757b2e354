//! Solver-neutral first-order formulas over symbolic packets.
//!
//! A [`PacketVar`] denotes "some packet". Its header values are read through
//! one uninterpreted accessor per [`Field`], written [`Term::Field`]. Integer
//! variables ([`IntVar`]) appear free (existential at the top of a query) or
//! bound by [`Formula::ForAll`].
//!
//! Constructors fold constants eagerly, so a wildcard test encodes to
//! `true` rather than to a disjunction the solver has to discharge.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::packet::Field;

/// A symbolic packet variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PacketVar(&'static str);

impl PacketVar {
    /// Creates a packet variable. Names must be unique within a query.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The variable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PacketVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A symbolic integer variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVar(&'static str);

impl IntVar {
    /// Creates an integer variable. Names must be unique within a query.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The variable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for IntVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An integer-valued term.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A literal.
    Const(i64),
    /// `field(packet)`.
    Field(Field, PacketVar),
    /// An integer variable.
    Var(IntVar),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(v) => write!(f, "{}", v),
            Self::Field(field, packet) => write!(f, "({} {})", field, packet),
            Self::Var(var) => write!(f, "{}", var),
        }
    }
}

/// A first-order formula.
///
/// Build formulas with the associated constructors rather than the variants:
/// the constructors fold constants and flatten nested conjunctions/disjunctions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// `true` or `false`.
    Const(bool),
    /// Integer equality.
    Eq(Term, Term),
    /// Negation.
    Not(Box<Formula>),
    /// Conjunction of at least two formulas.
    And(Vec<Formula>),
    /// Disjunction of at least two formulas.
    Or(Vec<Formula>),
    /// Implication.
    Implies(Box<Formula>, Box<Formula>),
    /// Universal quantification over integer variables.
    ForAll(Vec<IntVar>, Box<Formula>),
}

impl Formula {
    /// `true`.
    pub const TRUE: Formula = Formula::Const(true);
    /// `false`.
    pub const FALSE: Formula = Formula::Const(false);

    /// `a == b`, folded when both sides are literals.
    #[must_use]
    pub fn eq(a: Term, b: Term) -> Self {
        match (a, b) {
            (Term::Const(x), Term::Const(y)) => Self::Const(x == y),
            _ if a == b => Self::TRUE,
            _ => Self::Eq(a, b),
        }
    }

    /// `!f`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(f: Formula) -> Self {
        match f {
            Self::Const(b) => Self::Const(!b),
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Conjunction. Empty input is `true`.
    #[must_use]
    pub fn and(parts: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Self::Const(true) => {}
                Self::Const(false) => return Self::FALSE,
                Self::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::TRUE,
            1 => flat.pop().unwrap_or(Self::TRUE),
            _ => Self::And(flat),
        }
    }

    /// Disjunction. Empty input is `false`.
    #[must_use]
    pub fn or(parts: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Self::Const(false) => {}
                Self::Const(true) => return Self::TRUE,
                Self::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::FALSE,
            1 => flat.pop().unwrap_or(Self::FALSE),
            _ => Self::Or(flat),
        }
    }

    /// `premise => conclusion`.
    #[must_use]
    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        match (premise, conclusion) {
            (Self::Const(false), _) | (_, Self::Const(true)) => Self::TRUE,
            (Self::Const(true), c) => c,
            (p, Self::Const(false)) => Self::not(p),
            (p, c) => Self::Implies(Box::new(p), Box::new(c)),
        }
    }

    /// `forall vars. body`. Constant bodies drop the quantifier.
    #[must_use]
    pub fn forall(vars: impl IntoIterator<Item = IntVar>, body: Formula) -> Self {
        match body {
            Self::Const(b) => Self::Const(b),
            body => {
                let vars: Vec<IntVar> = vars.into_iter().collect();
                if vars.is_empty() {
                    body
                } else {
                    Self::ForAll(vars, Box::new(body))
                }
            }
        }
    }

    /// Number of nodes, for logging.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Const(_) | Self::Eq(..) => 1,
            Self::Not(f) | Self::ForAll(_, f) => 1 + f.size(),
            Self::And(fs) | Self::Or(fs) => 1 + fs.iter().map(Self::size).sum::<usize>(),
            Self::Implies(p, c) => 1 + p.size() + c.size(),
        }
    }

    /// Packet variables mentioned anywhere in the formula.
    #[must_use]
    pub fn packets(&self) -> BTreeSet<PacketVar> {
        let mut out = BTreeSet::new();
        self.visit_terms(&mut |t| {
            if let Term::Field(_, p) = t {
                out.insert(*p);
            }
        });
        out
    }

    fn visit_terms(&self, visit: &mut impl FnMut(&Term)) {
        match self {
            Self::Const(_) => {}
            Self::Eq(a, b) => {
                visit(a);
                visit(b);
            }
            Self::Not(f) | Self::ForAll(_, f) => f.visit_terms(visit),
            Self::And(fs) | Self::Or(fs) => {
                for f in fs {
                    f.visit_terms(visit);
                }
            }
            Self::Implies(p, c) => {
                p.visit_terms(visit);
                c.visit_terms(visit);
            }
        }
    }

    /// Evaluates a quantifier-free formula under a concrete assignment.
    ///
    /// Returns `None` if the formula contains a quantifier or reads a value
    /// the assignment does not provide.
    #[must_use]
    pub fn eval(&self, assignment: &Assignment) -> Option<bool> {
        match self {
            Self::Const(b) => Some(*b),
            Self::Eq(a, b) => Some(assignment.term(a)? == assignment.term(b)?),
            Self::Not(f) => f.eval(assignment).map(|b| !b),
            Self::And(fs) => {
                let mut all = true;
                for f in fs {
                    all &= f.eval(assignment)?;
                }
                Some(all)
            }
            Self::Or(fs) => {
                let mut any = false;
                for f in fs {
                    any |= f.eval(assignment)?;
                }
                Some(any)
            }
            Self::Implies(p, c) => Some(!p.eval(assignment)? || c.eval(assignment)?),
            Self::ForAll(..) => None,
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, op: &str, fs: &[Formula]| {
            write!(f, "({}", op)?;
            for sub in fs {
                write!(f, " {}", sub)?;
            }
            write!(f, ")")
        };
        match self {
            Self::Const(b) => write!(f, "{}", b),
            Self::Eq(a, b) => write!(f, "(= {} {})", a, b),
            Self::Not(inner) => write!(f, "(not {})", inner),
            Self::And(fs) => list(f, "and", fs),
            Self::Or(fs) => list(f, "or", fs),
            Self::Implies(p, c) => write!(f, "(=> {} {})", p, c),
            Self::ForAll(vars, body) => {
                write!(f, "(forall (")?;
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} Int)", var)?;
                }
                write!(f, ") {})", body)
            }
        }
    }
}

/// Concrete values for packet fields and integer variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    fields: BTreeMap<(PacketVar, Field), i64>,
    ints: BTreeMap<IntVar, i64>,
}

impl Assignment {
    /// An empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `field(packet) = value`.
    #[must_use]
    pub fn with_field(mut self, packet: PacketVar, field: Field, value: i64) -> Self {
        self.fields.insert((packet, field), value);
        self
    }

    /// Assigns every field of `packet` from `(field, value)` pairs.
    #[must_use]
    pub fn with_packet(
        mut self,
        packet: PacketVar,
        values: impl IntoIterator<Item = (Field, i64)>,
    ) -> Self {
        for (field, value) in values {
            self.fields.insert((packet, field), value);
        }
        self
    }

    /// Assigns an integer variable.
    #[must_use]
    pub fn with_int(mut self, var: IntVar, value: i64) -> Self {
        self.ints.insert(var, value);
        self
    }

    fn term(&self, term: &Term) -> Option<i64> {
        match term {
            Term::Const(v) => Some(*v),
            Term::Field(field, packet) => self.fields.get(&(*packet, *field)).copied(),
            Term::Var(var) => self.ints.get(var).copied(),
        }
    }
}
