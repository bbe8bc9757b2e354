//! Symbolic packets and the logical encoding of policies.
//!
//! [`formula`] is a small first-order language that any backend in
//! [`crate::solver`] can decide; [`encode`] turns predicates, policies and
//! topologies into it.

pub mod encode;
pub mod formula;

pub use encode::{forwards, forwards_with, observes, predicate, transfer, PacketView};
pub use formula::{Assignment, Formula, IntVar, PacketVar, Term};
