//! # netcore-slices
//!
//! A packet-processing policy algebra for network slices, and a verifier that
//! answers questions about policies with an SMT solver.
//!
//! Policies are built from [`Predicate`]s (tests over a packet and the
//! location it arrived at) paired with [`Action`]s (forward to ports, rewrite
//! headers, report to taps). A policy is a union of such branches: every
//! matching branch contributes its actions, with no priority between them.
//!
//! The [`Verifier`] encodes policies as first-order formulas over symbolic
//! packets and asks a [`SolverBackend`](solver::SolverBackend):
//!
//! - does a policy forward anything ([`Verifier::not_empty`]),
//! - does a compiled policy behave like its original up to the tag field the
//!   compiler uses ([`Verifier::compiled_correctly`],
//!   [`Verifier::compiled_correctly_in`]),
//! - can a packet from one slice reach another over a physical link
//!   ([`Verifier::isolated`]).
//!
//! A counterexample is a normal answer, returned as `Ok(Some(..))`. A solver
//! that gives up surfaces as [`NetcoreError::SolverUnknown`].
//!
//! # Feature flags
//!
//! - `z3-solver`: the [`Z3Backend`](solver::Z3Backend) (needs a system libz3).
//! - `z3-bundled`: as `z3-solver`, building Z3 from source.
//! - `json`: [`CheckReport::to_json`](telemetry::CheckReport::to_json).
//!
//! # Example
//!
//! ```
//! use netcore_slices::{forward, Action, Field, Location, Packet, Predicate};
//!
//! let original = Predicate::inport(2, 2).then([forward(2, 1)]);
//! let compiled = (Predicate::inport(2, 2) & Predicate::header(Field::Vlan, 2))
//!     .then([Action::new(2, [1]).with_modify(Field::Vlan, 2)?]);
//!
//! let pkt = Packet::new([(Field::Vlan, 2), (Field::SrcMac, 9)]);
//! assert_eq!(original.outputs(&pkt, Location::new(2, 2)), compiled.outputs(&pkt, Location::new(2, 2)));
//! # Ok::<(), netcore_slices::NetcoreError>(())
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use action::{forward, Action};
pub use address::AddressMap;
pub use config::VerifierConfig;
pub use error::{NetcoreError, TranslationFailure};
pub use packet::{Field, Location, Packet, PortId, SwitchId, WILDCARD};
pub use policy::{nary_policy_union, restrict_to_edges, EdgePolicy, Policy};
pub use predicate::{nary_intersection, nary_union, Predicate};
pub use topology::{NodeKind, PhysicalTopology, Topology};
pub use verifier::{Counterexample, Verifier};

pub mod action;
pub mod address;
pub mod config;
pub mod error;
pub mod packet;
pub mod policy;
pub mod predicate;
pub mod prelude;
pub mod solver;
pub mod symbolic;
pub mod telemetry;
pub mod topology;
pub mod verifier;
