//! Convenient re-exports for common usage.
//!
//! ```rust
//! use netcore_slices::prelude::*;
//!
//! let policy = Predicate::inport(1, 1).then([forward(1, 2)])
//!     + Predicate::header(Field::Vlan, 3).then([Action::drop_on(1)]);
//! assert_eq!(policy.primitives().len(), 2);
//! ```
//!
//! # What's Included
//!
//! - **Algebra**: [`Predicate`], [`Action`], [`forward`], [`Policy`], [`EdgePolicy`]
//! - **Packets**: [`Packet`], [`Field`], [`Location`], [`WILDCARD`]
//! - **Addressing and topology**: [`AddressMap`], [`Topology`], [`PhysicalTopology`]
//! - **Verification**: [`Verifier`], [`VerifierConfig`], [`Counterexample`], [`SolverBackend`]
//! - **Error handling**: [`NetcoreError`], [`TranslationFailure`]

pub use crate::action::{forward, Action};
pub use crate::address::AddressMap;
pub use crate::config::VerifierConfig;
pub use crate::error::{NetcoreError, TranslationFailure};
pub use crate::packet::{Field, Location, Packet, PortId, SwitchId, WILDCARD};
pub use crate::policy::{EdgePolicy, Policy};
pub use crate::predicate::Predicate;
pub use crate::solver::SolverBackend;
#[cfg(feature = "z3-solver")]
pub use crate::solver::Z3Backend;
pub use crate::topology::{PhysicalTopology, Topology};
pub use crate::verifier::{Counterexample, Verifier};
