//! Error types for address translation, construction and verification.
//!
//! Every fallible operation in the crate returns [`NetcoreError`].

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::packet::{Field, Location};

/// Why a logical location could not be mapped into physical addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslationFailure {
    /// The switch is wildcarded while the port is concrete. Port numbers are
    /// switch-local, so "any switch, this port" has no physical meaning.
    WildcardSwitch,
    /// The switch has no entry in the switch map.
    UnmappedSwitch,
    /// The `(switch, port)` pair has no entry in the port map.
    UnmappedPort,
}

impl Display for TranslationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationFailure::WildcardSwitch => {
                write!(f, "switch is wildcarded but port is concrete")
            }
            TranslationFailure::UnmappedSwitch => write!(f, "switch is not in the switch map"),
            TranslationFailure::UnmappedPort => write!(f, "port is not in the port map"),
        }
    }
}

/// This enum contains all error messages this library can return. Most API functions will generally return a [`Result<T, NetcoreError>`].
///
/// A counterexample found by the verifier is never an error: it is returned as
/// `Ok(Some(..))`.
///
/// [`Result<T, NetcoreError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetcoreError {
    /// A predicate, action or policy could not be translated to physical addressing.
    PhysicalTranslation {
        /// The logical location that failed to translate.
        location: Location,
        /// Further specifies why the translation failed.
        reason: TranslationFailure,
    },
    /// A header field name outside the recognized header set.
    UnknownField {
        /// The offending name.
        name: String,
    },
    /// An action tried to rewrite a location field. Output locations are
    /// determined by the action's switch and ports only.
    LocationRewrite {
        /// The location field named in the rewrite.
        field: Field,
    },
    /// A packet was given a location field as a header. A packet's switch and
    /// port come from the location it is processed at.
    LocationHeader {
        /// The location field given as a header.
        field: Field,
    },
    /// The switch/port maps are not injective or disagree with each other.
    InconsistentAddressMap {
        /// Further specifies what is inconsistent.
        info: String,
    },
    /// A topology operation referenced a missing node or an invalid link.
    InvalidTopology {
        /// Further specifies what was invalid.
        info: String,
    },
    /// A verifier configuration value is out of range.
    InvalidConfig {
        /// The configuration field.
        field: &'static str,
        /// Further specifies what is wrong with it.
        info: String,
    },
    /// The solver could neither prove nor refute the query (timeout, incompleteness).
    SolverUnknown {
        /// The check that was running.
        check: &'static str,
        /// The reason reported by the solver, if any.
        reason: String,
    },
    /// The solver backend rejected a formula or failed to produce a model.
    /// If you encounter this error, please report it as a bug.
    Backend {
        /// A description of the failure.
        context: String,
    },
}

impl Display for NetcoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetcoreError::PhysicalTranslation { location, reason } => {
                write!(
                    f,
                    "Cannot translate location {} to physical addressing: {}",
                    location, reason
                )
            }
            NetcoreError::UnknownField { name } => {
                write!(f, "Unknown header field: {:?}", name)
            }
            NetcoreError::LocationRewrite { field } => {
                write!(f, "Actions cannot modify the location field {}", field)
            }
            NetcoreError::LocationHeader { field } => {
                write!(f, "Packets cannot carry the location field {} as a header", field)
            }
            NetcoreError::InconsistentAddressMap { info } => {
                write!(f, "Inconsistent address map: {}", info)
            }
            NetcoreError::InvalidTopology { info } => {
                write!(f, "Invalid topology: {}", info)
            }
            NetcoreError::InvalidConfig { field, info } => {
                write!(f, "Invalid verifier configuration for {}: {}", field, info)
            }
            NetcoreError::SolverUnknown { check, reason } => {
                write!(f, "Solver returned unknown during {}: {}", check, reason)
            }
            NetcoreError::Backend { context } => {
                write!(f, "Solver backend error (please report as bug): {}", context)
            }
        }
    }
}

impl Error for NetcoreError {}
