//! Structured telemetry for verification checks.
//!
//! Every verifier call produces one [`CheckReport`]. Instead of only logging
//! with `tracing`, reports are structured data that can be:
//!
//! - Logged via tracing (default behavior)
//! - Collected programmatically for testing
//! - Sent to custom observers (metrics, CI dashboards, etc.)
//!
//! # Example
//!
//! ```
//! use netcore_slices::telemetry::{CheckKind, CheckOutcome, CheckReport, CollectingObserver, CheckObserver};
//!
//! let observer = CollectingObserver::new();
//! observer.on_check(&CheckReport::new(CheckKind::Isolation, CheckOutcome::Holds, "slices isolated"));
//!
//! assert_eq!(observer.len(), 1);
//! assert!(!observer.has_outcome(CheckOutcome::Violated));
//! ```

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which verification procedure produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CheckKind {
    /// Does the policy forward anything at all.
    NotEmpty,
    /// Refinement-style equivalence.
    Equivalence,
    /// Single-hop simulation up to a field.
    Simulation,
    /// Tap simulation up to a field.
    ObservationSimulation,
    /// Two-hop simulation across a topology link.
    TwoHopSimulation,
    /// One tag value per physical link.
    OneTagPerEdge,
    /// Cross-slice isolation.
    Isolation,
    /// Compiler correctness (composite).
    CompiledCorrectly,
}

impl CheckKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotEmpty => "not_empty",
            Self::Equivalence => "equivalence",
            Self::Simulation => "simulation",
            Self::ObservationSimulation => "observation_simulation",
            Self::TwoHopSimulation => "two_hop_simulation",
            Self::OneTagPerEdge => "one_tag_per_edge",
            Self::Isolation => "isolation",
            Self::CompiledCorrectly => "compiled_correctly",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// No counterexample exists (or, for `not_empty`, nothing is forwarded).
    Holds,
    /// The solver produced a witness.
    Violated,
    /// The solver gave up.
    Unknown,
}

impl CheckOutcome {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Holds => "holds",
            Self::Violated => "violated",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record of one verification call.
///
/// # Serialization
///
/// This type implements `serde::Serialize` for structured JSON output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    /// The procedure that ran.
    pub kind: CheckKind,
    /// How it ended.
    pub outcome: CheckOutcome,
    /// Human-readable summary.
    pub message: String,
    /// Wall-clock time spent in the solver, in milliseconds.
    pub elapsed_ms: u64,
    /// Additional structured context as key-value pairs (field, policy sizes, witness).
    pub context: BTreeMap<String, String>,
}

impl CheckReport {
    /// Creates a new report.
    #[must_use]
    pub fn new(kind: CheckKind, outcome: CheckOutcome, message: impl Into<String>) -> Self {
        Self {
            kind,
            outcome,
            message: message.into(),
            elapsed_ms: 0,
            context: BTreeMap::new(),
        }
    }

    /// Sets the elapsed solver time.
    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this report to a JSON string.
    ///
    /// Returns `None` if serialization fails (which should not happen for
    /// well-formed reports).
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes this report to a pretty-printed JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} ({}ms",
            self.kind, self.outcome, self.message, self.elapsed_ms
        )?;
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing verification checks.
///
/// Observers must be `Send + Sync`: independent checks may run on separate
/// threads with a shared observer.
///
/// # Example
///
/// ```
/// use netcore_slices::telemetry::{CheckObserver, CheckReport};
///
/// struct FailureCounter;
///
/// impl CheckObserver for FailureCounter {
///     fn on_check(&self, report: &CheckReport) {
///         // Increment a counter, send to monitoring system, etc.
///         let _ = report;
///     }
/// }
/// ```
pub trait CheckObserver: Send + Sync {
    /// Called once per verification call, after the solver returns.
    fn on_check(&self, report: &CheckReport);
}

/// Built-in observer that logs reports via the `tracing` crate.
///
/// # Log Levels
///
/// - `Holds` → `tracing::debug!`
/// - `Violated` → `tracing::info!` (a counterexample is an expected result)
/// - `Unknown` → `tracing::warn!`
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CheckObserver for TracingObserver {
    fn on_check(&self, report: &CheckReport) {
        let kind = report.kind.as_str();
        let outcome = report.outcome.as_str();
        let elapsed_ms = report.elapsed_ms;

        let context_str = if report.context.is_empty() {
            "{}".to_string()
        } else {
            let pairs: Vec<String> = report
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match report.outcome {
            CheckOutcome::Holds => {
                tracing::debug!(kind, outcome, elapsed_ms, context = %context_str, "{}", report.message);
            },
            CheckOutcome::Violated => {
                tracing::info!(kind, outcome, elapsed_ms, context = %context_str, "{}", report.message);
            },
            CheckOutcome::Unknown => {
                tracing::warn!(kind, outcome, elapsed_ms, context = %context_str, "{}", report.message);
            },
        }
    }
}

/// Built-in observer that collects reports for testing.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    reports: Mutex<Vec<CheckReport>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty report list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected reports.
    #[must_use]
    pub fn reports(&self) -> Vec<CheckReport> {
        self.reports.lock().clone()
    }

    /// Returns the number of collected reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// Returns true if no reports have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    /// Checks if any report with the given outcome has been collected.
    #[must_use]
    pub fn has_outcome(&self, outcome: CheckOutcome) -> bool {
        self.reports.lock().iter().any(|r| r.outcome == outcome)
    }

    /// Returns all reports of the specified kind.
    #[must_use]
    pub fn reports_of_kind(&self, kind: CheckKind) -> Vec<CheckReport> {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }

    /// Clears all collected reports.
    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl CheckObserver for CollectingObserver {
    fn on_check(&self, report: &CheckReport) {
        self.reports.lock().push(report.clone());
    }
}

/// A composite observer that forwards reports to multiple observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn CheckObserver>>,
}

impl CompositeObserver {
    /// Creates a new composite observer with no child observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Adds an observer to the composite.
    pub fn add(&mut self, observer: Arc<dyn CheckObserver>) {
        self.observers.push(observer);
    }

    /// Creates a composite observer from a list of observers.
    #[must_use]
    pub fn from_observers(observers: Vec<Arc<dyn CheckObserver>>) -> Self {
        Self { observers }
    }
}

impl CheckObserver for CompositeObserver {
    fn on_check(&self, report: &CheckReport) {
        for observer in &self.observers {
            observer.on_check(report);
        }
    }
}

impl std::fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("num_observers", &self.observers.len())
            .finish()
    }
}

// ==========================================
// Construction-time invariant checking
// ==========================================

/// Result of an invariant check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InvariantViolation {
    /// Name of the type whose invariant was violated.
    pub type_name: &'static str,
    /// Description of the violated invariant.
    pub invariant: String,
    /// Additional diagnostic context.
    pub details: Option<String>,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    #[must_use]
    pub fn new(type_name: &'static str, invariant: impl Into<String>) -> Self {
        Self {
            type_name,
            invariant: invariant.into(),
            details: None,
        }
    }

    /// Adds additional details to the violation.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.invariant)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Trait for types that maintain internal invariants.
///
/// # Example
///
/// ```
/// use netcore_slices::telemetry::{InvariantChecker, InvariantViolation};
///
/// struct Ports {
///     next: i64,
/// }
///
/// impl InvariantChecker for Ports {
///     fn check_invariants(&self) -> Result<(), InvariantViolation> {
///         if self.next < 1 {
///             return Err(InvariantViolation::new("Ports", "port numbers start at 1")
///                 .with_details(format!("next={}", self.next)));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait InvariantChecker {
    /// Checks that all invariants of this type are satisfied.
    ///
    /// Returns `Ok(())` if all invariants hold, or an `InvariantViolation`
    /// describing the first broken invariant.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// Asserts that no collected report ended in [`CheckOutcome::Violated`] or
/// [`CheckOutcome::Unknown`].
///
/// # Panics
///
/// Panics if the observer contains a failing report, printing all reports.
///
/// # Example
///
/// ```
/// use netcore_slices::{assert_all_checks_hold, telemetry::CollectingObserver};
///
/// let observer = CollectingObserver::new();
/// // ... run some checks ...
/// assert_all_checks_hold!(observer);
/// ```
#[macro_export]
macro_rules! assert_all_checks_hold {
    ($observer:expr) => {{
        let reports = $observer.reports();
        assert!(
            reports
                .iter()
                .all(|r| r.outcome == $crate::telemetry::CheckOutcome::Holds),
            "Expected every check to hold, but found:\n{:#?}",
            reports
        );
    }};
}
