//! Inference engines.
//!
//! Simplifying engines run forward (against the simplifying container's
//! indices, on a clause freshly popped from Unprocessed or re-checked
//! before activation) and backward (using a clause about to be activated
//! against the to-be-simplified container's indices). Generating engines
//! produce conclusions for an activated clause.
//!
//! Engines attach to the index manager by requesting the index kinds they
//! need and hold only weak references to them; the manager owns every
//! index and destroys it when the last engine releases it.

mod common;
mod demodulation;
mod equality;
mod resolution;
mod subsumption;
mod subsumption_demodulation;
mod superposition;
mod tautology;

pub use demodulation::{BackwardDemodulation, ForwardDemodulation};
pub use equality::{EqualityFactoring, EqualityResolution};
pub use resolution::{Factoring, Resolution};
pub use subsumption::{BackwardSubsumption, ForwardSubsumption};
pub use subsumption_demodulation::ForwardSubsumptionDemodulation;
pub use superposition::Superposition;
pub use tautology::{DuplicateLiteralRemoval, TautologyDeletion};

use crate::fol::{Clause, InferenceRule};
use crate::index::IndexManager;
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// What forward simplification did to a clause.
pub enum ForwardOutcome {
    /// Untouched.
    Keep,
    /// Redundant; the premises justify the deletion.
    Delete { rule: InferenceRule, premises: Vec<usize> },
    /// Replaced by a strictly simpler clause (whose derivation carries the
    /// rule and premises).
    Replace(Clause),
}

/// One clause of the to-be-simplified container made redundant by a newly
/// activated clause.
pub struct BackwardSimplification {
    pub victim: Rc<Clause>,
    /// `None` deletes the victim; `Some` replaces it.
    pub replacement: Option<Clause>,
}

/// A simplification engine. Engines may implement only one direction.
pub trait SimplifyingEngine {
    fn name(&self) -> &'static str;

    fn attach(&mut self, manager: &mut IndexManager);

    fn detach(&mut self, manager: &mut IndexManager);

    fn simplify_forward(
        &mut self,
        _clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<ForwardOutcome, BudgetExceeded> {
        Ok(ForwardOutcome::Keep)
    }

    fn simplify_backward(
        &mut self,
        _clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<BackwardSimplification>, BudgetExceeded> {
        Ok(Vec::new())
    }
}

/// A generating inference engine.
pub trait GeneratingEngine {
    fn name(&self) -> &'static str;

    fn attach(&mut self, manager: &mut IndexManager);

    fn detach(&mut self, manager: &mut IndexManager);

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded>;
}

/// Upgrade an engine's weak index handle. Engines only run between attach
/// and detach, so a dead handle is a programming error.
pub(crate) fn live_index<T>(weak: &Option<Weak<RefCell<T>>>) -> Rc<RefCell<T>> {
    weak.as_ref()
        .and_then(Weak::upgrade)
        .unwrap_or_else(|| panic!("inference engine used without a live index"))
}

/// The registered id of a clause participating in an inference.
pub(crate) fn id_of(clause: &Clause) -> usize {
    clause.id.expect("premise clause must be registered")
}
