//! Index-free forward simplifications: tautology deletion and duplicate
//! literal removal.

use super::common::dedup_literals;
use super::{ForwardOutcome, SimplifyingEngine};
use crate::fol::{Clause, Derivation, InferenceRule, Interner};
use crate::index::IndexManager;
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::cell::RefCell;
use std::rc::Rc;

/// Deletes clauses containing complementary literals or a reflexive
/// positive equality.
pub struct TautologyDeletion {
    interner: Rc<RefCell<Interner>>,
}

impl TautologyDeletion {
    pub fn new(interner: Rc<RefCell<Interner>>) -> Self {
        TautologyDeletion { interner }
    }
}

impl SimplifyingEngine for TautologyDeletion {
    fn name(&self) -> &'static str {
        "tautology deletion"
    }

    fn attach(&mut self, _manager: &mut IndexManager) {}

    fn detach(&mut self, _manager: &mut IndexManager) {}

    fn simplify_forward(
        &mut self,
        clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<ForwardOutcome, BudgetExceeded> {
        if clause.is_tautology(&self.interner.borrow()) {
            Ok(ForwardOutcome::Delete {
                rule: InferenceRule::TautologyDeletion,
                premises: Vec::new(),
            })
        } else {
            Ok(ForwardOutcome::Keep)
        }
    }
}

/// Replaces a clause containing repeated literals with its deduplicated
/// form.
pub struct DuplicateLiteralRemoval;

impl SimplifyingEngine for DuplicateLiteralRemoval {
    fn name(&self) -> &'static str {
        "duplicate literal removal"
    }

    fn attach(&mut self, _manager: &mut IndexManager) {}

    fn detach(&mut self, _manager: &mut IndexManager) {}

    fn simplify_forward(
        &mut self,
        clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<ForwardOutcome, BudgetExceeded> {
        let deduped = dedup_literals(clause.literals.clone());
        if deduped.len() < clause.literals.len() {
            let premises = clause.id.into_iter().collect();
            Ok(ForwardOutcome::Replace(Clause::new(
                deduped,
                Derivation::new(InferenceRule::DuplicateLiteralRemoval, premises),
            )))
        } else {
            Ok(ForwardOutcome::Keep)
        }
    }
}
