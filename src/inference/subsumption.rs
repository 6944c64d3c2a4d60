//! Forward and backward subsumption (and forward subsumption resolution),
//! built on the multi-literal matcher.

use super::{
    id_of, live_index, BackwardSimplification, ForwardOutcome, SimplifyingEngine,
};
use crate::fol::{
    match_term, Clause, Derivation, InferenceRule, Interner, MatchBindings,
};
use crate::index::{IndexKind, IndexManager, LiteralIndex, SubsumptionIndex};
use crate::matcher::{literal_alternatives, MatchKind, MlMatcher};
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Forward subsumption with subsumption resolution.
///
/// A new clause is deleted when an indexed clause matches into it
/// (multiset subsumption); failing that, subsumption resolution may cut
/// one literal out of the new clause.
pub struct ForwardSubsumption {
    interner: Rc<RefCell<Interner>>,
    index: Option<Weak<RefCell<SubsumptionIndex>>>,
}

impl ForwardSubsumption {
    pub fn new(interner: Rc<RefCell<Interner>>) -> Self {
        ForwardSubsumption { interner, index: None }
    }

    /// Try to cut one literal of `clause` using `candidate`: some literal
    /// of the candidate, instantiated by a match of the remaining
    /// literals, must be complementary to a literal of `clause` outside
    /// the matched positions.
    fn try_subsumption_resolution(
        &self,
        candidate: &Rc<Clause>,
        clause: &Rc<Clause>,
        guard: &ResourceGuard,
    ) -> Result<Option<Clause>, BudgetExceeded> {
        let interner = self.interner.borrow();
        for resolved in 0..candidate.literals.len() {
            let alts = literal_alternatives(candidate, clause, &interner);
            let mut matcher = MlMatcher::new(
                candidate,
                clause,
                alts,
                MatchKind::Resolved(resolved),
                &interner,
                Some(guard),
            );
            while matcher.next_match()? {
                let bindings = matcher.bindings();
                let bitmap = matcher.matched_bitmap();
                let resolved_lit = &candidate.literals[resolved];

                // Instantiate the resolved literal as far as the match
                // determines it, then look for a complementary partner
                // among the unclaimed literals of the clause.
                let mut seeded = MatchBindings::new(0);
                for (&var, &term) in &bindings {
                    seeded.bind(var, term);
                }
                for (pos, target) in clause.literals.iter().enumerate() {
                    if bitmap[pos]
                        || target.polarity == resolved_lit.polarity
                        || target.predicate != resolved_lit.predicate
                    {
                        continue;
                    }
                    let mark = seeded.mark();
                    let matched = resolved_lit.args.len() == target.args.len()
                        && resolved_lit
                            .args
                            .iter()
                            .zip(&target.args)
                            .all(|(p, t)| match_term(p, t, &mut seeded));
                    seeded.undo_to(mark);
                    if matched {
                        let literals = clause
                            .literals
                            .iter()
                            .enumerate()
                            .filter(|(i, _)| *i != pos)
                            .map(|(_, lit)| lit.clone())
                            .collect();
                        return Ok(Some(Clause::new(
                            literals,
                            Derivation::new(
                                InferenceRule::SubsumptionResolution,
                                vec![id_of(clause), id_of(candidate)],
                            ),
                        )));
                    }
                }
            }
        }
        Ok(None)
    }
}

impl SimplifyingEngine for ForwardSubsumption {
    fn name(&self) -> &'static str {
        "forward subsumption"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let handle = manager.request(IndexKind::FwSubsumptionCodeTree);
        self.index = handle.as_subsumption().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.index = None;
        manager.release(IndexKind::FwSubsumptionCodeTree);
    }

    fn simplify_forward(
        &mut self,
        clause: &Rc<Clause>,
        guard: &ResourceGuard,
    ) -> Result<ForwardOutcome, BudgetExceeded> {
        let index = live_index(&self.index);
        let candidates = index.borrow().subsuming_candidates(clause);

        for candidate in &candidates {
            if candidate.id == clause.id {
                continue;
            }
            let alts = {
                let interner = self.interner.borrow();
                literal_alternatives(candidate, clause, &interner)
            };
            if alts.iter().any(Vec::is_empty) {
                continue;
            }
            let interner = self.interner.borrow();
            let mut matcher = MlMatcher::new(
                candidate,
                clause,
                alts,
                MatchKind::Subsumption,
                &interner,
                Some(guard),
            );
            if matcher.next_match()? {
                return Ok(ForwardOutcome::Delete {
                    rule: InferenceRule::Subsumption,
                    premises: vec![id_of(candidate)],
                });
            }
        }

        for candidate in &candidates {
            if candidate.id == clause.id {
                continue;
            }
            if let Some(replacement) =
                self.try_subsumption_resolution(candidate, clause, guard)?
            {
                return Ok(ForwardOutcome::Replace(replacement));
            }
        }
        Ok(ForwardOutcome::Keep)
    }
}

/// Backward subsumption: a clause about to be activated deletes the
/// to-be-simplified clauses it subsumes.
pub struct BackwardSubsumption {
    interner: Rc<RefCell<Interner>>,
    index: Option<Weak<RefCell<LiteralIndex>>>,
}

impl BackwardSubsumption {
    pub fn new(interner: Rc<RefCell<Interner>>) -> Self {
        BackwardSubsumption { interner, index: None }
    }
}

impl SimplifyingEngine for BackwardSubsumption {
    fn name(&self) -> &'static str {
        "backward subsumption"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let handle = manager.request(IndexKind::BwSimplificationSubstTree);
        self.index = handle.as_literal().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.index = None;
        manager.release(IndexKind::BwSimplificationSubstTree);
    }

    fn simplify_backward(
        &mut self,
        clause: &Rc<Clause>,
        guard: &ResourceGuard,
    ) -> Result<Vec<BackwardSimplification>, BudgetExceeded> {
        if clause.is_empty() {
            return Ok(Vec::new());
        }
        let index = live_index(&self.index);

        // Instances of one literal of the subsumer narrow the candidates;
        // every subsumed clause must contain an instance of each literal.
        let entries = index.borrow().instances(&clause.literals[0]);
        let mut results = Vec::new();
        let mut seen = Vec::new();
        for entry in entries {
            let victim = entry.clause;
            let victim_id = id_of(&victim);
            if Some(victim_id) == clause.id || seen.contains(&victim_id) {
                continue;
            }
            seen.push(victim_id);
            if victim.literals.len() < clause.literals.len() {
                continue;
            }
            let interner = self.interner.borrow();
            let alts = literal_alternatives(clause, &victim, &interner);
            if alts.iter().any(Vec::is_empty) {
                continue;
            }
            let mut matcher = MlMatcher::new(
                clause,
                &victim,
                alts,
                MatchKind::Subsumption,
                &interner,
                Some(guard),
            );
            if matcher.next_match()? {
                results.push(BackwardSimplification { victim: victim.clone(), replacement: None });
            }
        }
        Ok(results)
    }
}
