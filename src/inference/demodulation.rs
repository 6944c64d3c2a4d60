//! Demodulation: rewriting with oriented unit equalities.

use super::{
    id_of, live_index, BackwardSimplification, ForwardOutcome, SimplifyingEngine,
};
use crate::fol::{
    match_term, Clause, Derivation, InferenceRule, Interner, Kbo, Literal, MatchBindings, Term,
    TermOrdering,
};
use crate::index::{literal_subterm, IndexKind, IndexManager, TermIndex};
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Replace the subterm of a literal at `path` (argument index first).
fn rewrite_literal(lit: &Literal, path: &[usize], replacement: &Term) -> Literal {
    let mut args = lit.args.clone();
    if let Some((&arg, rest)) = path.split_first() {
        if arg < args.len() {
            args[arg] = args[arg].replace_at(rest, replacement);
        }
    }
    Literal { predicate: lit.predicate, args, polarity: lit.polarity }
}

/// Rebuild a clause with one literal rewritten.
fn rewrite_clause(
    clause: &Clause,
    position: usize,
    path: &[usize],
    replacement: &Term,
    derivation: Derivation,
) -> Clause {
    let literals = clause
        .literals
        .iter()
        .enumerate()
        .map(|(i, lit)| {
            if i == position {
                rewrite_literal(lit, path, replacement)
            } else {
                lit.clone()
            }
        })
        .collect();
    Clause::new(literals, derivation)
}

/// Forward demodulation: rewrite a new clause with the indexed unit
/// equalities of the simplifying container.
pub struct ForwardDemodulation {
    ordering: Rc<Kbo>,
    index: Option<Weak<RefCell<TermIndex>>>,
}

impl ForwardDemodulation {
    pub fn new(ordering: Rc<Kbo>) -> Self {
        ForwardDemodulation { ordering, index: None }
    }
}

impl SimplifyingEngine for ForwardDemodulation {
    fn name(&self) -> &'static str {
        "forward demodulation"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let handle = manager.request(IndexKind::FwDemodulationLhsSubstTree);
        self.index = handle.as_term().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.index = None;
        manager.release(IndexKind::FwDemodulationLhsSubstTree);
    }

    fn simplify_forward(
        &mut self,
        clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<ForwardOutcome, BudgetExceeded> {
        let index = live_index(&self.index);
        let index = index.borrow();

        for (position, lit) in clause.literals.iter().enumerate() {
            let mut paths: Vec<Vec<usize>> = Vec::new();
            collect_paths(lit, &mut paths);
            for path in paths {
                let target = match literal_subterm(lit, &path) {
                    Some(term) => term,
                    None => continue,
                };
                for entry in index.generalizations(target) {
                    if entry.clause.id == clause.id {
                        continue;
                    }
                    // Indexed side and its counterpart within the unit
                    // equality.
                    let eq_lit = &entry.clause.literals[entry.position];
                    let side = entry.path[0];
                    let lhs = &eq_lit.args[side];
                    let rhs = &eq_lit.args[1 - side];

                    let mut bindings = MatchBindings::new(0);
                    if !match_term(lhs, target, &mut bindings) {
                        continue;
                    }
                    let rhs_inst = bindings.apply(rhs);
                    if self.ordering.compare(target, &rhs_inst) != TermOrdering::Greater {
                        continue;
                    }
                    let derivation = Derivation::new(
                        InferenceRule::Demodulation,
                        vec![id_of(clause), id_of(&entry.clause)],
                    );
                    return Ok(ForwardOutcome::Replace(rewrite_clause(
                        clause, position, &path, &rhs_inst, derivation,
                    )));
                }
            }
        }
        Ok(ForwardOutcome::Keep)
    }
}

/// Backward demodulation: a newly derived unit equality rewrites the
/// to-be-simplified clauses containing instances of its larger side.
pub struct BackwardDemodulation {
    interner: Rc<RefCell<Interner>>,
    ordering: Rc<Kbo>,
    index: Option<Weak<RefCell<TermIndex>>>,
}

impl BackwardDemodulation {
    pub fn new(interner: Rc<RefCell<Interner>>, ordering: Rc<Kbo>) -> Self {
        BackwardDemodulation { interner, ordering, index: None }
    }
}

impl SimplifyingEngine for BackwardDemodulation {
    fn name(&self) -> &'static str {
        "backward demodulation"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let handle = manager.request(IndexKind::BwDemodulationSubtermSubstTree);
        self.index = handle.as_term().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.index = None;
        manager.release(IndexKind::BwDemodulationSubtermSubstTree);
    }

    fn simplify_backward(
        &mut self,
        clause: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<BackwardSimplification>, BudgetExceeded> {
        {
            let interner = self.interner.borrow();
            if !clause.is_unit() || !clause.literals[0].is_positive_equality(&interner) {
                return Ok(Vec::new());
            }
        }
        let eq_lit = &clause.literals[0];

        // Sides usable left-to-right; Incomparable sides are re-checked
        // per instance.
        let orientations: Vec<usize> = match self.ordering.compare(&eq_lit.args[0], &eq_lit.args[1])
        {
            TermOrdering::Greater => vec![0],
            TermOrdering::Less => vec![1],
            TermOrdering::Incomparable => vec![0, 1],
            TermOrdering::Equal => Vec::new(),
        };

        let index = live_index(&self.index);
        let index = index.borrow();
        let mut results: Vec<BackwardSimplification> = Vec::new();
        let mut rewritten: Vec<usize> = Vec::new();

        for side in orientations {
            let lhs = &eq_lit.args[side];
            let rhs = &eq_lit.args[1 - side];
            if matches!(lhs, Term::Variable(_)) {
                continue;
            }
            for entry in index.instances(lhs) {
                let victim = entry.clause.clone();
                let victim_id = id_of(&victim);
                if Some(victim_id) == clause.id || rewritten.contains(&victim_id) {
                    continue;
                }
                let target = entry.term();
                let mut bindings = MatchBindings::new(0);
                if !match_term(lhs, target, &mut bindings) {
                    continue;
                }
                let rhs_inst = bindings.apply(rhs);
                if self.ordering.compare(target, &rhs_inst) != TermOrdering::Greater {
                    continue;
                }
                rewritten.push(victim_id);
                let derivation = Derivation::new(
                    InferenceRule::Demodulation,
                    vec![victim_id, id_of(clause)],
                );
                let replacement = rewrite_clause(
                    &victim,
                    entry.position,
                    &entry.path,
                    &rhs_inst,
                    derivation,
                );
                results.push(BackwardSimplification { victim, replacement: Some(replacement) });
            }
        }
        Ok(results)
    }
}

/// All paths to non-variable subterms of a literal's arguments.
fn collect_paths(lit: &Literal, out: &mut Vec<Vec<usize>>) {
    fn walk(term: &Term, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if !matches!(term, Term::Variable(_)) {
            out.push(path.clone());
        }
        if let Term::Function(_, args) = term {
            for (i, arg) in args.iter().enumerate() {
                path.push(i);
                walk(arg, path, out);
                path.pop();
            }
        }
    }
    for (i, arg) in lit.args.iter().enumerate() {
        let mut path = vec![i];
        walk(arg, &mut path, out);
    }
}
