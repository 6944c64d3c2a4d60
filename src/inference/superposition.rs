//! Superposition: paramodulating oriented equalities into subterms.
//!
//! Both directions run when a clause is activated: the given clause
//! rewrites into the activated clauses (via the subterm index), and the
//! activated equalities rewrite into the given clause (via the LHS
//! index). Ordering constraints are checked after the unifier is known.

use super::common::{apply_except, dedup_literals, not_smaller, rename_apart};
use super::{id_of, live_index, GeneratingEngine};
use crate::fol::{
    unify_args, Clause, Derivation, InferenceRule, Interner, Kbo, Literal, Substitution, Term,
};
use crate::index::{literal_subterm, IndexKind, IndexManager, TermIndex};
use crate::resource::{BudgetExceeded, ResourceGuard};
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub struct Superposition {
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    ordering: Rc<Kbo>,
    subterms: Option<Weak<RefCell<TermIndex>>>,
    lhs: Option<Weak<RefCell<TermIndex>>>,
}

impl Superposition {
    pub fn new(
        interner: Rc<RefCell<Interner>>,
        selector: Rc<dyn LiteralSelector>,
        ordering: Rc<Kbo>,
    ) -> Self {
        Superposition { interner, selector, ordering, subterms: None, lhs: None }
    }

    /// One superposition step: rewrite `target_lits[position]` at `path`
    /// using `lhs = rhs` under `subst`, collecting the side literals of
    /// both premises.
    #[allow(clippy::too_many_arguments)]
    fn conclude(
        &self,
        from_literals: &[Literal],
        eq_position: usize,
        lhs: &Term,
        rhs: &Term,
        into_literals: &[Literal],
        position: usize,
        path: &[usize],
        subst: &Substitution,
        premises: Vec<usize>,
    ) -> Option<Clause> {
        let lhs_inst = subst.apply(lhs);
        let rhs_inst = subst.apply(rhs);
        if !not_smaller(&self.ordering, &lhs_inst, &rhs_inst) {
            return None;
        }

        // Rewriting into an equality: the rewritten side must not be the
        // strictly smaller one.
        let into_lit = &into_literals[position];
        if into_lit.is_equality(&self.interner.borrow()) && !path.is_empty() {
            let s_inst = subst.apply(&into_lit.args[0]);
            let t_inst = subst.apply(&into_lit.args[1]);
            let (kept, other) = if path[0] == 0 { (&s_inst, &t_inst) } else { (&t_inst, &s_inst) };
            if !not_smaller(&self.ordering, kept, other) {
                return None;
            }
        }

        let rewritten = {
            let lit = subst.apply_literal(into_lit);
            let mut args = lit.args;
            let (arg, rest) = path.split_first()?;
            if *arg >= args.len() {
                return None;
            }
            args[*arg] = args[*arg].replace_at(rest, &rhs_inst);
            Literal { predicate: lit.predicate, args, polarity: lit.polarity }
        };

        let mut literals = apply_except(from_literals, &[eq_position], subst);
        literals.push(rewritten);
        literals.extend(apply_except(into_literals, &[position], subst));
        Some(Clause::new(
            dedup_literals(literals),
            Derivation::new(InferenceRule::Superposition, premises),
        ))
    }
}

impl GeneratingEngine for Superposition {
    fn name(&self) -> &'static str {
        "superposition"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let subterms = manager.request(IndexKind::SuperpositionSubtermSubstTree);
        self.subterms = subterms.as_term().map(Rc::downgrade);
        let lhs = manager.request(IndexKind::SuperpositionLhsSubstTree);
        self.lhs = lhs.as_term().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.subterms = None;
        self.lhs = None;
        manager.release(IndexKind::SuperpositionSubtermSubstTree);
        manager.release(IndexKind::SuperpositionLhsSubstTree);
    }

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded> {
        let mut conclusions = Vec::new();
        let selected = self.selector.select(given);

        // Direction 1: a selected equality of the given clause rewrites a
        // subterm of an activated clause.
        let subterm_index = live_index(&self.subterms);
        for &i in &selected {
            let lit = &given.literals[i];
            if !lit.is_positive_equality(&self.interner.borrow()) {
                continue;
            }
            for side in 0..2 {
                let lhs = &lit.args[side];
                let rhs = &lit.args[1 - side];
                if matches!(lhs, Term::Variable(_)) {
                    continue;
                }
                if !not_smaller(&self.ordering, lhs, rhs) {
                    continue;
                }
                for entry in subterm_index.borrow().unifiable(lhs) {
                    let partner = &entry.clause;
                    let partner_literals = {
                        let mut interner = self.interner.borrow_mut();
                        rename_apart(partner, &mut interner)
                    };
                    let target = match literal_subterm(
                        &partner_literals[entry.position],
                        &entry.path,
                    ) {
                        Some(term) if !matches!(term, Term::Variable(_)) => term.clone(),
                        _ => continue,
                    };
                    let mut subst = Substitution::new();
                    if unify_args(
                        std::slice::from_ref(lhs),
                        std::slice::from_ref(&target),
                        &mut subst,
                    )
                    .is_err()
                    {
                        continue;
                    }
                    if let Some(conclusion) = self.conclude(
                        &given.literals,
                        i,
                        lhs,
                        rhs,
                        &partner_literals,
                        entry.position,
                        &entry.path,
                        &subst,
                        vec![id_of(given), id_of(partner)],
                    ) {
                        conclusions.push(conclusion);
                    }
                }
            }
        }

        // Direction 2: activated equalities rewrite subterms of the given
        // clause's selected literals.
        let lhs_index = live_index(&self.lhs);
        for &i in &selected {
            let lit = &given.literals[i];
            for (path, target) in non_variable_subterms(lit) {
                for entry in lhs_index.borrow().unifiable(&target) {
                    let partner = &entry.clause;
                    let partner_literals = {
                        let mut interner = self.interner.borrow_mut();
                        rename_apart(partner, &mut interner)
                    };
                    let eq_lit = &partner_literals[entry.position];
                    let side = entry.path[0];
                    let lhs = eq_lit.args[side].clone();
                    let rhs = eq_lit.args[1 - side].clone();
                    let mut subst = Substitution::new();
                    if unify_args(
                        std::slice::from_ref(&lhs),
                        std::slice::from_ref(&target),
                        &mut subst,
                    )
                    .is_err()
                    {
                        continue;
                    }
                    if let Some(conclusion) = self.conclude(
                        &partner_literals,
                        entry.position,
                        &lhs,
                        &rhs,
                        &given.literals,
                        i,
                        &path,
                        &subst,
                        vec![id_of(partner), id_of(given)],
                    ) {
                        conclusions.push(conclusion);
                    }
                }
            }
        }

        Ok(conclusions)
    }
}

/// Non-variable subterms of a literal with their paths.
fn non_variable_subterms(lit: &Literal) -> Vec<(Vec<usize>, Term)> {
    fn walk(term: &Term, path: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, Term)>) {
        if !matches!(term, Term::Variable(_)) {
            out.push((path.clone(), term.clone()));
        }
        if let Term::Function(_, args) = term {
            for (i, arg) in args.iter().enumerate() {
                path.push(i);
                walk(arg, path, out);
                path.pop();
            }
        }
    }
    let mut out = Vec::new();
    for (i, arg) in lit.args.iter().enumerate() {
        let mut path = vec![i];
        walk(arg, &mut path, &mut out);
    }
    out
}
