//! Forward subsumption demodulation: combined subsumption and conditional
//! rewriting. A candidate `C' ∨ l = r` whose non-equality part matches
//! into the new clause supplies an instantiated equality σl = σr used to
//! rewrite the unmatched rest of the clause.

use super::{id_of, live_index, ForwardOutcome, SimplifyingEngine};
use crate::fol::{
    match_term, Clause, Derivation, InferenceRule, Interner, Kbo, Literal, MatchBindings, Term,
    TermOrdering,
};
use crate::index::{IndexKind, IndexManager, SubsumptionIndex};
use crate::matcher::{literal_alternatives, MatchKind, MlMatcher};
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub struct ForwardSubsumptionDemodulation {
    interner: Rc<RefCell<Interner>>,
    ordering: Rc<Kbo>,
    index: Option<Weak<RefCell<SubsumptionIndex>>>,
}

impl ForwardSubsumptionDemodulation {
    pub fn new(interner: Rc<RefCell<Interner>>, ordering: Rc<Kbo>) -> Self {
        ForwardSubsumptionDemodulation { interner, ordering, index: None }
    }

    /// Rewrite one unmatched literal of `clause` with the instantiated
    /// equality, if the instance ordering allows it.
    fn rewrite_with_equality(
        &self,
        clause: &Rc<Clause>,
        candidate: &Rc<Clause>,
        eq_lit: &Literal,
        bindings: &std::collections::HashMap<crate::fol::VariableId, &Term>,
        matched: &[bool],
    ) -> Option<Clause> {
        let mut seeded = MatchBindings::new(0);
        for (&var, &term) in bindings {
            seeded.bind(var, term);
        }

        for (position, target_lit) in clause.literals.iter().enumerate() {
            if matched[position] {
                continue;
            }
            for (path, target) in non_variable_subterm_paths(target_lit) {
                for side in 0..2 {
                    let lhs = &eq_lit.args[side];
                    let rhs = &eq_lit.args[1 - side];
                    let mark = seeded.mark();
                    if !match_term(lhs, target, &mut seeded) {
                        seeded.undo_to(mark);
                        continue;
                    }
                    let rhs_inst = seeded.apply(rhs);
                    seeded.undo_to(mark);
                    if self.ordering.compare(target, &rhs_inst) != TermOrdering::Greater {
                        continue;
                    }
                    let literals = clause
                        .literals
                        .iter()
                        .enumerate()
                        .map(|(i, lit)| {
                            if i == position {
                                rewrite_at(lit, &path, &rhs_inst)
                            } else {
                                lit.clone()
                            }
                        })
                        .collect();
                    return Some(Clause::new(
                        literals,
                        Derivation::new(
                            InferenceRule::ForwardSubsumptionDemodulation,
                            vec![id_of(clause), id_of(candidate)],
                        ),
                    ));
                }
            }
        }
        None
    }
}

impl SimplifyingEngine for ForwardSubsumptionDemodulation {
    fn name(&self) -> &'static str {
        "forward subsumption demodulation"
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
        let candidates = index.borrow().fsd_candidates(clause);

        for candidate in &candidates {
            if candidate.id == clause.id {
                continue;
            }
            let interner = self.interner.borrow();
            let alts = literal_alternatives(candidate, clause, &interner);
            let mut matcher = MlMatcher::new(
                candidate,
                clause,
                alts,
                MatchKind::EqualitySkip,
                &interner,
                Some(guard),
            );
            while matcher.next_match()? {
                match matcher.equality_for_demodulation() {
                    None => {
                        // The whole candidate matched: plain subsumption.
                        return Ok(ForwardOutcome::Delete {
                            rule: InferenceRule::Subsumption,
                            premises: vec![id_of(candidate)],
                        });
                    }
                    Some(eq_lit) => {
                        let bindings = matcher.bindings();
                        let matched = matcher.matched_bitmap();
                        if let Some(replacement) = self.rewrite_with_equality(
                            clause, candidate, eq_lit, &bindings, &matched,
                        ) {
                            return Ok(ForwardOutcome::Replace(replacement));
                        }
                    }
                }
            }
        }
        Ok(ForwardOutcome::Keep)
    }
}

fn rewrite_at(lit: &Literal, path: &[usize], replacement: &Term) -> Literal {
    let mut args = lit.args.clone();
    if let Some((&arg, rest)) = path.split_first() {
        if arg < args.len() {
            args[arg] = args[arg].replace_at(rest, replacement);
        }
    }
    Literal { predicate: lit.predicate, args, polarity: lit.polarity }
}

fn non_variable_subterm_paths(lit: &Literal) -> Vec<(Vec<usize>, &Term)> {
    fn walk<'t>(term: &'t Term, path: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, &'t Term)>) {
        if !matches!(term, Term::Variable(_)) {
            out.push((path.clone(), term));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, PredicateSymbol, Variable};
    use crate::saturation::ContainerListener;

    struct TestContext {
        interner: Rc<RefCell<Interner>>,
    }

    impl TestContext {
        fn new() -> Self {
            TestContext { interner: Rc::new(RefCell::new(Interner::new())) }
        }

        fn var(&self, name: &str) -> Term {
            Term::Variable(Variable::new(self.interner.borrow_mut().intern_variable(name)))
        }

        fn const_(&self, name: &str) -> Term {
            Term::Constant(Constant::new(self.interner.borrow_mut().intern_constant(name)))
        }

        fn func(&self, name: &str, args: Vec<Term>) -> Term {
            let id = self.interner.borrow_mut().intern_function(name);
            Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
        }

        fn eq(&self) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.borrow().equality(), 2)
        }

        fn clause(&self, id: usize, literals: Vec<Literal>) -> Rc<Clause> {
            let mut clause = Clause::input(literals);
            clause.id = Some(id);
            Rc::new(clause)
        }
    }

    #[test]
    fn conditional_rewrite_through_matched_condition() {
        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let p = PredicateSymbol::new(ctx.interner.borrow_mut().intern_predicate("P"), 1);
        let q = PredicateSymbol::new(ctx.interner.borrow_mut().intern_predicate("Q"), 1);
        let fx = ctx.func("f", vec![x.clone()]);
        let fa = ctx.func("f", vec![a.clone()]);

        // Candidate: f(X) = X | ~P(X): under P(a), rewrites f(a) -> a.
        let candidate = ctx.clause(
            1,
            vec![
                Literal::positive(ctx.eq(), vec![fx, x.clone()]),
                Literal::negative(p, vec![x]),
            ],
        );
        let index = Rc::new(RefCell::new(SubsumptionIndex::new(
            ctx.interner.borrow().equality(),
        )));
        index.borrow_mut().clause_added(&candidate);

        let mut engine = ForwardSubsumptionDemodulation::new(
            ctx.interner.clone(),
            Rc::new(Kbo::default()),
        );
        engine.index = Some(Rc::downgrade(&index));

        // New clause: ~P(a) | Q(f(a)). Expected replacement: ~P(a) | Q(a).
        let clause = ctx.clause(
            0,
            vec![
                Literal::negative(p, vec![a.clone()]),
                Literal::positive(q, vec![fa]),
            ],
        );
        let guard = ResourceGuard::unlimited();
        match engine.simplify_forward(&clause, &guard).unwrap() {
            ForwardOutcome::Replace(replacement) => {
                assert_eq!(
                    replacement.derivation.rule,
                    InferenceRule::ForwardSubsumptionDemodulation
                );
                let rewritten = &replacement.literals[1];
                assert_eq!(rewritten.args[0], ctx.const_("a"));
            }
            _ => panic!("expected a rewrite"),
        }
    }

    #[test]
    fn no_rewrite_without_ordering_decrease() {
        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let p = PredicateSymbol::new(ctx.interner.borrow_mut().intern_predicate("P"), 1);
        let q = PredicateSymbol::new(ctx.interner.borrow_mut().intern_predicate("Q"), 1);
        let fx = ctx.func("f", vec![x.clone()]);

        // Candidate equality oriented the wrong way for the target: X = f(X)
        // can only rewrite f(a) -> a (never a -> f(a)); the clause contains
        // no f-term, so nothing happens.
        let candidate = ctx.clause(
            1,
            vec![
                Literal::positive(ctx.eq(), vec![x.clone(), fx]),
                Literal::negative(p, vec![x]),
            ],
        );
        let index = Rc::new(RefCell::new(SubsumptionIndex::new(
            ctx.interner.borrow().equality(),
        )));
        index.borrow_mut().clause_added(&candidate);

        let mut engine = ForwardSubsumptionDemodulation::new(
            ctx.interner.clone(),
            Rc::new(Kbo::default()),
        );
        engine.index = Some(Rc::downgrade(&index));

        let clause = ctx.clause(
            0,
            vec![
                Literal::negative(p, vec![a.clone()]),
                Literal::positive(q, vec![a]),
            ],
        );
        let guard = ResourceGuard::unlimited();
        assert!(matches!(
            engine.simplify_forward(&clause, &guard).unwrap(),
            ForwardOutcome::Keep
        ));
    }
}
