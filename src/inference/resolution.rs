//! Binary resolution and factoring.

use super::common::{apply_except, dedup_literals, rename_apart};
use super::{id_of, live_index, GeneratingEngine};
use crate::fol::{unify_args, Clause, Derivation, InferenceRule, Interner, Substitution};
use crate::index::{IndexKind, IndexManager, LiteralIndex};
use crate::resource::{BudgetExceeded, ResourceGuard};
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Binary resolution between the given clause and the activated clauses,
/// partners found through the generating literal index.
pub struct Resolution {
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    index: Option<Weak<RefCell<LiteralIndex>>>,
}

impl Resolution {
    pub fn new(interner: Rc<RefCell<Interner>>, selector: Rc<dyn LiteralSelector>) -> Self {
        Resolution { interner, selector, index: None }
    }
}

impl GeneratingEngine for Resolution {
    fn name(&self) -> &'static str {
        "resolution"
    }

    fn attach(&mut self, manager: &mut IndexManager) {
        let handle = manager.request(IndexKind::GeneratingSubstTree);
        self.index = handle.as_literal().map(Rc::downgrade);
    }

    fn detach(&mut self, manager: &mut IndexManager) {
        self.index = None;
        manager.release(IndexKind::GeneratingSubstTree);
    }

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded> {
        let index = live_index(&self.index);
        let mut conclusions = Vec::new();

        for i in self.selector.select(given) {
            let lit = &given.literals[i];
            let partners = index.borrow().unifiable_complements(lit);
            for entry in partners {
                let partner = &entry.clause;
                // Rename the partner apart; the given clause keeps its
                // variables.
                let partner_literals = {
                    let mut interner = self.interner.borrow_mut();
                    rename_apart(partner, &mut interner)
                };
                let partner_lit = &partner_literals[entry.position];
                if partner_lit.predicate != lit.predicate
                    || partner_lit.polarity == lit.polarity
                {
                    continue;
                }
                let mut subst = Substitution::new();
                if unify_args(&lit.args, &partner_lit.args, &mut subst).is_err() {
                    continue;
                }
                let mut literals = apply_except(&given.literals, &[i], &subst);
                literals.extend(apply_except(&partner_literals, &[entry.position], &subst));
                conclusions.push(Clause::new(
                    dedup_literals(literals),
                    Derivation::new(
                        InferenceRule::Resolution,
                        vec![id_of(given), id_of(partner)],
                    ),
                ));
            }
        }
        Ok(conclusions)
    }
}

/// Factoring: unify two same-polarity literals of the given clause and
/// drop one of them.
pub struct Factoring {
    selector: Rc<dyn LiteralSelector>,
}

impl Factoring {
    pub fn new(selector: Rc<dyn LiteralSelector>) -> Self {
        Factoring { selector }
    }
}

impl GeneratingEngine for Factoring {
    fn name(&self) -> &'static str {
        "factoring"
    }

    fn attach(&mut self, _manager: &mut IndexManager) {}

    fn detach(&mut self, _manager: &mut IndexManager) {}

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded> {
        let mut conclusions = Vec::new();
        for i in self.selector.select(given) {
            let first = &given.literals[i];
            for (j, second) in given.literals.iter().enumerate() {
                if i == j
                    || first.polarity != second.polarity
                    || first.predicate != second.predicate
                {
                    continue;
                }
                let mut subst = Substitution::new();
                if unify_args(&first.args, &second.args, &mut subst).is_err() {
                    continue;
                }
                let literals = dedup_literals(apply_except(&given.literals, &[j], &subst));
                conclusions.push(Clause::new(
                    literals,
                    Derivation::new(InferenceRule::Factoring, vec![id_of(given)]),
                ));
            }
        }
        Ok(conclusions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, Literal, PredicateSymbol, Term, Variable};
    use crate::selection::SelectAll;

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

        fn pred(&self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.borrow_mut().intern_predicate(name), arity)
        }

        fn clause(&self, id: usize, literals: Vec<Literal>) -> Rc<Clause> {
            let mut clause = Clause::input(literals);
            clause.id = Some(id);
            Rc::new(clause)
        }
    }

    #[test]
    fn factoring_collapses_unifiable_literals() {
        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let p = ctx.pred("P", 1);
        let q = ctx.pred("Q", 1);

        // P(X) | P(a) | Q(X) factors to P(a) | Q(a).
        let given = ctx.clause(
            0,
            vec![
                Literal::positive(p, vec![x.clone()]),
                Literal::positive(p, vec![a.clone()]),
                Literal::positive(q, vec![x]),
            ],
        );
        let guard = ResourceGuard::unlimited();
        let mut engine = Factoring::new(Rc::new(SelectAll));
        let conclusions = engine.generate(&given, &guard).unwrap();
        assert!(conclusions
            .iter()
            .any(|c| c.literals.len() == 2
                && c.literals.iter().all(|l| l.args[0] == ctx.const_("a"))));
    }

    #[test]
    fn resolution_through_the_generating_index() {
        use crate::fol::Kbo;
        use crate::index::LiteralIndexPolicy;
        use crate::saturation::ContainerListener;

        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let p = ctx.pred("P", 1);
        let q = ctx.pred("Q", 1);

        // Active partner: ~P(X) | Q(X).
        let partner = ctx.clause(
            1,
            vec![
                Literal::negative(p, vec![x.clone()]),
                Literal::positive(q, vec![x]),
            ],
        );
        let index = Rc::new(RefCell::new(LiteralIndex::new(
            LiteralIndexPolicy::Generating,
            ctx.interner.clone(),
            Rc::new(SelectAll),
            Rc::new(Kbo::default()),
        )));
        index.borrow_mut().clause_added(&partner);

        let mut engine = Resolution::new(ctx.interner.clone(), Rc::new(SelectAll));
        engine.index = Some(Rc::downgrade(&index));

        // Given: P(a). Resolvent: Q(a).
        let given = ctx.clause(0, vec![Literal::positive(p, vec![a.clone()])]);
        let guard = ResourceGuard::unlimited();
        let conclusions = engine.generate(&given, &guard).unwrap();
        assert_eq!(conclusions.len(), 1);
        assert_eq!(conclusions[0].literals.len(), 1);
        assert_eq!(conclusions[0].literals[0].predicate, q);
        assert_eq!(conclusions[0].literals[0].args[0], ctx.const_("a"));
        assert_eq!(conclusions[0].derivation.premises, vec![0, 1]);
    }
}
