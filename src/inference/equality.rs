//! Equality resolution and equality factoring.

use super::common::{apply_except, dedup_literals, not_smaller};
use super::{id_of, GeneratingEngine};
use crate::fol::{
    unify_args, Clause, Derivation, InferenceRule, Interner, Kbo, Literal, Substitution,
};
use crate::index::IndexManager;
use crate::resource::{BudgetExceeded, ResourceGuard};
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::rc::Rc;

/// Equality resolution: from `s != t | C` with σ = mgu(s, t), derive σC.
pub struct EqualityResolution {
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
}

impl EqualityResolution {
    pub fn new(interner: Rc<RefCell<Interner>>, selector: Rc<dyn LiteralSelector>) -> Self {
        EqualityResolution { interner, selector }
    }
}

impl GeneratingEngine for EqualityResolution {
    fn name(&self) -> &'static str {
        "equality resolution"
    }

    fn attach(&mut self, _manager: &mut IndexManager) {}

    fn detach(&mut self, _manager: &mut IndexManager) {}

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded> {
        let interner = self.interner.borrow();
        let mut conclusions = Vec::new();
        for i in self.selector.select(given) {
            let lit = &given.literals[i];
            if lit.polarity || !lit.is_equality(&interner) {
                continue;
            }
            let mut subst = Substitution::new();
            if unify_args(&lit.args[..1], &lit.args[1..], &mut subst).is_err() {
                continue;
            }
            let literals = dedup_literals(apply_except(&given.literals, &[i], &subst));
            conclusions.push(Clause::new(
                literals,
                Derivation::new(InferenceRule::EqualityResolution, vec![id_of(given)]),
            ));
        }
        Ok(conclusions)
    }
}

/// Equality factoring: from `s = t | u = v | C` with σ = mgu(s, u), derive
/// σ(t != v | u = v | C) under the ordering constraints.
pub struct EqualityFactoring {
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    ordering: Rc<Kbo>,
}

impl EqualityFactoring {
    pub fn new(
        interner: Rc<RefCell<Interner>>,
        selector: Rc<dyn LiteralSelector>,
        ordering: Rc<Kbo>,
    ) -> Self {
        EqualityFactoring { interner, selector, ordering }
    }
}

impl GeneratingEngine for EqualityFactoring {
    fn name(&self) -> &'static str {
        "equality factoring"
    }

    fn attach(&mut self, _manager: &mut IndexManager) {}

    fn detach(&mut self, _manager: &mut IndexManager) {}

    fn generate(
        &mut self,
        given: &Rc<Clause>,
        _guard: &ResourceGuard,
    ) -> Result<Vec<Clause>, BudgetExceeded> {
        let interner = self.interner.borrow();
        let selected = self.selector.select(given);
        let mut conclusions = Vec::new();

        for &i in &selected {
            let first = &given.literals[i];
            if !first.is_positive_equality(&interner) {
                continue;
            }
            for (j, second) in given.literals.iter().enumerate() {
                if i == j || !second.is_positive_equality(&interner) {
                    continue;
                }
                // Try unifying each side of the first equality with each
                // side of the second.
                for (si, sj) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                    let mut subst = Substitution::new();
                    if unify_args(
                        std::slice::from_ref(&first.args[si]),
                        std::slice::from_ref(&second.args[sj]),
                        &mut subst,
                    )
                    .is_err()
                    {
                        continue;
                    }
                    let s_inst = subst.apply(&first.args[si]);
                    let t_inst = subst.apply(&first.args[1 - si]);
                    if !not_smaller(&self.ordering, &s_inst, &t_inst) {
                        continue;
                    }
                    let v_inst = subst.apply(&second.args[1 - sj]);
                    let eq = first.predicate;
                    let mut literals = vec![Literal::negative(eq, vec![t_inst, v_inst])];
                    literals.extend(apply_except(&given.literals, &[i], &subst));
                    conclusions.push(Clause::new(
                        dedup_literals(literals),
                        Derivation::new(InferenceRule::EqualityFactoring, vec![id_of(given)]),
                    ));
                }
            }
        }
        Ok(conclusions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, PredicateSymbol, Term, Variable};
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

        fn func(&self, name: &str, args: Vec<Term>) -> Term {
            let id = self.interner.borrow_mut().intern_function(name);
            Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
        }

        fn eq(&self) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.borrow().equality(), 2)
        }

        fn given(&self, id: usize, literals: Vec<Literal>) -> Rc<Clause> {
            let mut clause = Clause::input(literals);
            clause.id = Some(id);
            Rc::new(clause)
        }
    }

    #[test]
    fn equality_resolution_resolves_unifiable_disequality() {
        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let p = PredicateSymbol::new(ctx.interner.borrow_mut().intern_predicate("P"), 1);

        // X != a | P(X) derives P(a).
        let given = ctx.given(
            0,
            vec![
                Literal::negative(ctx.eq(), vec![x.clone(), a.clone()]),
                Literal::positive(p, vec![x]),
            ],
        );
        let guard = ResourceGuard::unlimited();
        let mut engine = EqualityResolution::new(ctx.interner.clone(), Rc::new(SelectAll));
        let conclusions = engine.generate(&given, &guard).unwrap();
        assert_eq!(conclusions.len(), 1);
        assert_eq!(conclusions[0].literals.len(), 1);
        assert_eq!(conclusions[0].literals[0].args[0], ctx.const_("a"));
    }

    #[test]
    fn equality_resolution_needs_a_negative_equality() {
        let ctx = TestContext::new();
        let a = ctx.const_("a");
        let given = ctx.given(0, vec![Literal::positive(ctx.eq(), vec![a.clone(), a])]);
        let guard = ResourceGuard::unlimited();
        let mut engine = EqualityResolution::new(ctx.interner.clone(), Rc::new(SelectAll));
        assert!(engine.generate(&given, &guard).unwrap().is_empty());
    }

    #[test]
    fn equality_factoring_produces_disequality() {
        let ctx = TestContext::new();
        let x = ctx.var("X");
        let a = ctx.const_("a");
        let b = ctx.const_("b");
        let fx = ctx.func("f", vec![x.clone()]);
        let fa = ctx.func("f", vec![a.clone()]);

        // f(X) = b | f(a) = b factors into b != b | f(a) = b under X -> a.
        let given = ctx.given(
            0,
            vec![
                Literal::positive(ctx.eq(), vec![fx, b.clone()]),
                Literal::positive(ctx.eq(), vec![fa, b]),
            ],
        );
        let guard = ResourceGuard::unlimited();
        let mut engine = EqualityFactoring::new(
            ctx.interner.clone(),
            Rc::new(SelectAll),
            Rc::new(Kbo::default()),
        );
        let conclusions = engine.generate(&given, &guard).unwrap();
        assert!(!conclusions.is_empty());
        assert!(conclusions
            .iter()
            .any(|c| c.literals.iter().any(|l| !l.polarity)));
    }
}
