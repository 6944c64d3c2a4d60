//! Literal selection.
//!
//! The saturation core treats selection as an oracle: given a clause, it
//! answers which literal positions are eligible for generating inferences.

use crate::config::LiteralSelectionMode;
use crate::fol::{Clause, Kbo, Literal, TermOrdering};
use std::collections::HashMap;

/// Literal selection oracle.
pub trait LiteralSelector {
    /// Positions of the selected literals of a clause.
    fn select(&self, clause: &Clause) -> Vec<usize>;

    fn name(&self) -> &str;
}

/// Build the selector for a configured mode.
pub fn selector_for(mode: LiteralSelectionMode) -> Box<dyn LiteralSelector> {
    match mode {
        LiteralSelectionMode::All => Box::new(SelectAll),
        LiteralSelectionMode::Maximal => Box::new(SelectMaximal::default()),
        LiteralSelectionMode::NegativeOrMaximal => Box::new(SelectNegativeOrMaximal::default()),
    }
}

/// Every literal is eligible.
pub struct SelectAll;

impl LiteralSelector for SelectAll {
    fn select(&self, clause: &Clause) -> Vec<usize> {
        (0..clause.literals.len()).collect()
    }

    fn name(&self) -> &str {
        "all"
    }
}

/// All maximal literals under the KBO-derived literal ordering.
#[derive(Default)]
pub struct SelectMaximal {
    kbo: Kbo,
}

impl LiteralSelector for SelectMaximal {
    fn select(&self, clause: &Clause) -> Vec<usize> {
        maximal_literals(clause, &self.kbo)
    }

    fn name(&self) -> &str {
        "maximal"
    }
}

/// The heaviest negative literal if any, otherwise all maximal literals.
#[derive(Default)]
pub struct SelectNegativeOrMaximal {
    kbo: Kbo,
}

impl LiteralSelector for SelectNegativeOrMaximal {
    fn select(&self, clause: &Clause) -> Vec<usize> {
        let negative = clause
            .literals
            .iter()
            .enumerate()
            .filter(|(_, lit)| !lit.polarity)
            .max_by_key(|(_, lit)| lit.symbol_count());
        match negative {
            Some((i, _)) => vec![i],
            None => maximal_literals(clause, &self.kbo),
        }
    }

    fn name(&self) -> &str {
        "negative-or-maximal"
    }
}

/// Positions of the literals no other literal exceeds.
fn maximal_literals(clause: &Clause, kbo: &Kbo) -> Vec<usize> {
    (0..clause.literals.len())
        .filter(|&i| {
            clause
                .literals
                .iter()
                .enumerate()
                .all(|(j, other)| {
                    i == j || !literal_greater(other, &clause.literals[i], kbo)
                })
        })
        .collect()
}

/// Strict literal ordering: atom weight, then variable condition, then
/// predicate precedence, then lexicographic argument comparison.
fn literal_greater(a: &Literal, b: &Literal, kbo: &Kbo) -> bool {
    let mut a_vars = HashMap::new();
    let mut b_vars = HashMap::new();
    a.for_each_variable(&mut |v| *a_vars.entry(v).or_insert(0usize) += 1);
    b.for_each_variable(&mut |v| *b_vars.entry(v).or_insert(0usize) += 1);
    let covers = b_vars
        .iter()
        .all(|(v, n)| a_vars.get(v).copied().unwrap_or(0) >= *n);
    if !covers {
        return false;
    }

    let wa = a.symbol_count();
    let wb = b.symbol_count();
    if wa != wb {
        return wa > wb;
    }
    if a.predicate.id != b.predicate.id {
        return a.predicate.id > b.predicate.id;
    }
    for (ta, tb) in a.args.iter().zip(&b.args) {
        match kbo.compare(ta, tb) {
            TermOrdering::Greater => return true,
            TermOrdering::Less => return false,
            TermOrdering::Equal | TermOrdering::Incomparable => continue,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, FunctionSymbol, Interner, PredicateSymbol, Term, Variable};

    struct TestContext {
        interner: Interner,
    }

    impl TestContext {
        fn new() -> Self {
            TestContext { interner: Interner::new() }
        }

        fn var(&mut self, name: &str) -> Term {
            Term::Variable(Variable::new(self.interner.intern_variable(name)))
        }

        fn const_(&mut self, name: &str) -> Term {
            Term::Constant(Constant::new(self.interner.intern_constant(name)))
        }

        fn func(&mut self, name: &str, args: Vec<Term>) -> Term {
            let id = self.interner.intern_function(name);
            Term::Function(FunctionSymbol::new(id, args.len() as u8), args)
        }

        fn pred(&mut self, name: &str, arity: u8) -> PredicateSymbol {
            PredicateSymbol::new(self.interner.intern_predicate(name), arity)
        }
    }

    #[test]
    fn select_all_selects_everything() {
        let mut ctx = TestContext::new();
        let a = ctx.const_("a");
        let p = ctx.pred("P", 1);
        let q = ctx.pred("Q", 1);
        let clause = Clause::input(vec![
            Literal::positive(p, vec![a.clone()]),
            Literal::negative(q, vec![a]),
        ]);
        assert_eq!(SelectAll.select(&clause), vec![0, 1]);
    }

    #[test]
    fn negative_literal_is_preferred() {
        let mut ctx = TestContext::new();
        let a = ctx.const_("a");
        let x = ctx.var("X");
        let fa = ctx.func("f", vec![a.clone()]);
        let p = ctx.pred("P", 1);
        let q = ctx.pred("Q", 1);
        let clause = Clause::input(vec![
            Literal::positive(p, vec![fa.clone()]),
            Literal::negative(q, vec![x]),
            Literal::negative(q, vec![fa]),
        ]);
        // The heavier negative literal wins.
        let selected = SelectNegativeOrMaximal::default().select(&clause);
        assert_eq!(selected, vec![2]);
    }

    #[test]
    fn maximal_selection_drops_dominated_literals() {
        let mut ctx = TestContext::new();
        let a = ctx.const_("a");
        let ffa = {
            let fa = ctx.func("f", vec![a.clone()]);
            ctx.func("f", vec![fa])
        };
        let p = ctx.pred("P", 1);
        let clause = Clause::input(vec![
            Literal::positive(p, vec![a]),
            Literal::positive(p, vec![ffa]),
        ]);
        let selected = SelectMaximal::default().select(&clause);
        assert_eq!(selected, vec![1]);
    }

    #[test]
    fn all_positive_falls_back_to_maximal() {
        let mut ctx = TestContext::new();
        let a = ctx.const_("a");
        let p = ctx.pred("P", 1);
        let clause = Clause::input(vec![Literal::positive(p, vec![a])]);
        let selected = SelectNegativeOrMaximal::default().select(&clause);
        assert_eq!(selected, vec![0]);
    }
}
