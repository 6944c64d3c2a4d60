//! Clause-level forward subsumption index.
//!
//! Stands in for the code-tree forward subsumption index: clauses are
//! stored under a sorted predicate-polarity signature, and candidate
//! retrieval returns only clauses whose signature is componentwise
//! covered by the query clause's signature (a clause can only subsume a
//! clause that has at least its literals' predicate shape). The actual
//! multi-literal match is the caller's job. Backward subsumption runs in
//! the other direction through the to-be-simplified literal index, which
//! lives on the right container under every strategy.

use crate::fol::{Clause, PredicateId};
use crate::saturation::ContainerListener;
use std::collections::HashMap;
use std::rc::Rc;

/// Sorted (predicate, polarity, count) signature.
type Signature = Vec<(PredicateId, bool, u16)>;

fn signature_of(clause: &Clause) -> Signature {
    let mut counts: HashMap<(PredicateId, bool), u16> = HashMap::new();
    for lit in &clause.literals {
        *counts.entry((lit.predicate.id, lit.polarity)).or_insert(0) += 1;
    }
    let mut signature: Signature =
        counts.into_iter().map(|((p, pol), n)| (p, pol, n)).collect();
    signature.sort_unstable();
    signature
}

/// True if every (predicate, polarity) of `small` occurs in `large` at
/// least as often. Both signatures must be sorted.
fn signature_covered(small: &Signature, large: &Signature) -> bool {
    let mut li = 0;
    for &(pred, pol, count) in small {
        while li < large.len() && (large[li].0, large[li].1) < (pred, pol) {
            li += 1;
        }
        if li >= large.len() || large[li].0 != pred || large[li].1 != pol || count > large[li].2 {
            return false;
        }
    }
    true
}

/// Forward subsumption candidate index.
pub struct SubsumptionIndex {
    entries: Vec<(usize, Signature, Rc<Clause>)>,
    equality: PredicateId,
}

impl SubsumptionIndex {
    pub fn new(equality: PredicateId) -> Self {
        SubsumptionIndex { entries: Vec::new(), equality }
    }

    pub fn clause_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains_clause(&self, id: usize) -> bool {
        self.entries.iter().any(|(e, _, _)| *e == id)
    }

    /// Indexed clauses that could subsume `clause`: at most as many
    /// literals, and a covered signature.
    pub fn subsuming_candidates(&self, clause: &Clause) -> Vec<Rc<Clause>> {
        let query = signature_of(clause);
        self.entries
            .iter()
            .filter(|(_, sig, c)| {
                c.literals.len() <= clause.literals.len() && signature_covered(sig, &query)
            })
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    /// Candidates for forward subsumption demodulation: indexed clauses
    /// containing a positive equality whose signature, with one positive
    /// equality set aside, is covered by the query.
    pub fn fsd_candidates(&self, clause: &Clause) -> Vec<Rc<Clause>> {
        let query = signature_of(clause);
        self.entries
            .iter()
            .filter(|(_, sig, c)| {
                if c.literals.len() > clause.literals.len() + 1 {
                    return false;
                }
                let mut reduced: Signature = sig.clone();
                match reduced.iter().position(|&(p, pol, _)| p == self.equality && pol) {
                    Some(i) => {
                        if reduced[i].2 > 1 {
                            reduced[i].2 -= 1;
                        } else {
                            reduced.remove(i);
                        }
                    }
                    None => return false,
                }
                signature_covered(&reduced, &query)
            })
            .map(|(_, _, c)| c.clone())
            .collect()
    }
}

impl ContainerListener for SubsumptionIndex {
    fn clause_added(&mut self, clause: &Rc<Clause>) {
        if let Some(id) = clause.id {
            self.entries.push((id, signature_of(clause), clause.clone()));
        }
    }

    fn clause_removed(&mut self, clause: &Rc<Clause>) {
        if let Some(id) = clause.id {
            if let Some(pos) = self.entries.iter().position(|(e, _, _)| *e == id) {
                self.entries.swap_remove(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, Interner, Literal, PredicateSymbol, Term, Variable};

    struct TestContext {
        interner: Interner,
    }

    impl TestContext {
        fn new() -> Self {
            TestContext { interner: Interner::new() }
        }

        fn clause(&mut self, id: usize, spec: &[(&str, bool)]) -> Rc<Clause> {
            let literals = spec
                .iter()
                .map(|(name, polarity)| {
                    let x = Term::Variable(Variable::new(self.interner.intern_variable("X")));
                    let pred = PredicateSymbol::new(self.interner.intern_predicate(name), 1);
                    if *polarity {
                        Literal::positive(pred, vec![x])
                    } else {
                        Literal::negative(pred, vec![x])
                    }
                })
                .collect();
            let mut clause = Clause::input(literals);
            clause.id = Some(id);
            Rc::new(clause)
        }

        fn ground_clause(&mut self, id: usize, spec: &[(&str, bool)]) -> Rc<Clause> {
            let literals = spec
                .iter()
                .map(|(name, polarity)| {
                    let a = Term::Constant(Constant::new(self.interner.intern_constant("a")));
                    let pred = PredicateSymbol::new(self.interner.intern_predicate(name), 1);
                    if *polarity {
                        Literal::positive(pred, vec![a])
                    } else {
                        Literal::negative(pred, vec![a])
                    }
                })
                .collect();
            let mut clause = Clause::input(literals);
            clause.id = Some(id);
            Rc::new(clause)
        }
    }

    #[test]
    fn signature_prefilter() {
        let mut ctx = TestContext::new();
        let short = ctx.clause(0, &[("P", true)]);
        let long = ctx.clause(1, &[("P", true), ("Q", false)]);
        let other = ctx.clause(2, &[("R", true)]);

        let mut index = SubsumptionIndex::new(ctx.interner.equality());
        index.clause_added(&short);
        index.clause_added(&long);
        index.clause_added(&other);

        let query = ctx.ground_clause(9, &[("P", true), ("Q", false)]);
        let candidates = index.subsuming_candidates(&query);
        let ids: Vec<_> = candidates.iter().map(|c| c.id.unwrap()).collect();
        assert!(ids.contains(&0), "P(X) has a covered signature");
        assert!(ids.contains(&1));
        assert!(!ids.contains(&2), "R does not occur in the query");
    }

    #[test]
    fn polarity_is_part_of_the_signature() {
        let mut ctx = TestContext::new();
        let neg = ctx.clause(0, &[("P", false)]);
        let mut index = SubsumptionIndex::new(ctx.interner.equality());
        index.clause_added(&neg);

        let query = ctx.ground_clause(1, &[("P", true)]);
        assert!(index.subsuming_candidates(&query).is_empty());
    }

    #[test]
    fn fsd_candidates_set_one_equality_aside() {
        let mut ctx = TestContext::new();
        let eq = PredicateSymbol::new(ctx.interner.equality(), 2);
        let x = Term::Variable(Variable::new(ctx.interner.intern_variable("X")));
        let p = PredicateSymbol::new(ctx.interner.intern_predicate("P"), 1);

        // D = X = X | P(X): candidate even though the query has no equality.
        let mut with_eq = Clause::input(vec![
            Literal::positive(eq, vec![x.clone(), x.clone()]),
            Literal::positive(p, vec![x.clone()]),
        ]);
        with_eq.id = Some(0);
        let with_eq = Rc::new(with_eq);
        // D' = P(X) alone: no equality to demodulate with.
        let plain = ctx.clause(1, &[("P", true)]);

        let mut index = SubsumptionIndex::new(ctx.interner.equality());
        index.clause_added(&with_eq);
        index.clause_added(&plain);

        let query = ctx.ground_clause(9, &[("P", true)]);
        let ids: Vec<_> =
            index.fsd_candidates(&query).iter().map(|c| c.id.unwrap()).collect();
        assert_eq!(ids, vec![0]);
    }

    #[test]
    fn removal_clears_the_entry() {
        let mut ctx = TestContext::new();
        let wide = ctx.ground_clause(0, &[("P", true), ("Q", true)]);
        let mut index = SubsumptionIndex::new(ctx.interner.equality());
        index.clause_added(&wide);
        assert_eq!(index.clause_count(), 1);
        assert!(index.contains_clause(0));

        index.clause_removed(&wide);
        assert_eq!(index.clause_count(), 0);
        assert!(index.subsuming_candidates(&wide).is_empty());
    }
}
