//! Grounding index for global subsumption.
//!
//! Each clause is abstracted to a ground propositional clause: every
//! variable collapses to one designated constant, and each resulting
//! ground literal is assigned a propositional variable. The abstraction
//! feeds a SAT-based global subsumption check; the index itself only
//! maintains the literal numbering and the grounded clause set.

use crate::fol::{Clause, Literal, Term};
use crate::saturation::ContainerListener;
use std::collections::HashMap;
use std::rc::Rc;

/// Grounded clause: signed propositional variables, sorted, deduplicated.
pub type GroundClause = Vec<i32>;

/// Ground abstraction registry attached to the simplifying container.
pub struct GroundingIndex {
    /// Ground-literal key to propositional variable (1-based).
    atoms: HashMap<String, i32>,
    grounded: HashMap<usize, GroundClause>,
}

impl GroundingIndex {
    pub fn new() -> Self {
        GroundingIndex { atoms: HashMap::new(), grounded: HashMap::new() }
    }

    pub fn clause_count(&self) -> usize {
        self.grounded.len()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn grounded(&self, clause_id: usize) -> Option<&GroundClause> {
        self.grounded.get(&clause_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &GroundClause)> {
        self.grounded.iter()
    }

    /// Abstract a clause: variables collapse to one constant, literals map
    /// to signed propositional variables.
    pub fn ground_clause(&mut self, clause: &Clause) -> GroundClause {
        let mut result: GroundClause = clause
            .literals
            .iter()
            .map(|lit| {
                let key = ground_key(lit);
                let next = self.atoms.len() as i32 + 1;
                let var = *self.atoms.entry(key).or_insert(next);
                if lit.polarity {
                    var
                } else {
                    -var
                }
            })
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }
}

impl Default for GroundingIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable textual key of a literal with all variables collapsed.
fn ground_key(lit: &Literal) -> String {
    use std::fmt::Write;
    let mut key = String::new();
    let _ = write!(key, "{}", lit.predicate.id.as_u32());
    for arg in &lit.args {
        key.push(',');
        ground_term_key(arg, &mut key);
    }
    key
}

fn ground_term_key(term: &Term, key: &mut String) {
    use std::fmt::Write;
    match term {
        // Every variable becomes the same marker.
        Term::Variable(_) => key.push('*'),
        Term::Constant(c) => {
            let _ = write!(key, "c{}", c.id.as_u32());
        }
        Term::Function(f, args) => {
            let _ = write!(key, "f{}(", f.id.as_u32());
            for arg in args {
                ground_term_key(arg, key);
                key.push(' ');
            }
            key.push(')');
        }
    }
}

impl ContainerListener for GroundingIndex {
    fn clause_added(&mut self, clause: &Rc<Clause>) {
        if let Some(id) = clause.id {
            let ground = self.ground_clause(clause);
            self.grounded.insert(id, ground);
        }
    }

    fn clause_removed(&mut self, clause: &Rc<Clause>) {
        if let Some(id) = clause.id {
            self.grounded.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Interner, PredicateSymbol, Term, Variable};

    #[test]
    fn variables_collapse_to_one_atom() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let y = Term::Variable(Variable::new(interner.intern_variable("Y")));

        let mut index = GroundingIndex::new();
        let c1 = Clause::input(vec![Literal::positive(p, vec![x])]);
        let c2 = Clause::input(vec![Literal::positive(p, vec![y])]);
        assert_eq!(index.ground_clause(&c1), index.ground_clause(&c2));
        assert_eq!(index.atom_count(), 1);
    }

    #[test]
    fn polarity_gives_signed_atoms() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));

        let mut index = GroundingIndex::new();
        let clause = Clause::input(vec![
            Literal::positive(p, vec![x.clone()]),
            Literal::negative(p, vec![x]),
        ]);
        assert_eq!(index.ground_clause(&clause), vec![-1, 1]);
    }

    #[test]
    fn events_maintain_the_grounded_set() {
        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let mut clause = Clause::input(vec![Literal::positive(p, vec![x])]);
        clause.id = Some(5);
        let clause = Rc::new(clause);

        let mut index = GroundingIndex::new();
        index.clause_added(&clause);
        assert_eq!(index.grounded(5), Some(&vec![1]));
        index.clause_removed(&clause);
        assert!(index.grounded(5).is_none());
    }
}
