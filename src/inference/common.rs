//! Helpers shared by the inference engines.

use crate::fol::{rename_literal, Clause, Interner, Kbo, Literal, Substitution, TermOrdering};

/// Rename the variables of a partner clause apart from the given clause.
/// The suffix is derived from the partner's id, so repeated renamings of
/// the same clause reuse the same interned names.
pub fn rename_apart(clause: &Clause, interner: &mut Interner) -> Vec<Literal> {
    let suffix = clause.id.map_or_else(|| "r".to_string(), |id| id.to_string());
    clause
        .literals
        .iter()
        .map(|lit| rename_literal(lit, &suffix, interner))
        .collect()
}

/// Apply a substitution to every literal except the listed positions.
pub fn apply_except(literals: &[Literal], skip: &[usize], subst: &Substitution) -> Vec<Literal> {
    literals
        .iter()
        .enumerate()
        .filter(|(i, _)| !skip.contains(i))
        .map(|(_, lit)| subst.apply_literal(lit))
        .collect()
}

/// Drop duplicate literals, keeping first occurrences.
pub fn dedup_literals(literals: Vec<Literal>) -> Vec<Literal> {
    let mut out: Vec<Literal> = Vec::with_capacity(literals.len());
    for lit in literals {
        if !out.contains(&lit) {
            out.push(lit);
        }
    }
    out
}

/// Ordering constraint used by superposition after instantiating: the
/// rewritten side must not be smaller than its replacement.
pub fn not_smaller(kbo: &Kbo, s: &crate::fol::Term, t: &crate::fol::Term) -> bool {
    matches!(
        kbo.compare(s, t),
        TermOrdering::Greater | TermOrdering::Incomparable
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Constant, PredicateSymbol, Term, Variable};

    #[test]
    fn rename_apart_keeps_clauses_variable_disjoint() {
        let mut interner = Interner::new();
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let mut clause = Clause::input(vec![Literal::positive(p, vec![x.clone()])]);
        clause.id = Some(3);

        let renamed = rename_apart(&clause, &mut interner);
        assert_ne!(renamed[0], clause.literals[0]);
        // Renaming the same clause twice is stable.
        let again = rename_apart(&clause, &mut interner);
        assert_eq!(renamed, again);
    }

    #[test]
    fn dedup_keeps_first_occurrences() {
        let mut interner = Interner::new();
        let a = Term::Constant(Constant::new(interner.intern_constant("a")));
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let lit = Literal::positive(p, vec![a]);
        let deduped = dedup_literals(vec![lit.clone(), lit.complement(), lit.clone()]);
        assert_eq!(deduped.len(), 2);
    }
}
