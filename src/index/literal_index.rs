//! Literal index: discrimination-tree buckets per (predicate, polarity),
//! with an insertion policy deciding which literals of a clause get
//! indexed. One physical structure backs all the literal-index kinds; the
//! policy is the inference-specific wrapper.

use super::disc_tree::{flatten, flatten_query, DiscTree, FlatKey};
use crate::fol::{
    literal_matches, Clause, Interner, Kbo, Literal, MatchBindings, PredicateId, TermOrdering,
};
use crate::saturation::ContainerListener;
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Which literals of a clause a literal index stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralIndexPolicy {
    /// Selected literals (generating inferences).
    Generating,
    /// Every literal (forward/backward simplification).
    Simplifying,
    /// The literal of unit clauses.
    UnitClause,
    /// Every literal of non-unit clauses.
    NonUnitClause,
    /// Only the heaviest literal, to keep forward-subsumption candidate
    /// lists short.
    FwSubsumption,
    /// The literal of unit positive equalities with orderable sides.
    RewriteRule,
}

/// A retrieved literal occurrence.
#[derive(Debug, Clone)]
pub struct LiteralEntry {
    pub clause: Rc<Clause>,
    pub position: usize,
}

type TreeEntry = (usize, u32);

/// Literal index over clauses of one container.
pub struct LiteralIndex {
    policy: LiteralIndexPolicy,
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    ordering: Rc<Kbo>,
    buckets: HashMap<(PredicateId, bool), DiscTree<TreeEntry>>,
    clauses: HashMap<usize, Rc<Clause>>,
}

impl LiteralIndex {
    pub fn new(
        policy: LiteralIndexPolicy,
        interner: Rc<RefCell<Interner>>,
        selector: Rc<dyn LiteralSelector>,
        ordering: Rc<Kbo>,
    ) -> Self {
        LiteralIndex {
            policy,
            interner,
            selector,
            ordering,
            buckets: HashMap::new(),
            clauses: HashMap::new(),
        }
    }

    pub fn policy(&self) -> LiteralIndexPolicy {
        self.policy
    }

    /// Number of indexed clauses.
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn contains_clause(&self, id: usize) -> bool {
        self.clauses.contains_key(&id)
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Rc<Clause>> {
        self.clauses.values()
    }

    /// The literal positions this index stores for a clause.
    fn chosen_positions(&self, clause: &Clause) -> Vec<usize> {
        match self.policy {
            LiteralIndexPolicy::Generating => self.selector.select(clause),
            LiteralIndexPolicy::Simplifying => (0..clause.literals.len()).collect(),
            LiteralIndexPolicy::UnitClause => {
                if clause.is_unit() {
                    vec![0]
                } else {
                    Vec::new()
                }
            }
            LiteralIndexPolicy::NonUnitClause => {
                if clause.is_unit() {
                    Vec::new()
                } else {
                    (0..clause.literals.len()).collect()
                }
            }
            LiteralIndexPolicy::FwSubsumption => (0..clause.literals.len())
                .max_by_key(|&i| clause.literals[i].symbol_count())
                .into_iter()
                .collect(),
            LiteralIndexPolicy::RewriteRule => {
                let interner = self.interner.borrow();
                if clause.is_unit() && clause.literals[0].is_positive_equality(&interner) {
                    let lit = &clause.literals[0];
                    match self.ordering.compare(&lit.args[0], &lit.args[1]) {
                        TermOrdering::Greater | TermOrdering::Less => vec![0],
                        _ => Vec::new(),
                    }
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn arg_keys(lit: &Literal, swapped: bool) -> Vec<FlatKey> {
        let mut keys = Vec::new();
        if swapped {
            flatten(&lit.args[1], &mut keys);
            flatten(&lit.args[0], &mut keys);
        } else {
            for arg in &lit.args {
                flatten(arg, &mut keys);
            }
        }
        keys
    }

    fn insert_clause(&mut self, clause: &Rc<Clause>) {
        let id = match clause.id {
            Some(id) => id,
            None => return,
        };
        let positions = self.chosen_positions(clause);
        if positions.is_empty() {
            return;
        }
        self.clauses.insert(id, clause.clone());
        for pos in positions {
            let lit = &clause.literals[pos];
            let commutative = lit.is_commutative(&self.interner.borrow());
            let bucket = self.buckets.entry((lit.predicate.id, lit.polarity)).or_default();
            bucket.insert(&Self::arg_keys(lit, false), (id, pos as u32));
            if commutative {
                bucket.insert(&Self::arg_keys(lit, true), (id, pos as u32));
            }
        }
    }

    fn remove_clause(&mut self, clause: &Rc<Clause>) {
        let id = match clause.id {
            Some(id) => id,
            None => return,
        };
        if self.clauses.remove(&id).is_none() {
            return;
        }
        for pos in self.chosen_positions(clause) {
            let lit = &clause.literals[pos];
            let commutative = lit.is_commutative(&self.interner.borrow());
            if let Some(bucket) = self.buckets.get_mut(&(lit.predicate.id, lit.polarity)) {
                bucket.remove(&Self::arg_keys(lit, false), &(id, pos as u32));
                if commutative {
                    bucket.remove(&Self::arg_keys(lit, true), &(id, pos as u32));
                }
            }
        }
    }

    /// Indexed literals that one-way match onto the query (the indexed
    /// literal is the pattern). Verified; duplicates from the two
    /// commutative orientations are collapsed.
    pub fn generalizations(&self, query: &Literal) -> Vec<LiteralEntry> {
        let interner = self.interner.borrow();
        let commutative = query.is_commutative(&interner);
        let candidates = self.candidates(query, query.polarity, true);
        let mut results = Vec::new();
        let mut seen = Vec::new();
        for (id, pos) in candidates {
            if seen.contains(&(id, pos)) {
                continue;
            }
            let clause = &self.clauses[&id];
            let entry_lit = &clause.literals[pos as usize];
            let mut bindings = MatchBindings::new(var_capacity(entry_lit));
            if literal_matches(entry_lit, query, commutative, &mut bindings) {
                seen.push((id, pos));
                results.push(LiteralEntry { clause: clause.clone(), position: pos as usize });
            }
        }
        results
    }

    /// Indexed literals the query one-way matches onto (the query is the
    /// pattern). Verified; orientation duplicates collapsed.
    pub fn instances(&self, query: &Literal) -> Vec<LiteralEntry> {
        let interner = self.interner.borrow();
        let commutative = query.is_commutative(&interner);
        let candidates = self.candidates(query, query.polarity, false);
        let mut results = Vec::new();
        let mut seen = Vec::new();
        for (id, pos) in candidates {
            if seen.contains(&(id, pos)) {
                continue;
            }
            let clause = &self.clauses[&id];
            let entry_lit = &clause.literals[pos as usize];
            let mut bindings = MatchBindings::new(var_capacity(query));
            if literal_matches(query, entry_lit, commutative, &mut bindings) {
                seen.push((id, pos));
                results.push(LiteralEntry { clause: clause.clone(), position: pos as usize });
            }
        }
        results
    }

    /// Candidate partners with the complementary polarity; the caller
    /// unifies, so no verification happens here.
    pub fn unifiable_complements(&self, query: &Literal) -> Vec<LiteralEntry> {
        let candidates = self.candidates(query, !query.polarity, false);
        let mut results = Vec::new();
        let mut seen = Vec::new();
        for (id, pos) in candidates {
            if seen.contains(&(id, pos)) {
                continue;
            }
            seen.push((id, pos));
            results.push(LiteralEntry {
                clause: self.clauses[&id].clone(),
                position: pos as usize,
            });
        }
        results
    }

    fn candidates(&self, query: &Literal, polarity: bool, concrete_vars: bool) -> Vec<TreeEntry> {
        let bucket = match self.buckets.get(&(query.predicate.id, polarity)) {
            Some(bucket) => bucket,
            None => return Vec::new(),
        };
        let mut keys = Vec::new();
        for arg in &query.args {
            if concrete_vars {
                flatten_query(arg, &mut keys);
            } else {
                flatten(arg, &mut keys);
            }
        }
        let mut found = Vec::new();
        if concrete_vars {
            bucket.generalizations(&keys, &mut found);
        } else {
            bucket.instances(&keys, &mut found);
        }
        found.into_iter().copied().collect()
    }
}

fn var_capacity(lit: &Literal) -> usize {
    let mut capacity = 0usize;
    lit.for_each_variable(&mut |v| {
        capacity = capacity.max(v.as_u32() as usize + 1);
    });
    capacity
}

impl ContainerListener for LiteralIndex {
    fn clause_added(&mut self, clause: &Rc<Clause>) {
        self.insert_clause(clause);
    }

    fn clause_removed(&mut self, clause: &Rc<Clause>) {
        self.remove_clause(clause);
    }
}
