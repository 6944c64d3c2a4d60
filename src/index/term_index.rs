//! Term index: one discrimination tree over subterms or equality sides of
//! indexed clauses, with a policy deciding what gets indexed (superposition
//! subterms, superposition LHS, demodulation subterms, demodulation LHS,
//! acyclicity subterms).

use super::disc_tree::{flatten, flatten_query, DiscTree};
use crate::fol::{
    match_term, Clause, Interner, Kbo, Literal, MatchBindings, Term, TermOrdering,
};
use crate::saturation::ContainerListener;
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What a term index stores per clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermIndexPolicy {
    /// Non-variable subterms of selected literals.
    SuperpositionSubterm,
    /// Orientable-or-incomparable sides of selected positive equalities.
    SuperpositionLhs,
    /// Non-variable subterms of every literal.
    DemodulationSubterm,
    /// The larger side(s) of unit positive equalities.
    DemodulationLhs,
    /// Non-variable proper subterms of positive equality sides.
    Acyclicity,
}

/// A retrieved subterm occurrence. `path` starts with the argument index
/// within the literal.
#[derive(Debug, Clone)]
pub struct TermEntry {
    pub clause: Rc<Clause>,
    pub position: usize,
    pub path: Vec<usize>,
}

impl TermEntry {
    /// The indexed subterm within its literal.
    pub fn term(&self) -> &Term {
        literal_subterm(&self.clause.literals[self.position], &self.path)
            .expect("indexed path stays valid while the clause is immutable")
    }
}

/// Resolve a path (argument index followed by subterm positions) inside a
/// literal.
pub fn literal_subterm<'a>(lit: &'a Literal, path: &[usize]) -> Option<&'a Term> {
    let (arg, rest) = path.split_first()?;
    lit.args.get(*arg)?.subterm_at(rest)
}

type TreeEntry = (usize, u32, Vec<usize>);

/// Term index over clauses of one container.
pub struct TermIndex {
    policy: TermIndexPolicy,
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    ordering: Rc<Kbo>,
    tree: DiscTree<TreeEntry>,
    clauses: HashMap<usize, Rc<Clause>>,
}

impl TermIndex {
    pub fn new(
        policy: TermIndexPolicy,
        interner: Rc<RefCell<Interner>>,
        selector: Rc<dyn LiteralSelector>,
        ordering: Rc<Kbo>,
    ) -> Self {
        TermIndex {
            policy,
            interner,
            selector,
            ordering,
            tree: DiscTree::default(),
            clauses: HashMap::new(),
        }
    }

    pub fn policy(&self) -> TermIndexPolicy {
        self.policy
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn contains_clause(&self, id: usize) -> bool {
        self.clauses.contains_key(&id)
    }

    /// The subterm occurrences this index stores for a clause.
    fn chosen_terms<'c>(&self, clause: &'c Clause) -> Vec<(usize, Vec<usize>, &'c Term)> {
        let interner = self.interner.borrow();
        let mut out = Vec::new();
        match self.policy {
            TermIndexPolicy::SuperpositionSubterm => {
                for pos in self.selector.select(clause) {
                    collect_subterms(&clause.literals[pos], pos, false, &mut out);
                }
            }
            TermIndexPolicy::DemodulationSubterm => {
                for pos in 0..clause.literals.len() {
                    collect_subterms(&clause.literals[pos], pos, false, &mut out);
                }
            }
            TermIndexPolicy::SuperpositionLhs => {
                for pos in self.selector.select(clause) {
                    let lit = &clause.literals[pos];
                    if !lit.is_positive_equality(&interner) {
                        continue;
                    }
                    for side in 0..2 {
                        let this = &lit.args[side];
                        let other = &lit.args[1 - side];
                        if matches!(this, Term::Variable(_)) {
                            continue;
                        }
                        match self.ordering.compare(this, other) {
                            TermOrdering::Greater | TermOrdering::Incomparable => {
                                out.push((pos, vec![side], this));
                            }
                            _ => {}
                        }
                    }
                }
            }
            TermIndexPolicy::DemodulationLhs => {
                if !clause.is_unit() || !clause.literals[0].is_positive_equality(&interner) {
                    return out;
                }
                let lit = &clause.literals[0];
                match self.ordering.compare(&lit.args[0], &lit.args[1]) {
                    TermOrdering::Greater => out.push((0, vec![0], &lit.args[0])),
                    TermOrdering::Less => out.push((0, vec![1], &lit.args[1])),
                    TermOrdering::Incomparable => {
                        for side in 0..2 {
                            if !matches!(lit.args[side], Term::Variable(_)) {
                                out.push((0, vec![side], &lit.args[side]));
                            }
                        }
                    }
                    TermOrdering::Equal => {}
                }
            }
            TermIndexPolicy::Acyclicity => {
                for pos in 0..clause.literals.len() {
                    let lit = &clause.literals[pos];
                    if lit.is_positive_equality(&interner) {
                        collect_subterms(lit, pos, true, &mut out);
                    }
                }
            }
        }
        out
    }

    fn insert_clause(&mut self, clause: &Rc<Clause>) {
        let id = match clause.id {
            Some(id) => id,
            None => return,
        };
        let chosen = self.chosen_terms(clause);
        if chosen.is_empty() {
            return;
        }
        self.clauses.insert(id, clause.clone());
        for (pos, path, term) in chosen {
            let mut keys = Vec::new();
            flatten(term, &mut keys);
            self.tree.insert(&keys, (id, pos as u32, path));
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
        for (pos, path, term) in self.chosen_terms(clause) {
            let mut keys = Vec::new();
            flatten(term, &mut keys);
            self.tree.remove(&keys, &(id, pos as u32, path));
        }
    }

    /// Indexed terms that one-way match onto the query (indexed term is
    /// the pattern). Verified.
    pub fn generalizations(&self, query: &Term) -> Vec<TermEntry> {
        let mut keys = Vec::new();
        flatten_query(query, &mut keys);
        let mut found = Vec::new();
        self.tree.generalizations(&keys, &mut found);
        found
            .into_iter()
            .filter(|(id, pos, path)| {
                let entry = self.resolve(*id, *pos, path);
                let mut bindings = MatchBindings::new(term_var_capacity(entry.term()));
                match_term(entry.term(), query, &mut bindings)
            })
            .map(|(id, pos, path)| self.resolve(*id, *pos, path))
            .collect()
    }

    /// Indexed terms the query one-way matches onto. Verified.
    pub fn instances(&self, query: &Term) -> Vec<TermEntry> {
        let mut keys = Vec::new();
        flatten(query, &mut keys);
        let mut found = Vec::new();
        self.tree.instances(&keys, &mut found);
        found
            .into_iter()
            .filter(|(id, pos, path)| {
                let entry = self.resolve(*id, *pos, path);
                let mut bindings = MatchBindings::new(term_var_capacity(query));
                match_term(query, entry.term(), &mut bindings)
            })
            .map(|(id, pos, path)| self.resolve(*id, *pos, path))
            .collect()
    }

    /// Candidates possibly unifiable with the query; the caller unifies.
    pub fn unifiable(&self, query: &Term) -> Vec<TermEntry> {
        let mut keys = Vec::new();
        flatten(query, &mut keys);
        let mut found = Vec::new();
        self.tree.instances(&keys, &mut found);
        found
            .into_iter()
            .map(|(id, pos, path)| self.resolve(*id, *pos, path))
            .collect()
    }

    fn resolve(&self, id: usize, pos: u32, path: &[usize]) -> TermEntry {
        TermEntry {
            clause: self.clauses[&id].clone(),
            position: pos as usize,
            path: path.to_vec(),
        }
    }
}

fn term_var_capacity(term: &Term) -> usize {
    let mut capacity = 0usize;
    term.for_each_variable(&mut |v| {
        capacity = capacity.max(v.as_u32() as usize + 1);
    });
    capacity
}

/// Collect non-variable subterms of a literal's arguments, with their
/// paths. `proper_only` skips each argument itself.
fn collect_subterms<'c>(
    lit: &'c Literal,
    pos: usize,
    proper_only: bool,
    out: &mut Vec<(usize, Vec<usize>, &'c Term)>,
) {
    fn walk<'c>(
        term: &'c Term,
        pos: usize,
        path: &mut Vec<usize>,
        skip_root: bool,
        out: &mut Vec<(usize, Vec<usize>, &'c Term)>,
    ) {
        if !skip_root && !matches!(term, Term::Variable(_)) {
            out.push((pos, path.clone(), term));
        }
        if let Term::Function(_, args) = term {
            for (i, arg) in args.iter().enumerate() {
                path.push(i);
                walk(arg, pos, path, false, out);
                path.pop();
            }
        }
    }
    for (i, arg) in lit.args.iter().enumerate() {
        let mut path = vec![i];
        walk(arg, pos, &mut path, proper_only, out);
    }
}

impl ContainerListener for TermIndex {
    fn clause_added(&mut self, clause: &Rc<Clause>) {
        self.insert_clause(clause);
    }

    fn clause_removed(&mut self, clause: &Rc<Clause>) {
        self.remove_clause(clause);
    }
}
