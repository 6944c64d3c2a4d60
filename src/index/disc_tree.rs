//! Discrimination-tree trie shared by the literal and term indexes.
//!
//! Indexed terms are flattened into preorder key sequences with variables
//! collapsed to a wildcard; the trie stores entries at the leaf of each
//! sequence. Retrieval walks the query's flattened form and follows
//! wildcard branches as appropriate for generalization or instance mode.
//! Candidates are imperfect (variable consistency is ignored), so callers
//! verify with a real match afterwards.

use crate::fol::{ConstantId, FunctionId, Term, VariableId};
use std::collections::HashMap;

/// One node of the flattened preorder traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlatKey {
    /// Function symbol; the arity drives subterm skipping.
    Func(FunctionId, u8),
    Const(ConstantId),
    /// Variable in an indexed term: matches anything during retrieval.
    Star,
    /// Variable in a query term: only a trie Star matches it.
    Var(VariableId),
}

/// Flatten a term for insertion (variables become wildcards).
pub fn flatten(term: &Term, keys: &mut Vec<FlatKey>) {
    match term {
        Term::Variable(_) => keys.push(FlatKey::Star),
        Term::Constant(c) => keys.push(FlatKey::Const(c.id)),
        Term::Function(f, args) => {
            keys.push(FlatKey::Func(f.id, f.arity));
            for arg in args {
                flatten(arg, keys);
            }
        }
    }
}

/// Flatten a query whose variables must stay concrete (generalization
/// retrieval: a query variable is matched only by an indexed variable).
pub fn flatten_query(term: &Term, keys: &mut Vec<FlatKey>) {
    match term {
        Term::Variable(v) => keys.push(FlatKey::Var(v.id)),
        Term::Constant(c) => keys.push(FlatKey::Const(c.id)),
        Term::Function(f, args) => {
            keys.push(FlatKey::Func(f.id, f.arity));
            for arg in args {
                flatten_query(arg, keys);
            }
        }
    }
}

/// Number of keys the subterm starting at `pos` occupies.
fn subterm_size(keys: &[FlatKey], pos: usize) -> usize {
    match keys[pos] {
        FlatKey::Star | FlatKey::Const(_) | FlatKey::Var(_) => 1,
        FlatKey::Func(_, arity) => {
            let mut size = 1;
            for _ in 0..arity {
                size += subterm_size(keys, pos + size);
            }
            size
        }
    }
}

#[derive(Debug)]
struct Node<E> {
    children: HashMap<FlatKey, Node<E>>,
    entries: Vec<E>,
}

impl<E> Default for Node<E> {
    fn default() -> Self {
        Node { children: HashMap::new(), entries: Vec::new() }
    }
}

/// Discrimination-tree trie over flattened key sequences.
#[derive(Debug)]
pub struct DiscTree<E> {
    root: Node<E>,
    len: usize,
}

impl<E> Default for DiscTree<E> {
    fn default() -> Self {
        DiscTree { root: Node::default(), len: 0 }
    }
}

impl<E: PartialEq> DiscTree<E> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, keys: &[FlatKey], entry: E) {
        let mut node = &mut self.root;
        for &key in keys {
            node = node.children.entry(key).or_default();
        }
        node.entries.push(entry);
        self.len += 1;
    }

    /// Remove one occurrence of `entry` along the given key path. Returns
    /// whether an entry was removed; empty branches are left in place (they
    /// are harmless and removal stays cheap).
    pub fn remove(&mut self, keys: &[FlatKey], entry: &E) -> bool {
        let mut node = &mut self.root;
        for key in keys {
            node = match node.children.get_mut(key) {
                Some(child) => child,
                None => return false,
            };
        }
        match node.entries.iter().position(|e| e == entry) {
            Some(pos) => {
                node.entries.swap_remove(pos);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Entries more general than the query (query from `flatten_query`).
    pub fn generalizations<'a>(&'a self, query: &[FlatKey], results: &mut Vec<&'a E>) {
        Self::walk_generalizations(&self.root, query, 0, results);
    }

    fn walk_generalizations<'t>(
        node: &'t Node<E>,
        query: &[FlatKey],
        pos: usize,
        results: &mut Vec<&'t E>,
    ) {
        if pos == query.len() {
            results.extend(node.entries.iter());
            return;
        }
        let key = query[pos];
        if let Some(child) = node.children.get(&key) {
            Self::walk_generalizations(child, query, pos + 1, results);
        }
        // An indexed variable generalizes any whole query subterm.
        if key != FlatKey::Star {
            if let Some(star_child) = node.children.get(&FlatKey::Star) {
                let skip = subterm_size(query, pos);
                Self::walk_generalizations(star_child, query, pos + skip, results);
            }
        }
    }

    /// Entries unifiable with / instances of the query (query from
    /// `flatten`, variables as wildcards). Both wildcard directions are
    /// followed, so with query variables flattened to `Star` this is the
    /// candidate set for unification; the caller's verification pass picks
    /// the semantics.
    pub fn instances<'a>(&'a self, query: &[FlatKey], results: &mut Vec<&'a E>) {
        Self::walk_instances(&self.root, query, 0, results);
    }

    fn walk_instances<'t>(
        node: &'t Node<E>,
        query: &[FlatKey],
        pos: usize,
        results: &mut Vec<&'t E>,
    ) {
        if pos == query.len() {
            results.extend(node.entries.iter());
            return;
        }
        match query[pos] {
            FlatKey::Star => {
                // The query variable swallows one complete indexed subterm.
                for (key, child) in &node.children {
                    match key {
                        FlatKey::Const(_) | FlatKey::Star => {
                            Self::walk_instances(child, query, pos + 1, results);
                        }
                        FlatKey::Func(_, arity) => {
                            Self::skip_indexed_args(child, *arity as usize, query, pos + 1, results);
                        }
                        FlatKey::Var(_) => {}
                    }
                }
            }
            key @ (FlatKey::Const(_) | FlatKey::Func(_, _)) => {
                if let Some(child) = node.children.get(&key) {
                    Self::walk_instances(child, query, pos + 1, results);
                }
                if let Some(star_child) = node.children.get(&FlatKey::Star) {
                    let skip = subterm_size(query, pos);
                    Self::walk_instances(star_child, query, pos + skip, results);
                }
            }
            FlatKey::Var(_) => {}
        }
    }

    /// A query wildcard matched `Func(_, n)`: consume the remaining keys of
    /// that indexed subterm along every branch, then resume the query.
    fn skip_indexed_args<'t>(
        node: &'t Node<E>,
        remaining: usize,
        query: &[FlatKey],
        qpos: usize,
        results: &mut Vec<&'t E>,
    ) {
        if remaining == 0 {
            Self::walk_instances(node, query, qpos, results);
            return;
        }
        for (key, child) in &node.children {
            match key {
                FlatKey::Const(_) | FlatKey::Star => {
                    Self::skip_indexed_args(child, remaining - 1, query, qpos, results);
                }
                FlatKey::Func(_, arity) => {
                    Self::skip_indexed_args(
                        child,
                        remaining - 1 + *arity as usize,
                        query,
                        qpos,
                        results,
                    );
                }
                FlatKey::Var(_) => {}
            }
        }
    }
}
