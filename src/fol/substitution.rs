//! Substitutions, unification, and one-way matching.

use super::interner::{Interner, VariableId};
use super::literal::Literal;
use super::term::{Term, Variable};
use std::collections::HashMap;
use std::fmt;

/// A substitution from variables to terms.
///
/// Kept idempotent: binding a variable substitutes the new binding into the
/// range of all existing bindings, so `apply` never has to iterate to a
/// fixpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    map: HashMap<VariableId, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Substitution { map: HashMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, var: VariableId) -> Option<&Term> {
        self.map.get(&var)
    }

    /// Bind `var` to `term`, keeping the substitution idempotent.
    pub fn bind(&mut self, var: VariableId, term: Term) {
        let mut single = Substitution::new();
        single.map.insert(var, term.clone());
        for value in self.map.values_mut() {
            *value = single.apply(value);
        }
        self.map.insert(var, term);
    }

    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => self.map.get(&v.id).cloned().unwrap_or_else(|| term.clone()),
            Term::Constant(_) => term.clone(),
            Term::Function(f, args) => {
                Term::Function(*f, args.iter().map(|a| self.apply(a)).collect())
            }
        }
    }

    pub fn apply_literal(&self, lit: &Literal) -> Literal {
        Literal {
            predicate: lit.predicate,
            args: lit.args.iter().map(|a| self.apply(a)).collect(),
            polarity: lit.polarity,
        }
    }
}

/// Why unification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnificationError {
    /// The variable occurs in the term it would be bound to.
    OccursCheck,
    /// Top symbols differ.
    Clash,
}

impl fmt::Display for UnificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnificationError::OccursCheck => write!(f, "occurs check failed"),
            UnificationError::Clash => write!(f, "symbol clash"),
        }
    }
}

/// Compute a most general unifier of two terms.
pub fn unify(t1: &Term, t2: &Term) -> Result<Substitution, UnificationError> {
    let mut subst = Substitution::new();
    unify_into(t1, t2, &mut subst)?;
    Ok(subst)
}

/// Unify two argument lists under one substitution.
pub fn unify_args(
    args1: &[Term],
    args2: &[Term],
    subst: &mut Substitution,
) -> Result<(), UnificationError> {
    if args1.len() != args2.len() {
        return Err(UnificationError::Clash);
    }
    for (a1, a2) in args1.iter().zip(args2) {
        unify_into(a1, a2, subst)?;
    }
    Ok(())
}

fn unify_into(t1: &Term, t2: &Term, subst: &mut Substitution) -> Result<(), UnificationError> {
    let t1 = subst.apply(t1);
    let t2 = subst.apply(t2);
    match (&t1, &t2) {
        _ if t1 == t2 => Ok(()),
        (Term::Variable(v), t) | (t, Term::Variable(v)) => {
            if t.contains_variable(v.id) {
                Err(UnificationError::OccursCheck)
            } else {
                subst.bind(v.id, t.clone());
                Ok(())
            }
        }
        (Term::Function(f1, args1), Term::Function(f2, args2)) if f1.id == f2.id => {
            unify_args(args1, args2, subst)
        }
        _ => Err(UnificationError::Clash),
    }
}

/// One-way matching: bind pattern variables so the pattern becomes the
/// target. Only pattern-side variables are bound; failure is a plain
/// `false` (this runs in the subsumption hot path).
pub fn match_term<'a>(
    pattern: &Term,
    target: &'a Term,
    bindings: &mut MatchBindings<'a>,
) -> bool {
    match pattern {
        Term::Variable(v) => match bindings.get(v.id) {
            Some(bound) => bound == target,
            None => {
                bindings.bind(v.id, target);
                true
            }
        },
        Term::Constant(c1) => matches!(target, Term::Constant(c2) if c1 == c2),
        Term::Function(f1, args1) => match target {
            Term::Function(f2, args2) if f1.id == f2.id && args1.len() == args2.len() => args1
                .iter()
                .zip(args2)
                .all(|(p, t)| match_term(p, t, bindings)),
            _ => false,
        },
    }
}

/// Match two argument lists left to right under shared bindings.
pub fn match_args<'a>(
    pattern: &[Term],
    target: &'a [Term],
    bindings: &mut MatchBindings<'a>,
) -> bool {
    pattern.len() == target.len()
        && pattern
            .iter()
            .zip(target)
            .all(|(p, t)| match_term(p, t, bindings))
}

/// Flat one-way-match bindings with a backtracking trail.
///
/// Bindings are term references into the target, indexed by raw variable
/// id; `mark`/`undo_to` give O(1) backtracking without rebuilding maps.
pub struct MatchBindings<'a> {
    slots: Vec<Option<&'a Term>>,
    trail: Vec<u32>,
}

impl<'a> MatchBindings<'a> {
    /// `var_capacity` must exceed every raw variable id in the patterns.
    pub fn new(var_capacity: usize) -> Self {
        MatchBindings { slots: vec![None; var_capacity], trail: Vec::new() }
    }

    pub fn get(&self, var: VariableId) -> Option<&'a Term> {
        self.slots.get(var.as_u32() as usize).copied().flatten()
    }

    pub fn bind(&mut self, var: VariableId, term: &'a Term) {
        let idx = var.as_u32() as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        self.slots[idx] = Some(term);
        self.trail.push(var.as_u32());
    }

    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    pub fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let idx = self.trail.pop().expect("trail length checked");
            self.slots[idx as usize] = None;
        }
    }

    pub fn clear(&mut self) {
        self.undo_to(0);
    }

    /// Apply the bindings to a term, cloning as needed. Unbound variables
    /// stay themselves.
    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Variable(v) => match self.get(v.id) {
                Some(bound) => bound.clone(),
                None => term.clone(),
            },
            Term::Constant(_) => term.clone(),
            Term::Function(f, args) => {
                Term::Function(*f, args.iter().map(|a| self.apply(a)).collect())
            }
        }
    }

    /// Materialize the bindings as a substitution (cloning bound terms).
    pub fn to_substitution(&self) -> Substitution {
        let mut subst = Substitution::new();
        for idx in &self.trail {
            if let Some(term) = self.slots[*idx as usize] {
                subst.bind(VariableId(*idx), term.clone());
            }
        }
        subst
    }
}

/// One-way match of a full literal: polarity and predicate must agree and
/// some argument orientation must match (the swapped orientation is tried
/// for commutative predicates). Leaves `bindings` clean.
pub fn literal_matches<'a>(
    pattern: &Literal,
    target: &'a Literal,
    commutative: bool,
    bindings: &mut MatchBindings<'a>,
) -> bool {
    if pattern.polarity != target.polarity || pattern.predicate != target.predicate {
        return false;
    }
    let direct = match_args(&pattern.args, &target.args, bindings);
    bindings.clear();
    if direct {
        return true;
    }
    if commutative && pattern.args.len() == 2 && target.args.len() == 2 {
        let swapped = match_term(&pattern.args[0], &target.args[1], bindings)
            && match_term(&pattern.args[1], &target.args[0], bindings);
        bindings.clear();
        return swapped;
    }
    false
}

/// Rename every variable of a literal with a scope suffix, so two clauses
/// never share variables during unification.
pub fn rename_literal(lit: &Literal, suffix: &str, interner: &mut Interner) -> Literal {
    Literal {
        predicate: lit.predicate,
        args: lit.args.iter().map(|a| rename_term(a, suffix, interner)).collect(),
        polarity: lit.polarity,
    }
}

fn rename_term(term: &Term, suffix: &str, interner: &mut Interner) -> Term {
    match term {
        Term::Variable(v) => {
            let name = format!("{}#{}", interner.resolve_variable(v.id), suffix);
            Term::Variable(Variable::new(interner.intern_variable(&name)))
        }
        Term::Constant(_) => term.clone(),
        Term::Function(f, args) => Term::Function(
            *f,
            args.iter().map(|a| rename_term(a, suffix, interner)).collect(),
        ),
    }
}
