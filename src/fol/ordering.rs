//! Knuth-Bendix term ordering.
//!
//! The saturation core consults the ordering purely as an oracle:
//! `compare(s, t)` answers Greater / Less / Equal / Incomparable and is
//! used to orient equalities for demodulation and to constrain
//! superposition.

use super::interner::{ConstantId, FunctionId, VariableId};
use super::term::Term;
use std::collections::HashMap;

/// Outcome of comparing two terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrdering {
    Greater,
    Less,
    Equal,
    Incomparable,
}

impl TermOrdering {
    pub fn flip(self) -> TermOrdering {
        match self {
            TermOrdering::Greater => TermOrdering::Less,
            TermOrdering::Less => TermOrdering::Greater,
            other => other,
        }
    }
}

/// Weight and precedence assignments. Unlisted symbols weigh 1 and take
/// their interning order as precedence.
#[derive(Debug, Clone, Default)]
pub struct KboConfig {
    pub function_weights: HashMap<FunctionId, u32>,
    pub constant_weights: HashMap<ConstantId, u32>,
    pub function_precedence: HashMap<FunctionId, u32>,
    pub constant_precedence: HashMap<ConstantId, u32>,
}

/// Knuth-Bendix ordering oracle.
#[derive(Debug, Clone, Default)]
pub struct Kbo {
    config: KboConfig,
}

/// Variable weight; kept positive so ground terms outweigh variables they
/// instantiate.
const VARIABLE_WEIGHT: u32 = 1;

impl Kbo {
    pub fn new(config: KboConfig) -> Self {
        Kbo { config }
    }

    fn function_weight(&self, id: FunctionId) -> u32 {
        self.config.function_weights.get(&id).copied().unwrap_or(1)
    }

    fn constant_weight(&self, id: ConstantId) -> u32 {
        self.config.constant_weights.get(&id).copied().unwrap_or(1)
    }

    /// Precedence key. Constants rank below functions of the same numeric
    /// precedence; within a class the interning order decides by default.
    fn precedence(&self, term: &Term) -> (u8, u32, u32) {
        match term {
            Term::Constant(c) => (
                0,
                self.config.constant_precedence.get(&c.id).copied().unwrap_or(0),
                c.id.as_u32(),
            ),
            Term::Function(f, _) => (
                1,
                self.config.function_precedence.get(&f.id).copied().unwrap_or(0),
                f.id.as_u32(),
            ),
            Term::Variable(_) => (2, 0, 0),
        }
    }

    /// Total symbol weight of a term.
    pub fn weight(&self, term: &Term) -> u32 {
        match term {
            Term::Variable(_) => VARIABLE_WEIGHT,
            Term::Constant(c) => self.constant_weight(c.id),
            Term::Function(f, args) => {
                self.function_weight(f.id) + args.iter().map(|a| self.weight(a)).sum::<u32>()
            }
        }
    }

    /// Compare two terms.
    pub fn compare(&self, s: &Term, t: &Term) -> TermOrdering {
        if s == t {
            return TermOrdering::Equal;
        }

        let mut s_vars = HashMap::new();
        let mut t_vars = HashMap::new();
        count_variables(s, &mut s_vars);
        count_variables(t, &mut t_vars);
        let s_covers_t = covers(&s_vars, &t_vars);
        let t_covers_s = covers(&t_vars, &s_vars);

        let ws = self.weight(s);
        let wt = self.weight(t);
        if ws > wt {
            return if s_covers_t { TermOrdering::Greater } else { TermOrdering::Incomparable };
        }
        if wt > ws {
            return if t_covers_s { TermOrdering::Less } else { TermOrdering::Incomparable };
        }

        // Equal weights: variables compare only through occurrence.
        if let Term::Variable(v) = s {
            return if t.contains_variable(v.id) { TermOrdering::Less } else { TermOrdering::Incomparable };
        }
        if let Term::Variable(v) = t {
            return if s.contains_variable(v.id) { TermOrdering::Greater } else { TermOrdering::Incomparable };
        }

        let ps = self.precedence(s);
        let pt = self.precedence(t);
        if ps > pt {
            return if s_covers_t { TermOrdering::Greater } else { TermOrdering::Incomparable };
        }
        if pt > ps {
            return if t_covers_s { TermOrdering::Less } else { TermOrdering::Incomparable };
        }

        // Same head symbol and weight: first lexicographic difference decides.
        if let (Term::Function(_, s_args), Term::Function(_, t_args)) = (s, t) {
            for (sa, ta) in s_args.iter().zip(t_args) {
                match self.compare(sa, ta) {
                    TermOrdering::Equal => continue,
                    TermOrdering::Greater => {
                        return if s_covers_t { TermOrdering::Greater } else { TermOrdering::Incomparable }
                    }
                    TermOrdering::Less => {
                        return if t_covers_s { TermOrdering::Less } else { TermOrdering::Incomparable }
                    }
                    TermOrdering::Incomparable => return TermOrdering::Incomparable,
                }
            }
        }
        TermOrdering::Incomparable
    }
}

fn count_variables(term: &Term, counts: &mut HashMap<VariableId, usize>) {
    term.for_each_variable(&mut |v| {
        *counts.entry(v).or_insert(0) += 1;
    });
}

/// True if `left` has at least as many occurrences of every variable of
/// `right`.
fn covers(left: &HashMap<VariableId, usize>, right: &HashMap<VariableId, usize>) -> bool {
    right
        .iter()
        .all(|(v, n)| left.get(v).copied().unwrap_or(0) >= *n)
}
