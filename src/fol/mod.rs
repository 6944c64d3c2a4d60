//! First-order logic views required by the saturation core: terms,
//! literals, clauses, symbol interning, substitutions, and the term
//! ordering oracle.

mod clause;
mod interner;
mod literal;
mod ordering;
mod substitution;
mod term;

pub use clause::{Clause, ClauseDisplay, ClauseStore, Derivation, InferenceRule};
pub use interner::{ConstantId, FunctionId, Interner, PredicateId, VariableId};
pub use literal::{Literal, LiteralDisplay, PredicateSymbol};
pub use ordering::{Kbo, KboConfig, TermOrdering};
pub use substitution::{
    literal_matches, match_args, match_term, rename_literal, unify, unify_args, MatchBindings,
    Substitution, UnificationError,
};
pub use term::{Constant, FunctionSymbol, Term, TermDisplay, Variable};
