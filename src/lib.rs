//! satura: a saturation-based first-order theorem prover core.
//!
//! The crate implements the given-clause algorithm over three observable
//! clause containers (Unprocessed, Passive, Active), a reference-counted
//! index manager routing clause lifecycle events to discrimination-tree
//! indexes, simplifying and generating inference engines, and the
//! multi-literal matching engine behind subsumption and subsumption
//! demodulation. Strategy variants (Otter, Discount, Discott, LRS) differ
//! only in which containers simplification reads and rewrites.
//!
//! The prover is a pure function from a clause set and options to a
//! termination reason and an optional refutation; no state persists
//! across runs, and everything runs on one thread.

pub mod config;
pub mod fol;
pub mod index;
pub mod inference;
pub mod matcher;
pub mod resource;
pub mod saturation;
pub mod selection;

pub use config::{
    ClauseFeature, LiteralSelectionMode, PassiveQueueConfig, PassiveRatio, ProverConfig,
    SaturationStrategy,
};
pub use fol::{
    Clause, ClauseStore, Constant, Derivation, FunctionSymbol, InferenceRule, Interner, Kbo,
    KboConfig, Literal, PredicateSymbol, Substitution, Term, TermOrdering, Variable,
};
pub use matcher::{literal_alternatives, MatchKind, MlMatcher};
pub use resource::{BudgetExceeded, ResourceGuard, TerminationReason};
pub use saturation::{saturate, SaturationLoop, SaturationOutcome, Statistics};
pub use selection::{LiteralSelector, SelectAll, SelectMaximal, SelectNegativeOrMaximal};
