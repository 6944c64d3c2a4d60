//! Multi-literal matching: the engine behind subsumption, subsumption
//! resolution, and forward subsumption demodulation.

mod ml_match;

pub use ml_match::{MatchKind, MlMatcher};

use crate::fol::{match_args, match_term, Clause, Interner, Literal, MatchBindings};

/// For each literal of `base`, collect the positions of `instance` literals
/// it could individually match: same predicate and polarity, and at least
/// one argument orientation matches (both orientations are considered for
/// commutative predicates; the matcher re-derives the per-orientation
/// binding rows itself).
pub fn literal_alternatives(
    base: &Clause,
    instance: &Clause,
    interner: &Interner,
) -> Vec<Vec<usize>> {
    let mut var_capacity = 0usize;
    for lit in &base.literals {
        lit.for_each_variable(&mut |v| {
            var_capacity = var_capacity.max(v.as_u32() as usize + 1);
        });
    }
    let mut bindings = MatchBindings::new(var_capacity);

    base.literals
        .iter()
        .map(|b| {
            let commutative = b.is_commutative(interner);
            instance
                .literals
                .iter()
                .enumerate()
                .filter(|(_, inst)| {
                    inst.polarity == b.polarity
                        && inst.predicate == b.predicate
                        && (matches_oriented(b, inst, false, &mut bindings)
                            || (commutative && matches_oriented(b, inst, true, &mut bindings)))
                })
                .map(|(pos, _)| pos)
                .collect()
        })
        .collect()
}

/// One-way match test of a single literal pair, optionally with swapped
/// arguments. Leaves `bindings` clean.
fn matches_oriented<'a>(
    base: &Literal,
    inst: &'a Literal,
    swapped: bool,
    bindings: &mut MatchBindings<'a>,
) -> bool {
    let result = if swapped {
        base.args.len() == 2
            && inst.args.len() == 2
            && match_term(&base.args[0], &inst.args[1], bindings)
            && match_term(&base.args[1], &inst.args[0], bindings)
    } else {
        match_args(&base.args, &inst.args, bindings)
    };
    bindings.clear();
    result
}
