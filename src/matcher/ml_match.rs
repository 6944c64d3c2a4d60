//! Multi-literal matching engine.
//!
//! Given a base clause `B = b_0 .. b_{n-1}`, an instance clause `I`, and for
//! each base literal a list of alternative positions in `I`, the matcher
//! enumerates substitutions σ together with injective multiset maps μ such
//! that σ(b_i) = I[μ(i)]. This is the engine behind forward and backward
//! subsumption and forward subsumption demodulation, and it runs millions of
//! times per proof attempt, so all per-problem storage comes from a few flat
//! buffers sized by one counting pass and the search itself never allocates.
//!
//! The search is a backtracking loop over decision levels (one per base
//! literal). Backtracking keeps all data structures intact: a match-record or
//! skip value counts as unset iff it is greater than the current level.

use crate::fol::{Clause, Interner, Literal, Term, VariableId};
use crate::resource::{BudgetExceeded, ResourceGuard};
use std::collections::HashMap;
use std::ops::Range;

/// Sentinel for "no level": larger than any decision level.
const NONE: usize = usize::MAX;

/// Inner-loop iterations between cooperative time checks.
const TIME_CHECK_INTERVAL: u32 = 50_000;

/// What the caller wants matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Injective multiset matching of every base literal (subsumption).
    Subsumption,
    /// The base literal at this position is resolved away and takes no part
    /// in the match (subsumption resolution).
    Resolved(usize),
    /// At most one positive equality of the base may be left out of the
    /// substitution and reported as the demodulating equality (forward
    /// subsumption demodulation).
    EqualitySkip,
}

/// One variable-binding row: a slice of `binding_buf` holding the term bound
/// to each base variable (ascending variable order), plus the instance
/// position of the alternative it came from.
#[derive(Debug, Clone, Copy)]
struct AltRow {
    bind_off: usize,
    inst_pos: usize,
}

/// Outcome of lazily initializing a decision level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitOutcome {
    Ok,
    MustBacktrack,
    NoAlternative,
}

/// Backtracking multi-literal matcher. One instance per match problem;
/// `next_match` resumes after each reported match.
pub struct MlMatcher<'a> {
    kind: MatchKind,
    len: usize,
    /// Base literals, reordered by the fail-fast heuristic.
    bases: Vec<&'a Literal>,
    /// Alternative positions in `instance`, reordered in tandem with bases.
    alts: Vec<Vec<usize>>,
    /// Whether each base literal gets a second, argument-swapped row per
    /// alternative (equality / declared-commutative predicates).
    commutative: Vec<bool>,
    /// Whether each base literal is a positive equality (eligible for the
    /// demodulation skip).
    positive_eq: Vec<bool>,
    instance: &'a Clause,

    initialized: Vec<bool>,
    var_cnts: Vec<usize>,
    var_ranges: Vec<Range<usize>>,
    row_ranges: Vec<Range<usize>>,

    /// Distinct variables of each base literal, ascending, one segment per
    /// initialized level. Monotonic.
    bound_var_buf: Vec<VariableId>,
    /// Flat binding cells; each row owns `var_cnts[level]` consecutive
    /// cells. Monotonic.
    binding_buf: Vec<&'a Term>,
    /// Alternative rows; rows of one level are swapped in place to prune,
    /// never moved across levels. Monotonic.
    rows: Vec<AltRow>,

    /// `remaining[tri(i, k)]`: alternatives of level i still compatible
    /// with the committed choices of levels 0..k.
    remaining: Vec<u32>,
    /// Variable-intersection info per level pair (hi, lo), lazily built:
    /// a range of `pair_buf` listing (position-in-lo, position-in-hi) of
    /// each shared variable.
    isect: Vec<Option<Range<usize>>>,
    pair_buf: Vec<(u32, u32)>,

    /// Next alternative to try at each level.
    next_alts: Vec<usize>,
    /// For each instance position, the level that claimed it; unset iff
    /// greater than the current level.
    match_record: Vec<usize>,
    /// Level whose positive equality is skipped for demodulation; unset
    /// iff greater than the current level.
    eq_skip: usize,
    /// Current decision level.
    curr: usize,

    matched_empty: bool,
    counter: u32,
    guard: Option<&'a ResourceGuard>,
}

/// Triangular index: row `i`, column `k <= i`.
#[inline]
fn tri(i: usize, k: usize) -> usize {
    i * (i + 1) / 2 + k
}

impl<'a> MlMatcher<'a> {
    /// Set up a match problem.
    ///
    /// `alts[i]` lists the instance positions that base literal `i` may map
    /// to; build it with [`literal_alternatives`](super::literal_alternatives)
    /// or from index retrievals. A `Resolved` base literal is dropped from
    /// the problem before the search starts.
    pub fn new(
        base: &'a Clause,
        instance: &'a Clause,
        alts: Vec<Vec<usize>>,
        kind: MatchKind,
        interner: &Interner,
        guard: Option<&'a ResourceGuard>,
    ) -> Self {
        debug_assert_eq!(alts.len(), base.literals.len());

        let mut bases: Vec<&Literal> = base.literals.iter().collect();
        let mut alt_lists = alts;
        if let MatchKind::Resolved(resolved) = kind {
            bases.remove(resolved);
            alt_lists.remove(resolved);
        }
        let len = bases.len();
        let commutative: Vec<bool> =
            bases.iter().map(|b| b.is_commutative(interner)).collect();
        let positive_eq: Vec<bool> =
            bases.iter().map(|b| b.is_positive_equality(interner)).collect();

        let mut matcher = MlMatcher {
            kind,
            len,
            bases,
            alts: alt_lists,
            commutative,
            positive_eq,
            instance,
            initialized: vec![false; len],
            var_cnts: vec![0; len],
            var_ranges: vec![0..0; len],
            row_ranges: vec![0..0; len],
            bound_var_buf: Vec::new(),
            binding_buf: Vec::new(),
            rows: Vec::new(),
            remaining: vec![0; len * (len + 1) / 2],
            isect: vec![None; len * (len + 1) / 2],
            pair_buf: Vec::new(),
            next_alts: vec![0; len],
            match_record: vec![NONE; instance.literals.len()],
            eq_skip: NONE,
            curr: 0,
            matched_empty: false,
            counter: 0,
            guard,
        };
        matcher.reorder_and_reserve();
        matcher
    }

    /// Counting pass: size the flat buffers and reorder base literals to
    /// fail fast. Order: literals with zero alternatives first, then those
    /// with a single alternative, then the one with the most distinct
    /// variables, then the rest.
    fn reorder_and_reserve(&mut self) {
        if self.len == 0 {
            return;
        }

        let mut zero_alts = 0usize;
        let mut single_alts = 0usize;
        let mut total_vars = 0usize;
        let mut total_rows = 0usize;
        let mut total_cells = 0usize;
        let mut most_vars_lit = 0usize;
        let mut most_vars_cnt = self.bases[0].distinct_var_count();

        for i in 0..self.len {
            let dist_vars = self.bases[i].distinct_var_count();
            total_vars += dist_vars;
            // Commutative alternatives may produce two rows each.
            let alt_cnt = self.alts[i].len() * if self.commutative[i] { 2 } else { 1 };
            total_rows += alt_cnt;
            total_cells += dist_vars * alt_cnt;

            if alt_cnt == 0 {
                if zero_alts != i {
                    if single_alts != zero_alts {
                        self.swap_levels(single_alts, zero_alts);
                    }
                    self.swap_levels(i, zero_alts);
                    if most_vars_lit == single_alts {
                        most_vars_lit = i;
                    }
                }
                zero_alts += 1;
                single_alts += 1;
            } else if alt_cnt == 1 {
                if single_alts != i {
                    self.swap_levels(i, single_alts);
                    if most_vars_lit == single_alts {
                        most_vars_lit = i;
                    }
                }
                single_alts += 1;
            } else if i > 0 && most_vars_cnt < dist_vars {
                most_vars_lit = i;
                most_vars_cnt = dist_vars;
            }
        }
        if most_vars_lit > single_alts {
            self.swap_levels(most_vars_lit, single_alts);
        }

        self.bound_var_buf.reserve(total_vars);
        self.rows.reserve(total_rows);
        self.binding_buf.reserve(total_cells);
        self.pair_buf.reserve((total_vars + self.len) * self.len);
    }

    fn swap_levels(&mut self, i: usize, j: usize) {
        self.bases.swap(i, j);
        self.alts.swap(i, j);
        self.commutative.swap(i, j);
        self.positive_eq.swap(i, j);
    }

    /// Enumerate the next match. Returns `Ok(false)` when the search space
    /// is exhausted; the only error is the cooperative time check.
    pub fn next_match(&mut self) -> Result<bool, BudgetExceeded> {
        if self.len == 0 {
            // Empty base: exactly one match, with empty bindings.
            let first = !self.matched_empty;
            self.matched_empty = true;
            return Ok(first);
        }

        loop {
            self.counter += 1;
            if self.counter == TIME_CHECK_INTERVAL {
                self.counter = 0;
                if let Some(guard) = self.guard {
                    guard.check_time()?;
                }
            }

            match self.ensure_init(self.curr) {
                InitOutcome::NoAlternative => return Ok(false),
                InitOutcome::MustBacktrack => {
                    debug_assert!(self.curr > 0);
                    self.curr -= 1;
                    continue;
                }
                InitOutcome::Ok => {}
            }

            let max_alt = self.remaining[tri(self.curr, self.curr)] as usize;

            // Scan for an alternative that is unclaimed and does not starve
            // any later initialized level.
            while self.next_alts[self.curr] < max_alt
                && (self.claimed(self.curr, self.next_alts[self.curr])
                    || !self.bind_alt(self.curr, self.next_alts[self.curr]))
            {
                self.next_alts[self.curr] += 1;
            }

            if self.next_alts[self.curr] < max_alt {
                // Commit: release this level's previous claim, claim the new
                // position, descend.
                self.release_claims(self.curr);
                let pos = self.row(self.curr, self.next_alts[self.curr]).inst_pos;
                debug_assert!(self.match_record[pos] > self.curr);
                self.match_record[pos] = self.curr;
                self.next_alts[self.curr] += 1;
                self.curr += 1;
                if self.curr == self.len {
                    break;
                }
                self.next_alts[self.curr] = 0;
                if self.eq_skip == self.curr {
                    self.eq_skip = NONE;
                }
            } else if self.kind == MatchKind::EqualitySkip
                && self.eq_skip > self.curr
                && self.positive_eq[self.curr]
            {
                // No alternative left, but this positive equality may sit
                // out of the substitution as the demodulating equality.
                self.release_claims(self.curr);
                self.eq_skip = self.curr;
                self.skip_binding(self.curr);
                self.curr += 1;
                if self.curr == self.len {
                    break;
                }
                self.next_alts[self.curr] = 0;
            } else {
                if self.curr == 0 {
                    return Ok(false);
                }
                self.curr -= 1;
            }
        }

        // Complete match found; step back so the next call resumes from the
        // most recent choice.
        debug_assert_eq!(self.curr, self.len);
        self.curr -= 1;
        Ok(true)
    }

    /// Instance positions claimed by the last reported match (skipped
    /// equality excluded).
    pub fn matched_bitmap(&self) -> Vec<bool> {
        let mut bitmap = vec![false; self.instance.literals.len()];
        for bi in 0..self.len {
            if bi != self.eq_skip {
                let row = self.row(bi, self.next_alts[bi] - 1);
                bitmap[row.inst_pos] = true;
            }
        }
        bitmap
    }

    /// The substitution of the last reported match (skipped equality
    /// excluded).
    pub fn bindings(&self) -> HashMap<VariableId, &'a Term> {
        let mut out = HashMap::new();
        for bi in 0..self.len {
            if bi == self.eq_skip {
                continue;
            }
            let row = self.row(bi, self.next_alts[bi] - 1);
            for vi in 0..self.var_cnts[bi] {
                let var = self.bound_var_buf[self.var_ranges[bi].start + vi];
                let term = self.binding_buf[row.bind_off + vi];
                let previous = out.insert(var, term);
                debug_assert!(previous.is_none() || previous == Some(term));
            }
        }
        out
    }

    /// The positive equality skipped by the last reported match, if any.
    pub fn equality_for_demodulation(&self) -> Option<&'a Literal> {
        if self.eq_skip < self.len {
            Some(self.bases[self.eq_skip])
        } else {
            None
        }
    }

    fn row(&self, bi: usize, alt: usize) -> AltRow {
        self.rows[self.row_ranges[bi].start + alt]
    }

    /// True if the alternative's instance position is already claimed by an
    /// earlier level.
    fn claimed(&self, bi: usize, alt: usize) -> bool {
        self.match_record[self.row(bi, alt).inst_pos] < bi
    }

    /// Unclaim whatever this level claimed on a previous visit.
    fn release_claims(&mut self, bi: usize) {
        for record in self.match_record.iter_mut() {
            if *record == bi {
                *record = NONE;
            }
        }
    }

    /// Lazily materialize the binding rows and `remaining` line of a level,
    /// filtering the rows against every committed earlier choice.
    fn ensure_init(&mut self, bi: usize) -> InitOutcome {
        if self.initialized[bi] {
            return InitOutcome::Ok;
        }
        self.initialized[bi] = true;

        // Distinct variables, ascending; binding rows are laid out in this
        // order.
        let vstart = self.bound_var_buf.len();
        let mut vars: Vec<VariableId> = Vec::new();
        self.bases[bi].for_each_variable(&mut |v| vars.push(v));
        vars.sort_unstable();
        vars.dedup();
        self.bound_var_buf.extend_from_slice(&vars);
        self.var_ranges[bi] = vstart..self.bound_var_buf.len();
        self.var_cnts[bi] = vars.len();

        let rstart = self.rows.len();
        let instance = self.instance;
        let alt_positions = std::mem::take(&mut self.alts[bi]);
        for &pos in &alt_positions {
            let alt = &instance.literals[pos];
            self.push_row_if_matches(bi, alt, pos, false);
            if self.commutative[bi] {
                self.push_row_if_matches(bi, alt, pos, true);
            }
        }
        self.alts[bi] = alt_positions;
        self.row_ranges[bi] = rstart..self.rows.len();

        let alt_cnt = (self.rows.len() - rstart) as u32;
        if alt_cnt == 0 {
            if self.kind == MatchKind::EqualitySkip && self.positive_eq[bi] {
                for k in 0..=bi {
                    self.remaining[tri(bi, k)] = 0;
                }
                return if self.eq_skip < bi {
                    // A previous equality was already skipped.
                    InitOutcome::MustBacktrack
                } else {
                    InitOutcome::Ok
                };
            }
            return InitOutcome::NoAlternative;
        }
        self.remaining[tri(bi, 0)] = alt_cnt;

        // Filter against the committed choice of every earlier level.
        let mut rem = alt_cnt;
        for pbi in 0..bi {
            rem = self.remaining[tri(bi, pbi)];
            if pbi != self.eq_skip && self.have_common_vars(pbi, bi) {
                let pivot = self.row_ranges[pbi].start + self.next_alts[pbi] - 1;
                rem = self.prune_incompatible(pbi, pivot, bi, rem);
            }
            self.remaining[tri(bi, pbi + 1)] = rem;
        }
        if bi > 0 && rem == 0 {
            return InitOutcome::MustBacktrack;
        }
        InitOutcome::Ok
    }

    /// Try to match `bases[bi]` against one alternative (optionally with
    /// swapped arguments) and append the binding row on success.
    fn push_row_if_matches(&mut self, bi: usize, alt: &'a Literal, pos: usize, swapped: bool) {
        let vars = &self.bound_var_buf[self.var_ranges[bi].clone()];
        let base = self.bases[bi];
        let mut cells: Vec<Option<&'a Term>> = vec![None; vars.len()];

        let ok = if swapped {
            base.args.len() == 2
                && alt.args.len() == 2
                && bind_term(&base.args[0], &alt.args[1], vars, &mut cells)
                && bind_term(&base.args[1], &alt.args[0], vars, &mut cells)
        } else {
            base.args.len() == alt.args.len()
                && base
                    .args
                    .iter()
                    .zip(&alt.args)
                    .all(|(p, t)| bind_term(p, t, vars, &mut cells))
        };
        if !ok {
            return;
        }

        // Every collected variable occurs in the literal, so a full match
        // binds them all.
        if let Some(row) = cells.into_iter().collect::<Option<Vec<&Term>>>() {
            let bind_off = self.binding_buf.len();
            self.binding_buf.extend(row);
            self.rows.push(AltRow { bind_off, inst_pos: pos });
        }
    }

    /// Variable-intersection info for levels `lo < hi`: positions of each
    /// shared variable in the two binding rows. Built once, cached.
    fn intersect_range(&mut self, lo: usize, hi: usize) -> Range<usize> {
        debug_assert!(lo < hi);
        if let Some(range) = &self.isect[tri(hi, lo)] {
            return range.clone();
        }
        let start = self.pair_buf.len();
        {
            let lo_vars = &self.bound_var_buf[self.var_ranges[lo].clone()];
            let hi_vars = &self.bound_var_buf[self.var_ranges[hi].clone()];
            let mut i = 0;
            let mut j = 0;
            while i < lo_vars.len() && j < hi_vars.len() {
                match lo_vars[i].cmp(&hi_vars[j]) {
                    std::cmp::Ordering::Less => i += 1,
                    std::cmp::Ordering::Greater => j += 1,
                    std::cmp::Ordering::Equal => {
                        self.pair_buf.push((i as u32, j as u32));
                        i += 1;
                        j += 1;
                    }
                }
            }
        }
        let range = start..self.pair_buf.len();
        self.isect[tri(hi, lo)] = Some(range.clone());
        range
    }

    fn have_common_vars(&mut self, lo: usize, hi: usize) -> bool {
        !self.intersect_range(lo, hi).is_empty()
    }

    /// Drop (swap to the back) the alternatives of level `hi` that disagree
    /// with the pivot row of level `lo` on some shared variable. Returns the
    /// number of surviving alternatives.
    fn prune_incompatible(&mut self, lo: usize, pivot_row: usize, hi: usize, rem: u32) -> u32 {
        let pairs = self.intersect_range(lo, hi);
        let start = self.row_ranges[hi].start;
        let pivot_off = self.rows[pivot_row].bind_off;
        let mut rem = rem as usize;
        let mut ai = 0;
        while ai < rem {
            let row_off = self.rows[start + ai].bind_off;
            let mut compatible = true;
            for &(p, q) in &self.pair_buf[pairs.clone()] {
                if self.binding_buf[pivot_off + p as usize]
                    != self.binding_buf[row_off + q as usize]
                {
                    compatible = false;
                    break;
                }
            }
            if compatible {
                ai += 1;
            } else {
                rem -= 1;
                self.rows.swap(start + ai, start + rem);
            }
        }
        rem as u32
    }

    /// Commit level `bi` to its alternative `alt`, excluding now-conflicting
    /// alternatives of every later initialized level. Returns false if some
    /// later level is left without alternatives.
    fn bind_alt(&mut self, bi: usize, alt: usize) -> bool {
        let pivot = self.row_ranges[bi].start + alt;
        for i in bi + 1..self.len {
            if !self.initialized[i] {
                // Later lines of `remaining` are filled in ensure_init.
                break;
            }
            let mut rem = self.remaining[tri(i, bi)];
            if self.have_common_vars(bi, i) {
                rem = self.prune_incompatible(bi, pivot, i, rem);
            }
            if rem == 0 {
                return false;
            }
            self.remaining[tri(i, bi + 1)] = rem;
        }
        true
    }

    /// Counterpart of `bind_alt` for a skipped equality: the level binds
    /// nothing, so later levels keep their alternative counts unchanged.
    fn skip_binding(&mut self, bi: usize) {
        debug_assert_eq!(bi, self.eq_skip);
        for i in bi + 1..self.len {
            if !self.initialized[i] {
                break;
            }
            let rem = self.remaining[tri(i, bi)];
            debug_assert!(rem > 0);
            self.remaining[tri(i, bi + 1)] = rem;
        }
    }
}

fn bind_term<'a>(
    pattern: &Term,
    target: &'a Term,
    vars: &[VariableId],
    cells: &mut [Option<&'a Term>],
) -> bool {
    match pattern {
        Term::Variable(v) => {
            // vars was collected from this very literal.
            let slot = match vars.binary_search(&v.id) {
                Ok(slot) => slot,
                Err(_) => return false,
            };
            match cells[slot] {
                Some(bound) => bound == target,
                None => {
                    cells[slot] = Some(target);
                    true
                }
            }
        }
        Term::Constant(c1) => matches!(target, Term::Constant(c2) if c1 == c2),
        Term::Function(f1, args1) => match target {
            Term::Function(f2, args2) if f1.id == f2.id && args1.len() == args2.len() => args1
                .iter()
                .zip(args2)
                .all(|(p, t)| bind_term(p, t, vars, cells)),
            _ => false,
        },
    }
}
