//! The given-clause saturation loop.
//!
//! Three clause populations (Unprocessed, Passive, Active) cycle through
//! forward simplification, selection, backward simplification, and
//! generating inferences until the empty clause appears, Passive runs
//! dry, or a resource budget trips. Strategy variants differ only in the
//! wiring of the simplifying and to-be-simplified containers (see
//! `SaturationStrategy`).

use super::containers::{
    ActiveContainer, ClauseContainer, FakeContainer, PassiveQueue, UnprocessedContainer,
};
use super::statistics::Statistics;
use crate::config::{ProverConfig, SaturationStrategy};
use crate::fol::{Clause, ClauseStore, InferenceRule, Interner, Kbo};
use crate::index::IndexManager;
use crate::inference::{
    BackwardDemodulation, BackwardSubsumption, DuplicateLiteralRemoval, EqualityFactoring,
    EqualityResolution, Factoring, ForwardDemodulation, ForwardOutcome, ForwardSubsumption,
    ForwardSubsumptionDemodulation, GeneratingEngine, Resolution, SimplifyingEngine,
    Superposition, TautologyDeletion,
};
use crate::resource::{BudgetExceeded, ResourceGuard, TerminationReason};
use crate::selection::{selector_for, LiteralSelector};
use std::cell::RefCell;
use std::rc::Rc;

/// Result of one saturation run.
#[derive(Debug)]
pub struct SaturationOutcome {
    pub reason: TerminationReason,
    /// The empty clause, when the reason is `Refutation`. Its derivation
    /// graph reaches every premise through the clause arena.
    pub refutation: Option<Rc<Clause>>,
    pub statistics: Statistics,
}

/// Run the given-clause algorithm over a set of input clauses.
pub fn saturate(
    clauses: Vec<Clause>,
    config: ProverConfig,
    interner: Interner,
) -> SaturationOutcome {
    SaturationLoop::new(clauses, config, interner).run()
}

/// What forward simplification decided about a clause.
enum Fate {
    Kept,
    Deleted,
    Replaced(Clause),
}

/// The saturation loop: owner of the containers, the index manager, the
/// clause arena, and the engines.
pub struct SaturationLoop {
    config: ProverConfig,
    interner: Rc<RefCell<Interner>>,
    guard: ResourceGuard,

    /// Arena of all registered clauses, indexed by id.
    clauses: Vec<Rc<Clause>>,
    unprocessed: UnprocessedContainer,
    passive: PassiveQueue,
    active: ActiveContainer,
    /// Tracks Active ∪ Passive for Otter and Discott.
    fake: Option<FakeContainer>,

    index_manager: IndexManager,
    forward_engines: Vec<Box<dyn SimplifyingEngine>>,
    backward_engines: Vec<Box<dyn SimplifyingEngine>>,
    generating_engines: Vec<Box<dyn GeneratingEngine>>,

    statistics: Statistics,
    refutation: Option<Rc<Clause>>,
    /// Set once any clause is discarded by LRS limits; saturation then
    /// cannot claim satisfiability.
    incomplete: bool,
    activations_since_estimate: u32,
}

impl SaturationLoop {
    pub fn new(clauses: Vec<Clause>, config: ProverConfig, interner: Interner) -> Self {
        let interner = Rc::new(RefCell::new(interner));
        let ordering = Rc::new(Kbo::default());
        let selector: Rc<dyn LiteralSelector> = Rc::from(selector_for(config.literal_selection));

        let unprocessed = UnprocessedContainer::new();
        let passive = PassiveQueue::new(
            &config.passive_queue,
            config.passive_ratio,
            config.nongoal_weight_coefficient,
        );
        let active = ActiveContainer::new();
        let fake = match config.strategy {
            SaturationStrategy::Otter | SaturationStrategy::Discott => Some(FakeContainer::new()),
            _ => None,
        };

        let generating_channel = active.events().clone();
        let (simplifying_channel, to_be_simplified_channel) = match config.strategy {
            SaturationStrategy::Discount | SaturationStrategy::Lrs => {
                (active.events().clone(), active.events().clone())
            }
            SaturationStrategy::Otter => {
                let events = fake.as_ref().map(|f| f.events().clone());
                let events = events.expect("Otter tracks a fake container");
                (events.clone(), events)
            }
            SaturationStrategy::Discott => {
                let events = fake.as_ref().map(|f| f.events().clone());
                let events = events.expect("Discott tracks a fake container");
                (active.events().clone(), events)
            }
        };

        let mut index_manager = IndexManager::new(
            config.strategy.equal_simplification_containers(),
            generating_channel,
            simplifying_channel,
            to_be_simplified_channel,
            interner.clone(),
            selector.clone(),
            ordering.clone(),
        );

        let mut forward_engines: Vec<Box<dyn SimplifyingEngine>> = vec![
            Box::new(DuplicateLiteralRemoval),
            Box::new(TautologyDeletion::new(interner.clone())),
            Box::new(ForwardDemodulation::new(ordering.clone())),
            Box::new(ForwardSubsumption::new(interner.clone())),
            Box::new(ForwardSubsumptionDemodulation::new(
                interner.clone(),
                ordering.clone(),
            )),
        ];
        let mut backward_engines: Vec<Box<dyn SimplifyingEngine>> = vec![
            Box::new(BackwardSubsumption::new(interner.clone())),
            Box::new(BackwardDemodulation::new(interner.clone(), ordering.clone())),
        ];
        let mut generating_engines: Vec<Box<dyn GeneratingEngine>> = vec![
            Box::new(Factoring::new(selector.clone())),
            Box::new(EqualityResolution::new(interner.clone(), selector.clone())),
            Box::new(EqualityFactoring::new(
                interner.clone(),
                selector.clone(),
                ordering.clone(),
            )),
            Box::new(Resolution::new(interner.clone(), selector.clone())),
            Box::new(Superposition::new(interner.clone(), selector, ordering)),
        ];
        for engine in forward_engines.iter_mut().chain(backward_engines.iter_mut()) {
            engine.attach(&mut index_manager);
        }
        for engine in generating_engines.iter_mut() {
            engine.attach(&mut index_manager);
        }

        let guard = ResourceGuard::new(config.time_limit, config.memory_limit_mb);
        let mut this = SaturationLoop {
            config,
            interner,
            guard,
            clauses: Vec::new(),
            unprocessed,
            passive,
            active,
            fake,
            index_manager,
            forward_engines,
            backward_engines,
            generating_engines,
            statistics: Statistics::default(),
            refutation: None,
            incomplete: false,
            activations_since_estimate: 0,
        };
        this.statistics.initial_clauses = clauses.len();
        for clause in clauses {
            let clause = this.register(clause);
            this.enqueue(clause);
        }
        this
    }

    /// Run to refutation, saturation, or resource exhaustion.
    pub fn run(&mut self) -> SaturationOutcome {
        log::info!(
            "saturation started: {} input clauses, strategy {:?}",
            self.statistics.initial_clauses,
            self.config.strategy
        );
        let reason = match self.run_inner() {
            Ok(reason) => reason,
            Err(budget) => {
                log::info!("budget exhausted: {}", budget);
                budget.into()
            }
        };
        self.statistics.final_active = self.active.len();
        self.statistics.final_passive = self.passive.len();
        self.statistics.final_unprocessed = self.unprocessed.len();
        log::info!("saturation finished: {:?}", reason);
        SaturationOutcome {
            reason,
            refutation: self.refutation.clone(),
            statistics: self.statistics.clone(),
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Shared view of the interner, e.g. for displaying clauses.
    pub fn interner(&self) -> std::cell::Ref<'_, Interner> {
        self.interner.borrow()
    }

    /// The clause arena; premise ids in derivations index into it.
    pub fn clauses(&self) -> &[Rc<Clause>] {
        &self.clauses
    }

    /// The clauses of a recorded refutation, in id order: the empty clause
    /// and everything reachable through its derivation graph.
    pub fn refutation_clauses(&self) -> Vec<Rc<Clause>> {
        let empty = match &self.refutation {
            Some(empty) => empty,
            None => return Vec::new(),
        };
        let mut ids = vec![empty.id.expect("refutation is registered")];
        let mut seen = ids.clone();
        let mut i = 0;
        while i < ids.len() {
            let clause = &self.clauses[ids[i]];
            for &premise in &clause.derivation.premises {
                if !seen.contains(&premise) {
                    seen.push(premise);
                    ids.push(premise);
                }
            }
            i += 1;
        }
        ids.sort_unstable();
        ids.into_iter().map(|id| self.clauses[id].clone()).collect()
    }

    fn run_inner(&mut self) -> Result<TerminationReason, BudgetExceeded> {
        loop {
            self.guard.check()?;

            if self.drain()? {
                return Ok(TerminationReason::Refutation);
            }
            if self.passive.is_empty() {
                return Ok(if self.incomplete {
                    TerminationReason::RefutationNotFound
                } else {
                    TerminationReason::Satisfiable
                });
            }

            if self.config.strategy == SaturationStrategy::Lrs {
                self.update_lrs_limits();
            }

            let given = match self.passive.pop_selected() {
                Some(given) => given,
                None => continue,
            };
            given.set_store(ClauseStore::Selected);
            self.statistics.iterations += 1;

            if !self.handle_clause_before_activation(&given)? {
                continue;
            }
            self.activate(given)?;
        }
    }

    /// Register a clause in the arena: assign its id, age, and goal
    /// ancestry.
    fn register(&mut self, mut clause: Clause) -> Rc<Clause> {
        clause.id = Some(self.clauses.len());
        if clause.derivation.rule != InferenceRule::Input {
            clause.age = self.statistics.iterations as u32;
            clause.derived_from_goal = clause
                .derivation
                .premises
                .iter()
                .any(|&p| self.clauses[p].derived_from_goal);
        }
        let clause = Rc::new(clause);
        self.clauses.push(clause.clone());
        clause
    }

    /// Feed a registered clause into Unprocessed.
    fn enqueue(&mut self, clause: Rc<Clause>) {
        clause.set_store(ClauseStore::Unprocessed);
        self.unprocessed.add(clause);
    }

    /// Process Unprocessed to empty. Returns true if the refutation was
    /// recorded.
    fn drain(&mut self) -> Result<bool, BudgetExceeded> {
        while let Some(clause) = self.unprocessed.pop() {
            if clause.is_empty() {
                clause.set_store(ClauseStore::None);
                self.refutation = Some(clause);
                return Ok(true);
            }
            match self.forward_simplify(&clause)? {
                Fate::Deleted => {
                    clause.set_store(ClauseStore::None);
                    self.statistics.forward_deleted += 1;
                }
                Fate::Replaced(replacement) => {
                    clause.set_store(ClauseStore::None);
                    self.statistics.forward_replaced += 1;
                    let replacement = self.register(replacement);
                    self.enqueue(replacement);
                }
                Fate::Kept => {
                    if !self.passive.fulfils_limits(&clause) {
                        clause.set_store(ClauseStore::None);
                        self.note_limit_discard();
                        continue;
                    }
                    clause.set_store(ClauseStore::Passive);
                    self.passive.add(clause.clone());
                    self.on_derived_set_added(&clause);
                }
            }
        }
        Ok(false)
    }

    /// Run the forward simplification engines against the simplifying
    /// container's indices.
    fn forward_simplify(&mut self, clause: &Rc<Clause>) -> Result<Fate, BudgetExceeded> {
        for engine in self.forward_engines.iter_mut() {
            match engine.simplify_forward(clause, &self.guard)? {
                ForwardOutcome::Keep => {}
                ForwardOutcome::Delete { .. } => return Ok(Fate::Deleted),
                ForwardOutcome::Replace(replacement) => {
                    return Ok(Fate::Replaced(replacement))
                }
            }
        }
        Ok(Fate::Kept)
    }

    /// Strategy-dependent hook between SELECTED and ACTIVE.
    fn handle_clause_before_activation(
        &mut self,
        clause: &Rc<Clause>,
    ) -> Result<bool, BudgetExceeded> {
        match self.config.strategy {
            // Forward-simplify once more against Active (Passive clauses
            // never simplify), then backward-simplify.
            SaturationStrategy::Discount | SaturationStrategy::Lrs => {
                match self.forward_simplify(clause)? {
                    Fate::Deleted => {
                        clause.set_store(ClauseStore::None);
                        self.statistics.forward_deleted += 1;
                        Ok(false)
                    }
                    Fate::Replaced(replacement) => {
                        clause.set_store(ClauseStore::None);
                        self.statistics.forward_replaced += 1;
                        let replacement = self.register(replacement);
                        self.enqueue(replacement);
                        Ok(false)
                    }
                    Fate::Kept => {
                        self.backward_simplify(clause)?;
                        Ok(true)
                    }
                }
            }
            // Forward simplification already saw Passive; only backward
            // simplification runs here. The clause must not simplify
            // itself, so it leaves the to-be-simplified container for the
            // duration.
            SaturationStrategy::Otter | SaturationStrategy::Discott => {
                if let Some(fake) = self.fake.as_mut() {
                    fake.remove(clause);
                }
                self.backward_simplify(clause)?;
                if let Some(fake) = self.fake.as_mut() {
                    fake.add(clause.clone());
                }
                Ok(true)
            }
        }
    }

    /// Use the clause against the to-be-simplified container: delete or
    /// replace the clauses it makes redundant.
    fn backward_simplify(&mut self, clause: &Rc<Clause>) -> Result<(), BudgetExceeded> {
        let mut engines = std::mem::take(&mut self.backward_engines);
        let mut result = Ok(());
        'engines: for engine in engines.iter_mut() {
            let records = match engine.simplify_backward(clause, &self.guard) {
                Ok(records) => records,
                Err(budget) => {
                    result = Err(budget);
                    break 'engines;
                }
            };
            for record in records {
                let victim = record.victim;
                match victim.store() {
                    ClauseStore::Passive => {
                        self.passive.remove(&victim);
                        self.on_derived_set_removed(&victim);
                    }
                    ClauseStore::Active => {
                        self.active.remove(&victim);
                        self.on_derived_set_removed(&victim);
                    }
                    // Already gone (an earlier engine or record got it).
                    _ => continue,
                }
                victim.set_store(ClauseStore::None);
                match record.replacement {
                    Some(replacement) => {
                        self.statistics.backward_replaced += 1;
                        let replacement = self.register(replacement);
                        self.enqueue(replacement);
                    }
                    None => self.statistics.backward_deleted += 1,
                }
            }
        }
        self.backward_engines = engines;
        result
    }

    /// Move the clause into Active and run the generating inferences.
    fn activate(&mut self, clause: Rc<Clause>) -> Result<(), BudgetExceeded> {
        clause.set_store(ClauseStore::Active);
        self.active.add(clause.clone());
        self.statistics.activations += 1;
        self.activations_since_estimate += 1;

        let mut engines = std::mem::take(&mut self.generating_engines);
        let mut conclusions = Vec::new();
        let mut result = Ok(());
        for engine in engines.iter_mut() {
            match engine.generate(&clause, &self.guard) {
                Ok(generated) => conclusions.extend(generated),
                Err(budget) => {
                    result = Err(budget);
                    break;
                }
            }
        }
        self.generating_engines = engines;

        self.statistics.generated += conclusions.len();
        for conclusion in conclusions {
            let conclusion = self.register(conclusion);
            self.enqueue(conclusion);
        }
        result
    }

    /// The derived set Active ∪ Passive gained a passive clause.
    fn on_derived_set_added(&mut self, clause: &Rc<Clause>) {
        if let Some(fake) = self.fake.as_mut() {
            fake.add(clause.clone());
        }
    }

    /// The derived set Active ∪ Passive lost a clause (not by selection).
    fn on_derived_set_removed(&mut self, clause: &Rc<Clause>) {
        if let Some(fake) = self.fake.as_mut() {
            fake.remove(clause);
        }
    }

    fn note_limit_discard(&mut self) {
        self.incomplete = true;
        self.statistics.discarded_by_limits += 1;
    }

    /// LRS: estimate how many passive clauses are still reachable in the
    /// remaining time and discard the rest.
    fn update_lrs_limits(&mut self) {
        if self.activations_since_estimate < self.config.lrs_estimate_interval {
            return;
        }
        self.activations_since_estimate = 0;

        let elapsed = self.guard.elapsed().as_secs_f64();
        let remaining = match self.guard.remaining_time() {
            Some(remaining) => remaining.as_secs_f64(),
            None => return,
        };
        if elapsed <= 0.0 || self.statistics.activations == 0 {
            return;
        }
        let rate = self.statistics.activations as f64 / elapsed;
        let budget = (rate * remaining).ceil() as usize;
        let dropped = self.passive.enforce_limits(budget);
        if !dropped.is_empty() {
            log::debug!(
                "LRS discarded {} passive clauses (selection budget {})",
                dropped.len(),
                budget
            );
        }
        for clause in dropped {
            self.on_derived_set_removed(&clause);
            clause.set_store(ClauseStore::None);
            self.note_limit_discard();
        }
    }
}

impl Drop for SaturationLoop {
    fn drop(&mut self) {
        let mut forward = std::mem::take(&mut self.forward_engines);
        let mut backward = std::mem::take(&mut self.backward_engines);
        let mut generating = std::mem::take(&mut self.generating_engines);
        for engine in forward.iter_mut().chain(backward.iter_mut()) {
            engine.detach(&mut self.index_manager);
        }
        for engine in generating.iter_mut() {
            engine.detach(&mut self.index_manager);
        }
    }
}
