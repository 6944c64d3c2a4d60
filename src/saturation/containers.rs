//! Clause containers: observable populations of clauses.
//!
//! Every container broadcasts its add/remove operations over an event
//! channel. Subscribers (the indices) are invoked synchronously, in
//! subscription order, before the mutating call returns; all subscribers
//! therefore observe the same total order of events.

use crate::config::{PassiveQueueConfig, PassiveRatio};
use crate::fol::Clause;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

/// Subscriber to a container's add/remove broadcast.
pub trait ContainerListener {
    fn clause_added(&mut self, clause: &Rc<Clause>);
    fn clause_removed(&mut self, clause: &Rc<Clause>);
}

/// Multi-subscriber broadcast channel. Subscribers are held weakly: an
/// index dropped by the index manager detaches simply by dying, and the
/// channel prunes the dead entry on the next fire.
#[derive(Default)]
pub struct ClauseEvents {
    subscribers: Vec<Weak<RefCell<dyn ContainerListener>>>,
}

impl ClauseEvents {
    pub fn subscribe(&mut self, listener: Weak<RefCell<dyn ContainerListener>>) {
        self.subscribers.push(listener);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn fire_added(&mut self, clause: &Rc<Clause>) {
        self.subscribers.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                listener.borrow_mut().clause_added(clause);
                true
            }
            None => false,
        });
    }

    pub fn fire_removed(&mut self, clause: &Rc<Clause>) {
        self.subscribers.retain(|weak| match weak.upgrade() {
            Some(listener) => {
                listener.borrow_mut().clause_removed(clause);
                true
            }
            None => false,
        });
    }
}

/// Shared handle to a container's event channel. The index manager holds
/// clones of these for the containers it attaches indices to.
pub type EventChannel = Rc<RefCell<ClauseEvents>>;

pub fn new_channel() -> EventChannel {
    Rc::new(RefCell::new(ClauseEvents::default()))
}

/// A population of clauses with observable add/remove.
pub trait ClauseContainer {
    fn events(&self) -> &EventChannel;

    /// Insert a clause and fire the added event.
    fn add(&mut self, clause: Rc<Clause>);

    /// Remove a clause and fire the removed event. Removing an absent
    /// clause is a programming error.
    fn remove(&mut self, clause: &Rc<Clause>);
}

fn clause_id(clause: &Clause) -> usize {
    clause.id.expect("clause must be registered before entering a container")
}

// =============================================================================
// Unprocessed
// =============================================================================

/// FIFO of clauses awaiting forward simplification.
pub struct UnprocessedContainer {
    queue: VecDeque<Rc<Clause>>,
    events: EventChannel,
}

impl UnprocessedContainer {
    pub fn new() -> Self {
        UnprocessedContainer { queue: VecDeque::new(), events: new_channel() }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Pop the oldest pending clause, firing the removed event.
    pub fn pop(&mut self) -> Option<Rc<Clause>> {
        let clause = self.queue.pop_front()?;
        self.events.borrow_mut().fire_removed(&clause);
        Some(clause)
    }
}

impl Default for UnprocessedContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseContainer for UnprocessedContainer {
    fn events(&self) -> &EventChannel {
        &self.events
    }

    fn add(&mut self, clause: Rc<Clause>) {
        self.queue.push_back(clause.clone());
        self.events.borrow_mut().fire_added(&clause);
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        let pos = self
            .queue
            .iter()
            .position(|c| Rc::ptr_eq(c, clause))
            .expect("removing a clause absent from Unprocessed");
        self.queue.remove(pos);
        self.events.borrow_mut().fire_removed(clause);
    }
}

// =============================================================================
// Active
// =============================================================================

/// Unordered set of activated clauses; all generating indices subscribe to
/// its events.
pub struct ActiveContainer {
    clauses: IndexMap<usize, Rc<Clause>>,
    events: EventChannel,
}

impl ActiveContainer {
    pub fn new() -> Self {
        ActiveContainer { clauses: IndexMap::new(), events: new_channel() }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn contains(&self, clause: &Clause) -> bool {
        clause.id.map_or(false, |id| self.clauses.contains_key(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Clause>> {
        self.clauses.values()
    }
}

impl Default for ActiveContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseContainer for ActiveContainer {
    fn events(&self) -> &EventChannel {
        &self.events
    }

    fn add(&mut self, clause: Rc<Clause>) {
        self.clauses.insert(clause_id(&clause), clause.clone());
        self.events.borrow_mut().fire_added(&clause);
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        self.clauses
            .shift_remove(&clause_id(clause))
            .expect("removing a clause absent from Active");
        self.events.borrow_mut().fire_removed(clause);
    }
}

// =============================================================================
// Passive
// =============================================================================

/// Age/weight limits imposed on the passive queue by the LRS strategy. A
/// clause stays only if it fulfils at least one of the two limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveLimits {
    pub max_age: u32,
    pub max_weight: u32,
}

impl PassiveLimits {
    pub fn admits(&self, age: u32, weight: u32) -> bool {
        age <= self.max_age || weight <= self.max_weight
    }
}

/// Priority queue of clauses awaiting selection.
///
/// Serves the oldest clause `ratio.age` times for every `ratio.weight`
/// pops of the lightest clause. Weights of clauses that do not descend
/// from the goal are scaled up by the configured coefficient before
/// comparison.
pub struct PassiveContainer {
    members: IndexMap<usize, Rc<Clause>>,
    age_queue: BinaryHeap<Reverse<(u32, usize)>>,
    weight_queue: BinaryHeap<Reverse<(u32, usize)>>,
    ratio: PassiveRatio,
    balance: u32,
    nongoal_coefficient: f32,
    limits: Option<PassiveLimits>,
    events: EventChannel,
}

impl PassiveContainer {
    pub fn new(ratio: PassiveRatio, nongoal_coefficient: f32) -> Self {
        let ratio = if ratio.age == 0 && ratio.weight == 0 {
            PassiveRatio { age: 1, weight: 1 }
        } else {
            ratio
        };
        PassiveContainer {
            members: IndexMap::new(),
            age_queue: BinaryHeap::new(),
            weight_queue: BinaryHeap::new(),
            ratio,
            balance: 0,
            nongoal_coefficient,
            limits: None,
            events: new_channel(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, clause: &Clause) -> bool {
        clause.id.map_or(false, |id| self.members.contains_key(&id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Clause>> {
        self.members.values()
    }

    /// Weight as the selection queue sees it.
    pub fn selection_weight(&self, clause: &Clause) -> u32 {
        if clause.derived_from_goal || self.nongoal_coefficient <= 1.0 {
            clause.weight
        } else {
            (clause.weight as f32 * self.nongoal_coefficient).ceil() as u32
        }
    }

    /// True if the clause passes the current LRS limits (always true
    /// without limits).
    pub fn fulfils_limits(&self, clause: &Clause) -> bool {
        match self.limits {
            Some(limits) => limits.admits(clause.age, self.selection_weight(clause)),
            None => true,
        }
    }

    pub fn limits(&self) -> Option<PassiveLimits> {
        self.limits
    }

    pub fn set_limits(&mut self, limits: PassiveLimits) {
        self.limits = Some(limits);
    }

    /// Remove and return the best clause according to the age/weight
    /// alternation, firing the removed event.
    pub fn pop_selected(&mut self) -> Option<Rc<Clause>> {
        if self.members.is_empty() {
            return None;
        }
        let by_age = self.balance < self.ratio.age;
        self.balance = (self.balance + 1) % (self.ratio.age + self.ratio.weight);

        let id = if by_age {
            self.pop_queue_id(true).or_else(|| self.pop_queue_id(false))
        } else {
            self.pop_queue_id(false).or_else(|| self.pop_queue_id(true))
        }?;

        let clause = self.members.shift_remove(&id).expect("heap entry had live member");
        self.events.borrow_mut().fire_removed(&clause);
        Some(clause)
    }

    /// Pop the next live entry from one of the heaps, skipping entries of
    /// clauses that have already left the container.
    fn pop_queue_id(&mut self, by_age: bool) -> Option<usize> {
        loop {
            let entry = if by_age { self.age_queue.pop() } else { self.weight_queue.pop() };
            match entry {
                Some(Reverse((_, id))) if self.members.contains_key(&id) => return Some(id),
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// Predict the age and weight limits that selecting `budget` more
    /// clauses would honor: replay the age/weight alternation over the
    /// current contents without mutating the container.
    pub fn simulate_limits(&self, budget: usize) -> Option<PassiveLimits> {
        if budget >= self.members.len() {
            return None;
        }
        let mut by_age: Vec<(u32, usize)> = self
            .members
            .values()
            .map(|c| (c.age, clause_id(c)))
            .collect();
        let mut by_weight: Vec<(u32, usize)> = self
            .members
            .values()
            .map(|c| (self.selection_weight(c), clause_id(c)))
            .collect();
        by_age.sort_unstable();
        by_weight.sort_unstable();

        let mut taken = vec![false; self.members.len()];
        let index_of: IndexMap<usize, usize> = self
            .members
            .keys()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut balance = self.balance;
        let mut ai = 0;
        let mut wi = 0;
        let mut max_age = 0;
        let mut max_weight = 0;
        for _ in 0..budget {
            let age_turn = balance < self.ratio.age;
            balance = (balance + 1) % (self.ratio.age + self.ratio.weight);
            if age_turn {
                while ai < by_age.len() && taken[index_of[&by_age[ai].1]] {
                    ai += 1;
                }
                if ai < by_age.len() {
                    taken[index_of[&by_age[ai].1]] = true;
                    max_age = max_age.max(by_age[ai].0);
                }
            } else {
                while wi < by_weight.len() && taken[index_of[&by_weight[wi].1]] {
                    wi += 1;
                }
                if wi < by_weight.len() {
                    taken[index_of[&by_weight[wi].1]] = true;
                    max_weight = max_weight.max(by_weight[wi].0);
                }
            }
        }
        Some(PassiveLimits { max_age, max_weight })
    }

    /// LRS entry point: derive the limits a selection budget would honor,
    /// install them, and drop every member outside them.
    pub fn enforce_limits(&mut self, budget: usize) -> Vec<Rc<Clause>> {
        match self.simulate_limits(budget) {
            Some(limits) => {
                self.set_limits(limits);
                self.prune_limited()
            }
            None => Vec::new(),
        }
    }

    /// Drop every member that fulfils neither limit, firing removed events.
    /// Returns the dropped clauses so the loop can finish their lifecycle.
    pub fn prune_limited(&mut self) -> Vec<Rc<Clause>> {
        let limits = match self.limits {
            Some(limits) => limits,
            None => return Vec::new(),
        };
        let doomed: Vec<Rc<Clause>> = self
            .members
            .values()
            .filter(|c| !limits.admits(c.age, self.selection_weight(c)))
            .cloned()
            .collect();
        for clause in &doomed {
            self.members.shift_remove(&clause_id(clause));
            self.events.borrow_mut().fire_removed(clause);
        }
        doomed
    }
}

impl ClauseContainer for PassiveContainer {
    fn events(&self) -> &EventChannel {
        &self.events
    }

    fn add(&mut self, clause: Rc<Clause>) {
        let id = clause_id(&clause);
        let weight = self.selection_weight(&clause);
        self.members.insert(id, clause.clone());
        self.age_queue.push(Reverse((clause.age, id)));
        self.weight_queue.push(Reverse((weight, id)));
        self.events.borrow_mut().fire_added(&clause);
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        self.members
            .shift_remove(&clause_id(clause))
            .expect("removing a clause absent from Passive");
        // Heap entries become stale and are skipped on pop.
        self.events.borrow_mut().fire_removed(clause);
    }
}

// =============================================================================
// Split passive
// =============================================================================

/// Passive container split into sub-queues by a numeric clause feature.
///
/// `cutoffs[i]` is the upper feature bound of queue `i` (the last cutoff
/// should be `f32::INFINITY`); `ratios[i]` is the share of selections the
/// queue receives. Selection picks the non-empty queue with the smallest
/// normalized balance, mirroring the round-robin-by-ratio scheme of the
/// multi-queue passive containers in the original prover family.
pub struct SplitPassiveContainer {
    queues: Vec<PassiveContainer>,
    cutoffs: Vec<f32>,
    ratios: Vec<u32>,
    balances: Vec<u64>,
    feature: Box<dyn Fn(&Clause) -> f32>,
    events: EventChannel,
}

impl SplitPassiveContainer {
    /// `queues`, `cutoffs`, and `ratios` must have equal, nonzero length.
    pub fn new(
        queues: Vec<PassiveContainer>,
        cutoffs: Vec<f32>,
        ratios: Vec<u32>,
        feature: Box<dyn Fn(&Clause) -> f32>,
    ) -> Self {
        assert!(!queues.is_empty(), "split passive container needs at least one queue");
        assert_eq!(queues.len(), cutoffs.len());
        assert_eq!(queues.len(), ratios.len());
        assert!(ratios.iter().all(|&r| r > 0), "queue ratios must be positive");
        let balances = vec![0; queues.len()];
        SplitPassiveContainer {
            queues,
            cutoffs,
            ratios,
            balances,
            feature,
            events: new_channel(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(PassiveContainer::is_empty)
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(PassiveContainer::len).sum()
    }

    /// The sub-queue a clause belongs to: the first whose cutoff admits
    /// its feature value.
    fn queue_index(&self, clause: &Clause) -> usize {
        let value = (self.feature)(clause);
        self.cutoffs
            .iter()
            .position(|&cutoff| value <= cutoff)
            .unwrap_or(self.queues.len() - 1)
    }

    /// Remove and return the best clause, serving sub-queues round-robin
    /// proportionally to their ratios.
    pub fn pop_selected(&mut self) -> Option<Rc<Clause>> {
        let chosen = (0..self.queues.len())
            .filter(|&i| !self.queues[i].is_empty())
            .min_by_key(|&i| self.balances[i] / self.ratios[i] as u64)?;
        self.balances[chosen] += 1;
        let clause = self.queues[chosen].pop_selected()?;
        self.events.borrow_mut().fire_removed(&clause);
        Some(clause)
    }

    /// True if the clause passes the LRS limits of its sub-queue.
    pub fn fulfils_limits(&self, clause: &Clause) -> bool {
        self.queues[self.queue_index(clause)].fulfils_limits(clause)
    }

    /// LRS over sub-queues: the selection budget is shared out by the
    /// queue ratios, and each sub-queue enforces its own share.
    pub fn enforce_limits(&mut self, budget: usize) -> Vec<Rc<Clause>> {
        let ratio_sum: u64 = self.ratios.iter().map(|&r| u64::from(r)).sum();
        let mut dropped = Vec::new();
        for i in 0..self.queues.len() {
            let share = (budget as u64 * u64::from(self.ratios[i]) / ratio_sum) as usize;
            for clause in self.queues[i].enforce_limits(share) {
                self.events.borrow_mut().fire_removed(&clause);
                dropped.push(clause);
            }
        }
        dropped
    }
}

impl ClauseContainer for SplitPassiveContainer {
    fn events(&self) -> &EventChannel {
        &self.events
    }

    fn add(&mut self, clause: Rc<Clause>) {
        let queue = self.queue_index(&clause);
        self.queues[queue].add(clause.clone());
        self.events.borrow_mut().fire_added(&clause);
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        let queue = self.queue_index(clause);
        self.queues[queue].remove(clause);
        self.events.borrow_mut().fire_removed(clause);
    }
}

// =============================================================================
// Passive queue front
// =============================================================================

/// The passive population as the saturation loop sees it: either one
/// age/weight queue or the split multi-queue variant, chosen by
/// configuration.
pub enum PassiveQueue {
    Single(PassiveContainer),
    Split(SplitPassiveContainer),
}

impl PassiveQueue {
    pub fn new(
        config: &PassiveQueueConfig,
        ratio: PassiveRatio,
        nongoal_coefficient: f32,
    ) -> Self {
        match config {
            PassiveQueueConfig::Single => {
                PassiveQueue::Single(PassiveContainer::new(ratio, nongoal_coefficient))
            }
            PassiveQueueConfig::Split { feature, cutoffs, ratios } => {
                let queues = cutoffs
                    .iter()
                    .map(|_| PassiveContainer::new(ratio, nongoal_coefficient))
                    .collect();
                let feature = *feature;
                PassiveQueue::Split(SplitPassiveContainer::new(
                    queues,
                    cutoffs.clone(),
                    ratios.clone(),
                    Box::new(move |clause: &Clause| feature.eval(clause)),
                ))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PassiveQueue::Single(queue) => queue.is_empty(),
            PassiveQueue::Split(split) => split.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PassiveQueue::Single(queue) => queue.len(),
            PassiveQueue::Split(split) => split.len(),
        }
    }

    /// Remove and return the best clause, firing the removed event.
    pub fn pop_selected(&mut self) -> Option<Rc<Clause>> {
        match self {
            PassiveQueue::Single(queue) => queue.pop_selected(),
            PassiveQueue::Split(split) => split.pop_selected(),
        }
    }

    /// True if the clause passes the current LRS limits.
    pub fn fulfils_limits(&self, clause: &Clause) -> bool {
        match self {
            PassiveQueue::Single(queue) => queue.fulfils_limits(clause),
            PassiveQueue::Split(split) => split.fulfils_limits(clause),
        }
    }

    /// LRS: install limits for a selection budget and drop everything
    /// outside them.
    pub fn enforce_limits(&mut self, budget: usize) -> Vec<Rc<Clause>> {
        match self {
            PassiveQueue::Single(queue) => queue.enforce_limits(budget),
            PassiveQueue::Split(split) => split.enforce_limits(budget),
        }
    }
}

impl ClauseContainer for PassiveQueue {
    fn events(&self) -> &EventChannel {
        match self {
            PassiveQueue::Single(queue) => queue.events(),
            PassiveQueue::Split(split) => split.events(),
        }
    }

    fn add(&mut self, clause: Rc<Clause>) {
        match self {
            PassiveQueue::Single(queue) => queue.add(clause),
            PassiveQueue::Split(split) => split.add(clause),
        }
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        match self {
            PassiveQueue::Single(queue) => queue.remove(clause),
            PassiveQueue::Split(split) => split.remove(clause),
        }
    }
}

// =============================================================================
// Fake container
// =============================================================================

/// A container that owns no clauses: `add`/`remove` only re-broadcast.
///
/// Used when simplification runs against a derived population such as
/// Active ∪ Passive: the saturation loop calls `add`/`remove` at exactly
/// the moments that derived set changes, and the indices subscribed here
/// stay in sync.
pub struct FakeContainer {
    events: EventChannel,
}

impl FakeContainer {
    pub fn new() -> Self {
        FakeContainer { events: new_channel() }
    }
}

impl Default for FakeContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseContainer for FakeContainer {
    fn events(&self) -> &EventChannel {
        &self.events
    }

    fn add(&mut self, clause: Rc<Clause>) {
        self.events.borrow_mut().fire_added(&clause);
    }

    fn remove(&mut self, clause: &Rc<Clause>) {
        self.events.borrow_mut().fire_removed(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Interner, Literal, PredicateSymbol};

    struct Recorder {
        log: Vec<(char, usize)>,
    }

    impl ContainerListener for Recorder {
        fn clause_added(&mut self, clause: &Rc<Clause>) {
            self.log.push(('+', clause.id.unwrap()));
        }

        fn clause_removed(&mut self, clause: &Rc<Clause>) {
            self.log.push(('-', clause.id.unwrap()));
        }
    }

    fn make_clause(interner: &mut Interner, id: usize, age: u32, extra_weight: usize) -> Rc<Clause> {
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 0);
        // Weight grows with the number of literals.
        let literals = (0..1 + extra_weight).map(|_| Literal::positive(p, vec![])).collect();
        let mut clause = Clause::input(literals);
        clause.id = Some(id);
        clause.age = age;
        Rc::new(clause)
    }

    #[test]
    fn events_fire_in_subscription_order() {
        let mut interner = Interner::new();
        let mut container = ActiveContainer::new();
        let first: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder { log: vec![] }));
        let second: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder { log: vec![] }));
        {
            let mut events = container.events().borrow_mut();
            let f: Rc<RefCell<dyn ContainerListener>> = first.clone();
            let s: Rc<RefCell<dyn ContainerListener>> = second.clone();
            events.subscribe(Rc::downgrade(&f));
            events.subscribe(Rc::downgrade(&s));
        }

        let clause = make_clause(&mut interner, 7, 0, 0);
        container.add(clause.clone());
        container.remove(&clause);

        assert_eq!(first.borrow().log, vec![('+', 7), ('-', 7)]);
        assert_eq!(second.borrow().log, vec![('+', 7), ('-', 7)]);
    }

    #[test]
    fn dead_subscribers_are_pruned() {
        let mut interner = Interner::new();
        let mut container = ActiveContainer::new();
        {
            let doomed: Rc<RefCell<dyn ContainerListener>> =
                Rc::new(RefCell::new(Recorder { log: vec![] }));
            container.events().borrow_mut().subscribe(Rc::downgrade(&doomed));
            assert_eq!(container.events().borrow().subscriber_count(), 1);
        }
        let clause = make_clause(&mut interner, 0, 0, 0);
        container.add(clause);
        assert_eq!(container.events().borrow().subscriber_count(), 0);
    }

    #[test]
    #[should_panic(expected = "absent from Active")]
    fn removing_absent_clause_panics() {
        let mut interner = Interner::new();
        let mut container = ActiveContainer::new();
        let clause = make_clause(&mut interner, 3, 0, 0);
        container.remove(&clause);
    }

    #[test]
    fn unprocessed_is_fifo() {
        let mut interner = Interner::new();
        let mut container = UnprocessedContainer::new();
        for id in 0..3 {
            container.add(make_clause(&mut interner, id, 0, 0));
        }
        assert_eq!(container.pop().unwrap().id, Some(0));
        assert_eq!(container.pop().unwrap().id, Some(1));
        assert_eq!(container.pop().unwrap().id, Some(2));
        assert!(container.pop().is_none());
    }

    #[test]
    fn passive_alternates_age_and_weight() {
        let mut interner = Interner::new();
        // ratio 1:1 -> age pick, then weight pick.
        let mut passive = PassiveContainer::new(PassiveRatio { age: 1, weight: 1 }, 1.0);
        // id 0: oldest but heavy; id 1: young and light; id 2: young, heavy.
        passive.add(make_clause(&mut interner, 0, 0, 5));
        passive.add(make_clause(&mut interner, 1, 8, 0));
        passive.add(make_clause(&mut interner, 2, 9, 5));

        assert_eq!(passive.pop_selected().unwrap().id, Some(0)); // by age
        assert_eq!(passive.pop_selected().unwrap().id, Some(1)); // by weight
        assert_eq!(passive.pop_selected().unwrap().id, Some(2));
        assert!(passive.pop_selected().is_none());
    }

    #[test]
    fn passive_pop_fires_removed_event() {
        let mut interner = Interner::new();
        let mut passive = PassiveContainer::new(PassiveRatio::default(), 1.0);
        let recorder: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder { log: vec![] }));
        {
            let listener: Rc<RefCell<dyn ContainerListener>> = recorder.clone();
            passive.events().borrow_mut().subscribe(Rc::downgrade(&listener));
        }
        passive.add(make_clause(&mut interner, 4, 0, 0));
        passive.pop_selected().unwrap();
        assert_eq!(recorder.borrow().log, vec![('+', 4), ('-', 4)]);
    }

    #[test]
    fn nongoal_weight_coefficient_penalizes_nongoal_clauses() {
        let mut interner = Interner::new();
        let mut passive = PassiveContainer::new(PassiveRatio { age: 0, weight: 1 }, 10.0);
        // Non-goal, light.
        passive.add(make_clause(&mut interner, 0, 0, 0));
        // Goal-derived, heavier in raw symbols but preferred once scaled.
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 0);
        let mut goal = Clause::input(vec![
            Literal::positive(p, vec![]),
            Literal::positive(p, vec![]),
        ]);
        goal.id = Some(1);
        goal.derived_from_goal = true;
        passive.add(Rc::new(goal));

        assert_eq!(passive.pop_selected().unwrap().id, Some(1));
    }

    #[test]
    fn limits_admit_by_age_or_weight() {
        let limits = PassiveLimits { max_age: 3, max_weight: 5 };
        assert!(limits.admits(2, 100));
        assert!(limits.admits(100, 5));
        assert!(!limits.admits(4, 6));
    }

    #[test]
    fn prune_limited_drops_only_violators() {
        let mut interner = Interner::new();
        let mut passive = PassiveContainer::new(PassiveRatio::default(), 1.0);
        passive.add(make_clause(&mut interner, 0, 1, 0)); // young
        passive.add(make_clause(&mut interner, 1, 50, 9)); // old and heavy
        passive.set_limits(PassiveLimits { max_age: 10, max_weight: 3 });

        let dropped = passive.prune_limited();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].id, Some(1));
        assert_eq!(passive.len(), 1);
    }

    #[test]
    fn simulate_limits_covers_the_selection_budget() {
        let mut interner = Interner::new();
        let mut passive = PassiveContainer::new(PassiveRatio { age: 1, weight: 1 }, 1.0);
        for id in 0..6 {
            passive.add(make_clause(&mut interner, id, id as u32, id));
        }
        let limits = passive.simulate_limits(2).expect("budget below size");
        // Whatever the exact limits, the two best clauses must stay admitted.
        assert!(limits.admits(0, 1));
        // And a budget at least as large as the container yields no limits.
        assert!(passive.simulate_limits(6).is_none());
    }

    #[test]
    fn split_passive_respects_ratios() {
        let mut interner = Interner::new();
        let queues = vec![
            PassiveContainer::new(PassiveRatio { age: 1, weight: 0 }, 1.0),
            PassiveContainer::new(PassiveRatio { age: 1, weight: 0 }, 1.0),
        ];
        // Queue 0 takes feature <= 0.5 and 3 of every 4 selections.
        let mut split = SplitPassiveContainer::new(
            queues,
            vec![0.5, f32::INFINITY],
            vec![3, 1],
            Box::new(|clause: &Clause| if clause.derived_from_goal { 0.0 } else { 1.0 }),
        );

        for id in 0..4 {
            let mut clause = make_clause(&mut interner, id, id as u32, 0);
            Rc::get_mut(&mut clause).unwrap().derived_from_goal = true;
            split.add(clause);
        }
        for id in 4..8 {
            split.add(make_clause(&mut interner, id, id as u32, 0));
        }

        let picks: Vec<usize> = (0..4).map(|_| split.pop_selected().unwrap().id.unwrap()).collect();
        let goal_picks = picks.iter().filter(|&&id| id < 4).count();
        assert_eq!(goal_picks, 3, "queue with ratio 3 gets three of four selections");
    }

    #[test]
    fn enforce_limits_installs_and_prunes() {
        let mut interner = Interner::new();
        let mut passive = PassiveContainer::new(PassiveRatio { age: 1, weight: 1 }, 1.0);
        for id in 0..6 {
            passive.add(make_clause(&mut interner, id, id as u32, id));
        }
        let dropped = passive.enforce_limits(2);
        assert!(!dropped.is_empty());
        assert_eq!(dropped.len() + passive.len(), 6);
        assert!(passive.limits().is_some());
        for clause in passive.iter() {
            assert!(passive.fulfils_limits(clause));
        }
        // A budget covering everything drops nothing further.
        assert!(passive.enforce_limits(10).is_empty());
    }

    #[test]
    fn passive_queue_split_routes_by_feature() {
        use crate::config::{ClauseFeature, PassiveQueueConfig};

        let mut interner = Interner::new();
        let config = PassiveQueueConfig::Split {
            feature: ClauseFeature::GoalDistance,
            cutoffs: vec![0.5, f32::INFINITY],
            ratios: vec![1, 1],
        };
        let mut queue = PassiveQueue::new(&config, PassiveRatio { age: 1, weight: 0 }, 1.0);

        let mut goal = make_clause(&mut interner, 0, 5, 0);
        Rc::get_mut(&mut goal).unwrap().derived_from_goal = true;
        queue.add(goal);
        queue.add(make_clause(&mut interner, 1, 0, 0));
        assert_eq!(queue.len(), 2);

        // Ratio 1:1 alternates the goal queue and the rest queue, so the
        // goal clause comes out first even though it is younger.
        assert_eq!(queue.pop_selected().unwrap().id, Some(0));
        assert_eq!(queue.pop_selected().unwrap().id, Some(1));
        assert!(queue.pop_selected().is_none());
    }

    #[test]
    fn passive_queue_single_has_no_default_limits() {
        let mut interner = Interner::new();
        let mut queue =
            PassiveQueue::new(&PassiveQueueConfig::Single, PassiveRatio::default(), 1.0);
        let clause = make_clause(&mut interner, 0, 99, 9);
        assert!(queue.fulfils_limits(&clause));
        queue.add(clause);
        assert!(queue.enforce_limits(5).is_empty());
    }

    #[test]
    fn fake_container_only_rebroadcasts() {
        let mut interner = Interner::new();
        let mut fake = FakeContainer::new();
        let recorder: Rc<RefCell<Recorder>> = Rc::new(RefCell::new(Recorder { log: vec![] }));
        {
            let listener: Rc<RefCell<dyn ContainerListener>> = recorder.clone();
            fake.events().borrow_mut().subscribe(Rc::downgrade(&listener));
        }
        let clause = make_clause(&mut interner, 11, 0, 0);
        fake.add(clause.clone());
        fake.remove(&clause);
        // No membership: removing again is still just a broadcast.
        fake.remove(&clause);
        assert_eq!(recorder.borrow().log, vec![('+', 11), ('-', 11), ('-', 11)]);
    }
}
