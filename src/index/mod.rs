//! Index management.
//!
//! The saturation loop owns one `IndexManager`. Engines request the index
//! kinds they need at attach time and release them at detach time; the
//! manager creates an index on the first request, wires it to the event
//! channel of the container its kind designates, and drops it when the
//! last holder releases it (detaching happens as a side effect of the
//! drop: the container's channel holds only a weak reference).

mod disc_tree;
mod grounding;
mod literal_index;
mod subsumption_index;
mod term_index;

pub use grounding::{GroundClause, GroundingIndex};
pub use literal_index::{LiteralEntry, LiteralIndex, LiteralIndexPolicy};
pub use subsumption_index::SubsumptionIndex;
pub use term_index::{literal_subterm, TermEntry, TermIndex, TermIndexPolicy};

use crate::fol::{Interner, Kbo};
use crate::saturation::{ContainerListener, EventChannel};
use crate::selection::LiteralSelector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The fixed enumeration of index kinds the core knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    GeneratingSubstTree,
    FwSimplificationSubstTree,
    BwSimplificationSubstTree,
    FwSimplifyingUnitClauseSubstTree,
    GeneratingUnitClauseSubstTree,
    GeneratingNonUnitClauseSubstTree,
    SuperpositionSubtermSubstTree,
    SuperpositionLhsSubstTree,
    AcyclicityIndex,
    BwDemodulationSubtermSubstTree,
    FwDemodulationLhsSubstTree,
    FwSubsumptionCodeTree,
    FwSubsumptionSubstTree,
    FwRewriteRuleSubstTree,
    FwGlobalSubsumptionIndex,
}

/// Which logical container an index kind attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Generating,
    Simplifying,
    ToBeSimplified,
}

impl IndexKind {
    fn attachment(self) -> Attachment {
        use IndexKind::*;
        match self {
            GeneratingSubstTree
            | GeneratingUnitClauseSubstTree
            | GeneratingNonUnitClauseSubstTree
            | SuperpositionSubtermSubstTree
            | SuperpositionLhsSubstTree
            | AcyclicityIndex => Attachment::Generating,
            FwSimplificationSubstTree
            | FwSimplifyingUnitClauseSubstTree
            | FwDemodulationLhsSubstTree
            | FwSubsumptionCodeTree
            | FwSubsumptionSubstTree
            | FwRewriteRuleSubstTree
            | FwGlobalSubsumptionIndex => Attachment::Simplifying,
            BwSimplificationSubstTree | BwDemodulationSubtermSubstTree => {
                Attachment::ToBeSimplified
            }
        }
    }
}

/// Shared handle to a live index.
#[derive(Clone)]
pub enum IndexHandle {
    Literal(Rc<RefCell<LiteralIndex>>),
    Term(Rc<RefCell<TermIndex>>),
    Subsumption(Rc<RefCell<SubsumptionIndex>>),
    Grounding(Rc<RefCell<GroundingIndex>>),
}

impl IndexHandle {
    pub fn as_literal(&self) -> Option<&Rc<RefCell<LiteralIndex>>> {
        match self {
            IndexHandle::Literal(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_term(&self) -> Option<&Rc<RefCell<TermIndex>>> {
        match self {
            IndexHandle::Term(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_subsumption(&self) -> Option<&Rc<RefCell<SubsumptionIndex>>> {
        match self {
            IndexHandle::Subsumption(index) => Some(index),
            _ => None,
        }
    }

    pub fn as_grounding(&self) -> Option<&Rc<RefCell<GroundingIndex>>> {
        match self {
            IndexHandle::Grounding(index) => Some(index),
            _ => None,
        }
    }

    fn listener(&self) -> Rc<RefCell<dyn ContainerListener>> {
        match self {
            IndexHandle::Literal(index) => index.clone(),
            IndexHandle::Term(index) => index.clone(),
            IndexHandle::Subsumption(index) => index.clone(),
            IndexHandle::Grounding(index) => index.clone(),
        }
    }

    /// True if both handles point at the same physical index.
    pub fn same_index(&self, other: &IndexHandle) -> bool {
        match (self, other) {
            (IndexHandle::Literal(a), IndexHandle::Literal(b)) => Rc::ptr_eq(a, b),
            (IndexHandle::Term(a), IndexHandle::Term(b)) => Rc::ptr_eq(a, b),
            (IndexHandle::Subsumption(a), IndexHandle::Subsumption(b)) => Rc::ptr_eq(a, b),
            (IndexHandle::Grounding(a), IndexHandle::Grounding(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

struct Entry {
    handle: IndexHandle,
    refcount: u32,
    /// Externally provided: the refcount never drops below 1 and the
    /// manager never destroys the index.
    external: bool,
}

/// Reference-counted registry of the indices of one saturation run.
pub struct IndexManager {
    store: HashMap<IndexKind, Entry>,
    /// When the simplifying and to-be-simplified containers coincide, the
    /// backward-simplification kind folds onto the forward kind so only
    /// one physical index exists.
    equal_simplification_containers: bool,
    generating: EventChannel,
    simplifying: EventChannel,
    to_be_simplified: EventChannel,
    interner: Rc<RefCell<Interner>>,
    selector: Rc<dyn LiteralSelector>,
    ordering: Rc<Kbo>,
}

impl IndexManager {
    pub fn new(
        equal_simplification_containers: bool,
        generating: EventChannel,
        simplifying: EventChannel,
        to_be_simplified: EventChannel,
        interner: Rc<RefCell<Interner>>,
        selector: Rc<dyn LiteralSelector>,
        ordering: Rc<Kbo>,
    ) -> Self {
        IndexManager {
            store: HashMap::new(),
            equal_simplification_containers,
            generating,
            simplifying,
            to_be_simplified,
            interner,
            selector,
            ordering,
        }
    }

    /// The alias policy, applied on every operation.
    fn alias(&self, kind: IndexKind) -> IndexKind {
        if kind == IndexKind::BwSimplificationSubstTree && self.equal_simplification_containers {
            IndexKind::FwSimplificationSubstTree
        } else {
            kind
        }
    }

    /// Request an index, creating and attaching it on the 0 -> 1 refcount
    /// transition.
    pub fn request(&mut self, kind: IndexKind) -> IndexHandle {
        let kind = self.alias(kind);
        if let Some(entry) = self.store.get_mut(&kind) {
            entry.refcount += 1;
            return entry.handle.clone();
        }
        log::debug!("creating index {:?}", kind);
        let handle = self.create(kind);
        let channel = match kind.attachment() {
            Attachment::Generating => &self.generating,
            Attachment::Simplifying => &self.simplifying,
            Attachment::ToBeSimplified => &self.to_be_simplified,
        };
        channel
            .borrow_mut()
            .subscribe(Rc::downgrade(&handle.listener()));
        self.store
            .insert(kind, Entry { handle: handle.clone(), refcount: 1, external: false });
        handle
    }

    /// Release an index, destroying it on the 1 -> 0 transition.
    /// Releasing an unheld kind is a programming error.
    pub fn release(&mut self, kind: IndexKind) {
        let kind = self.alias(kind);
        let entry = match self.store.get_mut(&kind) {
            Some(entry) => entry,
            None => {
                log::error!("release of unheld index kind {:?}", kind);
                panic!("release of unheld index kind {:?}", kind);
            }
        };
        if entry.external {
            // Pinned: an externally provided index is never destroyed.
            if entry.refcount > 1 {
                entry.refcount -= 1;
            }
            return;
        }
        entry.refcount -= 1;
        if entry.refcount == 0 {
            log::debug!("destroying index {:?}", kind);
            self.store.remove(&kind);
        }
    }

    /// Record an externally owned index under `kind`. The refcount is
    /// pinned so the manager never destroys it; no container is attached.
    pub fn provide_index(&mut self, kind: IndexKind, handle: IndexHandle) {
        let kind = self.alias(kind);
        assert!(
            !self.store.contains_key(&kind),
            "an index of kind {:?} already exists",
            kind
        );
        self.store.insert(kind, Entry { handle, refcount: 1, external: true });
    }

    pub fn contains(&self, kind: IndexKind) -> bool {
        self.store.contains_key(&self.alias(kind))
    }

    /// Look up a held index without touching its refcount. The handle may
    /// outlive the registration; holders that want lifetime guarantees use
    /// `request`.
    pub fn get(&self, kind: IndexKind) -> Option<IndexHandle> {
        self.store.get(&self.alias(kind)).map(|e| e.handle.clone())
    }

    pub fn refcount(&self, kind: IndexKind) -> u32 {
        self.store.get(&self.alias(kind)).map_or(0, |e| e.refcount)
    }

    fn create(&self, kind: IndexKind) -> IndexHandle {
        let literal = |policy| {
            IndexHandle::Literal(Rc::new(RefCell::new(LiteralIndex::new(
                policy,
                self.interner.clone(),
                self.selector.clone(),
                self.ordering.clone(),
            ))))
        };
        let term = |policy| {
            IndexHandle::Term(Rc::new(RefCell::new(TermIndex::new(
                policy,
                self.interner.clone(),
                self.selector.clone(),
                self.ordering.clone(),
            ))))
        };
        use IndexKind::*;
        match kind {
            GeneratingSubstTree => literal(LiteralIndexPolicy::Generating),
            FwSimplificationSubstTree | BwSimplificationSubstTree => {
                literal(LiteralIndexPolicy::Simplifying)
            }
            FwSimplifyingUnitClauseSubstTree | GeneratingUnitClauseSubstTree => {
                literal(LiteralIndexPolicy::UnitClause)
            }
            GeneratingNonUnitClauseSubstTree => literal(LiteralIndexPolicy::NonUnitClause),
            FwSubsumptionSubstTree => literal(LiteralIndexPolicy::FwSubsumption),
            FwRewriteRuleSubstTree => literal(LiteralIndexPolicy::RewriteRule),
            SuperpositionSubtermSubstTree => term(TermIndexPolicy::SuperpositionSubterm),
            SuperpositionLhsSubstTree => term(TermIndexPolicy::SuperpositionLhs),
            AcyclicityIndex => term(TermIndexPolicy::Acyclicity),
            BwDemodulationSubtermSubstTree => term(TermIndexPolicy::DemodulationSubterm),
            FwDemodulationLhsSubstTree => term(TermIndexPolicy::DemodulationLhs),
            FwSubsumptionCodeTree => IndexHandle::Subsumption(Rc::new(RefCell::new(
                SubsumptionIndex::new(self.interner.borrow().equality()),
            ))),
            FwGlobalSubsumptionIndex => {
                IndexHandle::Grounding(Rc::new(RefCell::new(GroundingIndex::new())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::{Clause, Literal, PredicateSymbol, Term, Variable};
    use crate::saturation::new_channel;
    use crate::selection::SelectAll;

    fn manager(equal_simplification_containers: bool) -> (IndexManager, EventChannel, EventChannel) {
        let generating = new_channel();
        let simplifying = new_channel();
        let to_be_simplified = new_channel();
        let mgr = IndexManager::new(
            equal_simplification_containers,
            generating.clone(),
            simplifying.clone(),
            to_be_simplified.clone(),
            Rc::new(RefCell::new(Interner::new())),
            Rc::new(SelectAll),
            Rc::new(Kbo::default()),
        );
        (mgr, simplifying, to_be_simplified)
    }

    #[test]
    fn alias_collapses_backward_onto_forward() {
        let (mut mgr, _, _) = manager(true);
        let bw = mgr.request(IndexKind::BwSimplificationSubstTree);
        let fw = mgr.request(IndexKind::FwSimplificationSubstTree);
        assert!(bw.same_index(&fw), "one physical index under aliasing");
        assert_eq!(mgr.refcount(IndexKind::FwSimplificationSubstTree), 2);
        assert_eq!(mgr.refcount(IndexKind::BwSimplificationSubstTree), 2);
        assert!(mgr.contains(IndexKind::BwSimplificationSubstTree));

        mgr.release(IndexKind::BwSimplificationSubstTree);
        assert_eq!(mgr.refcount(IndexKind::FwSimplificationSubstTree), 1);
        mgr.release(IndexKind::FwSimplificationSubstTree);
        assert!(!mgr.contains(IndexKind::FwSimplificationSubstTree));
    }

    #[test]
    fn distinct_containers_mean_distinct_indices() {
        let (mut mgr, _, _) = manager(false);
        let bw = mgr.request(IndexKind::BwSimplificationSubstTree);
        let fw = mgr.request(IndexKind::FwSimplificationSubstTree);
        assert!(!bw.same_index(&fw));
        assert_eq!(mgr.refcount(IndexKind::BwSimplificationSubstTree), 1);
        assert_eq!(mgr.refcount(IndexKind::FwSimplificationSubstTree), 1);
        mgr.release(IndexKind::BwSimplificationSubstTree);
        mgr.release(IndexKind::FwSimplificationSubstTree);
    }

    #[test]
    fn refcount_balances_to_empty() {
        let (mut mgr, _, _) = manager(false);
        for _ in 0..3 {
            mgr.request(IndexKind::GeneratingSubstTree);
        }
        assert_eq!(mgr.refcount(IndexKind::GeneratingSubstTree), 3);
        for expected in [2, 1, 0] {
            mgr.release(IndexKind::GeneratingSubstTree);
            assert_eq!(mgr.refcount(IndexKind::GeneratingSubstTree), expected);
        }
        assert!(!mgr.contains(IndexKind::GeneratingSubstTree));
    }

    #[test]
    #[should_panic(expected = "release of unheld index kind")]
    fn releasing_unheld_kind_panics() {
        let (mut mgr, _, _) = manager(false);
        mgr.release(IndexKind::AcyclicityIndex);
    }

    #[test]
    fn every_kind_is_constructible() {
        use IndexKind::*;
        let kinds = [
            GeneratingSubstTree,
            FwSimplificationSubstTree,
            BwSimplificationSubstTree,
            FwSimplifyingUnitClauseSubstTree,
            GeneratingUnitClauseSubstTree,
            GeneratingNonUnitClauseSubstTree,
            SuperpositionSubtermSubstTree,
            SuperpositionLhsSubstTree,
            AcyclicityIndex,
            BwDemodulationSubtermSubstTree,
            FwDemodulationLhsSubstTree,
            FwSubsumptionCodeTree,
            FwSubsumptionSubstTree,
            FwRewriteRuleSubstTree,
            FwGlobalSubsumptionIndex,
        ];
        let (mut mgr, _, _) = manager(false);
        for kind in kinds {
            mgr.request(kind);
            assert!(mgr.contains(kind));
        }
        for kind in kinds {
            mgr.release(kind);
            assert!(!mgr.contains(kind));
        }
    }

    #[test]
    fn created_index_receives_container_events() {
        let (mut mgr, simplifying, _) = manager(true);
        let handle = mgr.request(IndexKind::FwSimplificationSubstTree);
        let index = handle.as_literal().unwrap();

        let mut interner = Interner::new();
        let p = PredicateSymbol::new(interner.intern_predicate("P"), 1);
        let x = Term::Variable(Variable::new(interner.intern_variable("X")));
        let mut clause = Clause::input(vec![Literal::positive(p, vec![x])]);
        clause.id = Some(0);
        let clause = Rc::new(clause);

        simplifying.borrow_mut().fire_added(&clause);
        assert_eq!(index.borrow().clause_count(), 1);
        simplifying.borrow_mut().fire_removed(&clause);
        assert_eq!(index.borrow().clause_count(), 0);
    }

    #[test]
    fn destruction_detaches_from_the_container() {
        let (mut mgr, simplifying, _) = manager(true);
        mgr.request(IndexKind::FwSimplificationSubstTree);
        assert_eq!(simplifying.borrow().subscriber_count(), 1);
        mgr.release(IndexKind::FwSimplificationSubstTree);
        assert_eq!(simplifying.borrow().subscriber_count(), 0);
    }

    #[test]
    fn provided_index_is_never_destroyed() {
        let (mut mgr, _, _) = manager(false);
        let external = IndexHandle::Subsumption(Rc::new(RefCell::new(SubsumptionIndex::new(
            Interner::new().equality(),
        ))));
        mgr.provide_index(IndexKind::FwSubsumptionCodeTree, external.clone());
        assert_eq!(mgr.refcount(IndexKind::FwSubsumptionCodeTree), 1);

        // Request/release cycles leave the pinned entry alive.
        let handle = mgr.request(IndexKind::FwSubsumptionCodeTree);
        assert!(handle.same_index(&external));
        assert_eq!(mgr.refcount(IndexKind::FwSubsumptionCodeTree), 2);
        mgr.release(IndexKind::FwSubsumptionCodeTree);
        mgr.release(IndexKind::FwSubsumptionCodeTree);
        assert!(mgr.contains(IndexKind::FwSubsumptionCodeTree));
        assert_eq!(mgr.refcount(IndexKind::FwSubsumptionCodeTree), 1);
    }
}
