//! Prover configuration.

use crate::fol::Clause;
use serde::Serialize;
use std::time::Duration;

/// Which given-clause variant the loop runs.
///
/// The variants differ only in which container forward simplification
/// reads from (the *simplifying* container) and which container backward
/// simplification rewrites (the *to-be-simplified* container):
///
/// - `Otter`: both are Active ∪ Passive (tracked by a fake container).
/// - `Discount`: both are Active.
/// - `Discott`: simplifying is Active, to-be-simplified is Active ∪ Passive.
/// - `Lrs`: Discount wiring plus resource-aware passive limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaturationStrategy {
    Otter,
    Discount,
    Discott,
    Lrs,
}

impl SaturationStrategy {
    /// True when the simplifying and to-be-simplified containers coincide,
    /// in which case the backward-simplification index kinds alias onto
    /// the forward ones.
    pub fn equal_simplification_containers(self) -> bool {
        !matches!(self, SaturationStrategy::Discott)
    }
}

/// Literal selection handed to the generating engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LiteralSelectionMode {
    /// Every literal is eligible.
    All,
    /// All maximal literals under the term ordering.
    Maximal,
    /// The heaviest negative literal if one exists, else all maximal.
    NegativeOrMaximal,
}

/// How often the passive queue serves by age versus by weight.
///
/// A ratio of `age:weight = 1:4` pops the oldest clause once for every
/// four lightest clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassiveRatio {
    pub age: u32,
    pub weight: u32,
}

impl Default for PassiveRatio {
    fn default() -> Self {
        PassiveRatio { age: 1, weight: 4 }
    }
}

/// Numeric clause feature routing clauses into split-passive sub-queues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ClauseFeature {
    /// 0.0 for clauses descending from the goal, 1.0 for the rest.
    GoalDistance,
    /// The clause's age.
    Age,
    /// The clause's weight.
    Weight,
}

impl ClauseFeature {
    pub fn eval(&self, clause: &Clause) -> f32 {
        match self {
            ClauseFeature::GoalDistance => {
                if clause.derived_from_goal {
                    0.0
                } else {
                    1.0
                }
            }
            ClauseFeature::Age => clause.age as f32,
            ClauseFeature::Weight => clause.weight as f32,
        }
    }
}

/// Shape of the passive clause population.
#[derive(Debug, Clone, PartialEq)]
pub enum PassiveQueueConfig {
    /// One age/weight priority queue.
    Single,
    /// Sub-queues chosen by a clause feature. Queue `i` takes clauses
    /// with feature value up to `cutoffs[i]` (the last cutoff should be
    /// `f32::INFINITY`) and receives `ratios[i]` of every
    /// `sum(ratios)` selections.
    Split {
        feature: ClauseFeature,
        cutoffs: Vec<f32>,
        ratios: Vec<u32>,
    },
}

/// Configuration of the saturation loop.
#[derive(Debug, Clone)]
pub struct ProverConfig {
    pub strategy: SaturationStrategy,
    pub literal_selection: LiteralSelectionMode,
    pub passive_ratio: PassiveRatio,
    pub passive_queue: PassiveQueueConfig,
    /// Multiplier applied to the weight of clauses that do not descend
    /// from the goal when the passive queue compares weights.
    pub nongoal_weight_coefficient: f32,
    /// `None` = no time budget.
    pub time_limit: Option<Duration>,
    /// `None` = no memory ceiling.
    pub memory_limit_mb: Option<usize>,
    /// Activations between LRS limit re-estimations (LRS strategy only).
    pub lrs_estimate_interval: u32,
}

impl Default for ProverConfig {
    fn default() -> Self {
        ProverConfig {
            strategy: SaturationStrategy::Discount,
            literal_selection: LiteralSelectionMode::NegativeOrMaximal,
            passive_ratio: PassiveRatio::default(),
            passive_queue: PassiveQueueConfig::Single,
            nongoal_weight_coefficient: 1.0,
            time_limit: Some(Duration::from_secs(60)),
            memory_limit_mb: None,
            lrs_estimate_interval: 64,
        }
    }
}
