//! Saturation statistics, serializable for drivers.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub initial_clauses: usize,
    /// Conclusions produced by generating inferences.
    pub generated: usize,
    /// Given-clause iterations started.
    pub iterations: usize,
    /// Clauses that made it into Active.
    pub activations: usize,
    /// Clauses deleted by forward simplification.
    pub forward_deleted: usize,
    /// Clauses replaced by forward simplification.
    pub forward_replaced: usize,
    /// Clauses deleted by backward simplification.
    pub backward_deleted: usize,
    /// Clauses replaced by backward simplification.
    pub backward_replaced: usize,
    /// Passive clauses discarded by LRS limits.
    pub discarded_by_limits: usize,
    pub final_active: usize,
    pub final_passive: usize,
    pub final_unprocessed: usize,
}
