//! Time and memory budgets.
//!
//! The prover polls a single monotonic time source at its suspension
//! points: the top of the saturation loop and (via a counter) the inner
//! loop of the multi-literal matcher. Memory is bounded by a configured
//! ceiling probed from the process RSS.

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// A fatal budget violation. Propagates to the outermost driver; nothing
/// below the saturation entry point recovers from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    Time,
    Memory,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetExceeded::Time => write!(f, "time limit exceeded"),
            BudgetExceeded::Memory => write!(f, "memory limit exceeded"),
        }
    }
}

impl std::error::Error for BudgetExceeded {}

/// Why the saturation loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    /// The empty clause was derived.
    Refutation,
    /// The search space is exhausted under a complete strategy.
    Satisfiable,
    /// The search space is exhausted, but clauses were discarded along the
    /// way (LRS limits), so satisfiability cannot be claimed.
    RefutationNotFound,
    TimeLimit,
    MemoryLimit,
    Unknown,
}

impl From<BudgetExceeded> for TerminationReason {
    fn from(b: BudgetExceeded) -> Self {
        match b {
            BudgetExceeded::Time => TerminationReason::TimeLimit,
            BudgetExceeded::Memory => TerminationReason::MemoryLimit,
        }
    }
}

/// Shared budget tracker handed to the loop and the matcher.
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    start: Instant,
    time_limit: Option<Duration>,
    memory_limit_mb: Option<usize>,
}

impl ResourceGuard {
    pub fn new(time_limit: Option<Duration>, memory_limit_mb: Option<usize>) -> Self {
        ResourceGuard { start: Instant::now(), time_limit, memory_limit_mb }
    }

    /// Unlimited guard, for tests and library callers that bound the
    /// search by other means.
    pub fn unlimited() -> Self {
        ResourceGuard::new(None, None)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Fraction of the time budget already consumed (0.0 with no budget).
    pub fn time_fraction_used(&self) -> f64 {
        match self.time_limit {
            Some(limit) if !limit.is_zero() => {
                self.start.elapsed().as_secs_f64() / limit.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    pub fn remaining_time(&self) -> Option<Duration> {
        self.time_limit.map(|limit| limit.saturating_sub(self.start.elapsed()))
    }

    /// Cheap check of the time budget only. This is the one called from
    /// the matcher's inner loop.
    pub fn check_time(&self) -> Result<(), BudgetExceeded> {
        match self.time_limit {
            Some(limit) if self.start.elapsed() > limit => Err(BudgetExceeded::Time),
            _ => Ok(()),
        }
    }

    /// Full check of both budgets, run at the top of each loop iteration.
    pub fn check(&self) -> Result<(), BudgetExceeded> {
        self.check_time()?;
        if let Some(limit) = self.memory_limit_mb {
            if let Some(rss) = process_memory_mb() {
                if rss >= limit {
                    return Err(BudgetExceeded::Memory);
                }
            }
        }
        Ok(())
    }
}

/// Current process RSS in MB, or `None` where the probe is unavailable.
pub fn process_memory_mb() -> Option<usize> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let rss_pages: usize = statm.split_whitespace().nth(1)?.parse().ok()?;
        let page_size = 4096usize;
        Some(rss_pages * page_size / (1024 * 1024))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_guard_never_trips() {
        let guard = ResourceGuard::unlimited();
        assert!(guard.check().is_ok());
        assert!(guard.check_time().is_ok());
        assert_eq!(guard.time_fraction_used(), 0.0);
    }

    #[test]
    fn zero_time_budget_trips_immediately() {
        let guard = ResourceGuard::new(Some(Duration::ZERO), None);
        std::thread::sleep(Duration::from_millis(1));
        assert_eq!(guard.check_time(), Err(BudgetExceeded::Time));
        assert_eq!(guard.check(), Err(BudgetExceeded::Time));
    }

    #[test]
    fn reasons_map_from_budget() {
        assert_eq!(TerminationReason::from(BudgetExceeded::Time), TerminationReason::TimeLimit);
        assert_eq!(TerminationReason::from(BudgetExceeded::Memory), TerminationReason::MemoryLimit);
    }
}
