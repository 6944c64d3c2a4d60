//! Saturation: observable clause containers and the given-clause loop.

mod algorithm;
mod containers;
mod statistics;

pub use algorithm::{saturate, SaturationLoop, SaturationOutcome};
pub use containers::{
    new_channel, ActiveContainer, ClauseContainer, ClauseEvents, ContainerListener, EventChannel,
    FakeContainer, PassiveContainer, PassiveLimits, PassiveQueue, SplitPassiveContainer,
    UnprocessedContainer,
};
pub use statistics::Statistics;
