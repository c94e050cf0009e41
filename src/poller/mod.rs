//! The background poll loop.
//!
//! [`Scheduler`] owns the timer and cancellation; on each tick it runs a
//! [`PollCycle`]: fetch every source, diff against the cached snapshot,
//! notify about new items, publish the new snapshot.

mod cycle;
mod scheduler;

pub use cycle::{CycleReport, DispatchOutcome, PollCycle};
pub use scheduler::{Cycle, Scheduler, SchedulerError};
