//! Fixed-cadence frame submission with drop-on-busy semantics

mod frame_loop;
mod stats;
#[cfg(test)]
mod tests;

pub use frame_loop::{FrameHandler, FrameSubmissionLoop, TickOutcome};
pub use stats::{SubmissionStats, SubmissionStatsSnapshot};
