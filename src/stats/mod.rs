//! Periodic `/statistics` polling

mod poller;
#[cfg(test)]
mod tests;

pub use poller::{PollOutcome, StatisticsPoller};
