//! Two-tier alarm: sustained environment-unsafe alarms and one-shot
//! violation alerts, rendered through an [`AlertSink`].

mod controller;
mod sink;

pub use controller::{AlarmController, AlarmOutcome, AlarmPhase, AlarmState, AlarmUpdate};
pub use sink::{AlertSink, LogAlertSink, TerminalAlertSink};
