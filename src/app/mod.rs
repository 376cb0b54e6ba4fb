pub mod keyboard_input;

mod commands;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use keyboard_input::KeyboardInputHandler;
pub use orchestrator::MonitorApp;
pub use types::{ComponentState, ShutdownReason};
