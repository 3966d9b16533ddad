//! Chat Session
//!
//! The session controller and the execution of its turns.

pub mod controller;
mod state;
pub mod turn;

pub use controller::SessionController;
pub use state::{SessionUpdate, CANCELLED_NOTICE};
pub use turn::{failure_text, TurnHandle, TurnOutcome};
