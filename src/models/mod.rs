//! Data Models
//!
//! Contains all data structures shared by the controller and its callers.

pub mod chat;
pub mod history;
pub mod scope;
pub mod settings;

pub use chat::*;
pub use history::*;
pub use scope::*;
pub use settings::*;
